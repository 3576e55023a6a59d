//! Program tree and scope model for hoist
//!
//! The tree is an arena of nodes addressed by `NodeId`, lowered from the
//! SWC AST, with a parallel arena of lexical scopes and bindings. Both
//! support the in-place edits the closure-hoisting pass performs.

pub mod ir;
pub mod lower;
pub mod print;
pub mod scope;

pub use ir::*;
pub use lower::lower_program;
pub use print::{print_node, print_program};
pub use scope::{Binding, Scope, ScopeTree};
