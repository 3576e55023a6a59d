//! Errors that abort a hoisting run

use hoist_hir::TreeError;
use hoist_types::{NodeId, ScopeId};
use thiserror::Error;

/// An internal invariant was violated while relocating a closure.
///
/// Closures that cannot be moved are skipped silently; these errors mean the
/// tree or scope model disagrees with itself, and continuing would emit a
/// wrong program.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HoistError {
    #[error("no statement in the body of scope {scope} contains closure {closure}")]
    MissingAttachment { scope: ScopeId, closure: NodeId },

    #[error("declaration of closure {closure} has no binding named `{name}` in scope {scope}")]
    UnboundDeclaration {
        closure: NodeId,
        scope: ScopeId,
        name: String,
    },

    #[error("closure {0} is not a function node")]
    NotAFunction(NodeId),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
