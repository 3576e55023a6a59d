//! Shared identifiers for hoist
//!
//! Defines the arena indices and small enums used throughout the pipeline,
//! from lowering through the closure-hoisting transform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in the syntax tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Index of a lexical scope in the scope arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub u32);

/// Index of a binding in the scope arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub u32);

macro_rules! arena_index {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn from_index(index: usize) -> Self {
                $ty(index as u32)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

arena_index!(NodeId, "n");
arena_index!(ScopeId, "s");
arena_index!(BindingId, "b");

/// How the program is evaluated by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// ES module: strict, isolated top-level scope
    #[default]
    Module,
    /// Classic script: top-level bindings leak into the global environment
    Script,
}

impl SourceType {
    pub fn is_module(&self) -> bool {
        matches!(self, SourceType::Module)
    }
}

/// What created a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
    /// `for`, `for-in` and `for-of` heads
    Loop,
    Switch,
    Catch,
    Class,
}

/// How a name was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Param,
    Class,
    Import,
    CatchParam,
}

impl BindingKind {
    /// `var` and top-level function declarations share the function-level environment
    pub fn is_var_scoped(&self) -> bool {
        matches!(self, BindingKind::Var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_and_display() {
        let id = NodeId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "n7");
        assert_eq!(ScopeId(3).to_string(), "s3");
    }

    #[test]
    fn test_source_type_default_is_module() {
        assert!(SourceType::default().is_module());
        assert!(!SourceType::Script.is_module());
    }
}
