//! Attachment point lookup

use crate::error::HoistError;
use hoist_hir::Program;
use hoist_types::{NodeId, ScopeId};

/// The statement of `destination`'s body that contains `closure`.
///
/// The relocated declaration goes right before it, so it runs after every
/// statement that preceded the closure and before the closure's own position.
pub fn attachment_point(program: &Program, destination: ScopeId, closure: NodeId) -> Result<NodeId, HoistError> {
    let tree = &program.tree;
    program
        .scopes
        .statement_host(tree, destination)
        .and_then(|host| tree.statement_list(host))
        .and_then(|body| body.iter().copied().find(|&stmt| tree.is_ancestor_or_self(stmt, closure)))
        .ok_or(HoistError::MissingAttachment {
            scope: destination,
            closure,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{closure, lower};
    use hoist_hir::print_node;

    #[test]
    fn test_anchor_is_containing_statement() {
        let program = lower("let a = 1;\nfunction outer() { function inner() {} }\nlet b = 2;");
        let inner = closure(&program, "inner");
        let anchor = attachment_point(&program, program.scopes.root(), inner).unwrap();

        assert_eq!(anchor, closure(&program, "outer"));
    }

    #[test]
    fn test_anchor_in_function_body() {
        let program = lower(
            "function outer() { const x = 1; if (x) { g(function () {}); } return x; }",
        );
        let outer = closure(&program, "outer");
        let scope = program.tree.node(outer).scope.unwrap();
        let expr = program.tree.functions_post_order(program.root)[0];
        let anchor = attachment_point(&program, scope, expr).unwrap();

        assert!(print_node(&program.tree, anchor).starts_with("if (x)"));
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let program = lower("function a() {}\nfunction b() { function inner() {} }");
        let inner = closure(&program, "inner");
        let a_scope = program.tree.node(closure(&program, "a")).scope.unwrap();

        let err = attachment_point(&program, a_scope, inner).unwrap_err();
        assert_eq!(
            err,
            HoistError::MissingAttachment {
                scope: a_scope,
                closure: inner
            }
        );
    }
}
