//! Destination scope resolution
//!
//! The candidate destinations for a closure are the scopes enclosing it,
//! nearest first. Every binding from those scopes that the closure uses
//! lowers the ceiling to the binding's own scope; the closure moves to the
//! outermost candidate that survives.

use crate::risk::RiskTable;
use hoist_hir::{MemberProp, NodeKind, Program, Tree};
use hoist_types::{BindingId, NodeId, ScopeId, ScopeKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Bindings visible outside the closure that are read or written inside it
    pub free_bindings: Vec<BindingId>,
    pub destination: Option<ScopeId>,
}

/// Resolve where `function`, which creates `scope`, can be moved.
pub fn resolve_target(program: &Program, risks: &RiskTable, function: NodeId, scope: ScopeId) -> Target {
    let tree = &program.tree;
    let scopes = &program.scopes;
    let Some(parent) = scopes.parent(scope) else {
        return Target::default();
    };

    let mut candidates = scopes.ancestors(parent);
    let mut free_bindings = Vec::new();
    for binding in scopes.visible_bindings(parent) {
        let b = scopes.binding(binding);
        if b.sites().any(|site| tree.is_ancestor_or_self(function, site)) {
            free_bindings.push(binding);
            truncate_above(&mut candidates, b.scope);
        }
    }

    // `eval` can add bindings to the function that runs it
    let dynamic = candidates.iter().copied().find(|&s| {
        matches!(scopes.scope(s).kind, ScopeKind::Function | ScopeKind::Program)
            && risks.uses_eval(scopes.scope(s).node)
    });
    if let Some(ceiling) = dynamic {
        truncate_above(&mut candidates, ceiling);
    }

    if mentions_private_name(tree, function) {
        let class = candidates
            .iter()
            .copied()
            .find(|&s| scopes.scope(s).kind == ScopeKind::Class);
        if let Some(ceiling) = class {
            truncate_above(&mut candidates, ceiling);
        }
    }

    // Strictness is lexical: a closure in strict code must stay in strict code
    let needs_strict = scopes.is_strict(parent);

    let root = scopes.root();
    candidates.retain(|&s| {
        if s == parent || (s == root && !program.source_type.is_module()) {
            return false;
        }
        if needs_strict && !scopes.is_strict(s) {
            return false;
        }
        scopes
            .statement_host(tree, s)
            .is_some_and(|host| tree.is_ancestor_or_self(host, function))
    });

    Target {
        free_bindings,
        destination: candidates.last().copied(),
    }
}

/// Drop every candidate outside `scope`. A scope already dropped leaves the list unchanged.
fn truncate_above(candidates: &mut Vec<ScopeId>, scope: ScopeId) {
    if let Some(position) = candidates.iter().position(|&s| s == scope) {
        candidates.truncate(position + 1);
    }
}

fn mentions_private_name(tree: &Tree, function: NodeId) -> bool {
    tree.descendants(function).into_iter().any(|id| {
        matches!(
            tree.kind(id),
            NodeKind::PrivateName { .. } | NodeKind::Member { prop: MemberProp::Private(_), .. }
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{closure, lower, lower_as};
    use hoist_types::SourceType;

    fn destination(program: &Program, name: &str) -> Option<ScopeId> {
        let risks = RiskTable::build(&program.tree, program.root);
        let function = closure(program, name);
        let scope = program.tree.node(function).scope.unwrap();
        resolve_target(program, &risks, function, scope).destination
    }

    fn scope_of(program: &Program, name: &str) -> ScopeId {
        program.tree.node(closure(program, name)).scope.unwrap()
    }

    #[test]
    fn test_no_free_variables_reaches_module_root() {
        let program = lower("function a() { function b() { function c() { return 1; } } }");
        assert_eq!(destination(&program, "c"), Some(program.scopes.root()));
    }

    #[test]
    fn test_script_root_is_never_a_destination() {
        let program = lower_as(
            "function a() { function b() { function c() { return 1; } } }",
            SourceType::Script,
        );
        assert_eq!(destination(&program, "c"), Some(scope_of(&program, "a")));
        assert_eq!(destination(&program, "b"), None);
    }

    #[test]
    fn test_strict_closure_never_enters_sloppy_scope() {
        let program = lower_as(
            "function a() { function b() { 'use strict'; return function inner() { return this; }; } }",
            SourceType::Script,
        );
        assert_eq!(destination(&program, "inner"), None);

        let program = lower_as(
            "function a() { 'use strict'; function b() { function c() { return 1; } } }",
            SourceType::Script,
        );
        assert_eq!(destination(&program, "c"), Some(scope_of(&program, "a")));
    }

    #[test]
    fn test_free_variable_sets_ceiling() {
        let program = lower(
            "function a(x) { function b() { function c() { function d() { return x; } } } }",
        );
        assert_eq!(destination(&program, "d"), Some(scope_of(&program, "a")));
    }

    #[test]
    fn test_ceiling_is_innermost_free_variable() {
        let program = lower(
            "function a(x) { function b(y) { function c() { function d() { return x + y; } } } }",
        );
        // `y` keeps d inside b even though `x` alone would allow a
        assert_eq!(destination(&program, "d"), Some(scope_of(&program, "b")));
    }

    #[test]
    fn test_capturing_parent_binding_stays() {
        let program = lower("function outer(x) { return function inner() { return x; }; }");
        assert_eq!(destination(&program, "inner"), None);
    }

    #[test]
    fn test_own_bindings_do_not_pin() {
        let program = lower("function outer() { function inner(x) { let y = x; return y; } }");
        assert_eq!(destination(&program, "inner"), Some(program.scopes.root()));
    }

    #[test]
    fn test_recursive_declaration_stays() {
        let program = lower("function outer() { function inner(n) { return n ? inner(n - 1) : 0; } }");
        assert_eq!(destination(&program, "inner"), None);
    }

    #[test]
    fn test_loop_scope_is_not_hostable() {
        let program = lower(
            "function outer() { for (let i = 0; i < 3; i++) { const f = () => i; } }",
        );
        assert_eq!(destination(&program, "f"), None);
    }

    #[test]
    fn test_block_scope_destination() {
        let program = lower(
            "function outer() { { let k = 1; function mid() { const f = () => k; } } }",
        );
        let dest = destination(&program, "f").unwrap();
        assert_eq!(program.scopes.scope(dest).kind, ScopeKind::Block);
    }

    #[test]
    fn test_eval_function_is_a_ceiling() {
        let program = lower(
            "function outer() { eval('var x = 1'); function mid() { return () => x; } }",
        );
        let risks = RiskTable::build(&program.tree, program.root);
        let arrow = program.tree.functions_post_order(program.root)[0];
        let scope = program.tree.node(arrow).scope.unwrap();
        let target = resolve_target(&program, &risks, arrow, scope);
        assert_eq!(target.destination, Some(scope_of(&program, "outer")));
    }

    #[test]
    fn test_private_name_stays_in_class() {
        let program = lower(
            "function outer() { class A { #x = 1; static read() { return function get(o) { return o.#x; }; } } }",
        );
        assert_eq!(destination(&program, "get"), None);
    }
}
