//! Eligibility classification
//!
//! Decides, from the risk marks and the shape of the tree around it, whether
//! a closure may be relocated at all. Classification has no side effects.

use crate::resolve;
use crate::risk::RiskTable;
use hoist_hir::{FunctionKind, Program};
use hoist_types::{BindingId, NodeId, ScopeId, ScopeKind};
use std::fmt;

/// Why a closure stays where it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Class or object method, accessor or constructor
    Method,
    CapturesThis,
    UsesEval,
    /// Inside a region produced by a generating or compacting transform
    GeneratedAncestor,
    AlreadyHoisted,
    /// The declared name is reassigned or redeclared
    MutatedDeclaration,
    /// The declared name is visible to `eval` or `with` code
    DynamicScopeBinding,
    /// Block-level declaration in sloppy code, also bound in the enclosing function
    SloppyBlockFunction,
    UnrecognizedShape,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Method => "method",
            SkipReason::CapturesThis => "captures this",
            SkipReason::UsesEval => "uses eval",
            SkipReason::GeneratedAncestor => "inside generated code",
            SkipReason::AlreadyHoisted => "already hoisted",
            SkipReason::MutatedDeclaration => "declaration is reassigned",
            SkipReason::DynamicScopeBinding => "declaration is visible to eval",
            SkipReason::SloppyBlockFunction => "block-level function in sloppy code",
            SkipReason::UnrecognizedShape => "unrecognized shape",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Skip(SkipReason),
}

/// Everything the pass learns about one closure before deciding to move it.
#[derive(Debug, Clone)]
pub struct ClosureCandidate {
    pub function: NodeId,
    /// Scope created by the closure
    pub scope: ScopeId,
    /// Bindings from enclosing scopes used inside the closure
    pub free_bindings: Vec<BindingId>,
    pub verdict: Verdict,
    pub destination: Option<ScopeId>,
}

impl ClosureCandidate {
    /// Classify `function` and, when eligible, resolve its destination.
    ///
    /// Returns `None` for nodes that are not functions with a scope.
    pub fn analyze(program: &Program, risks: &RiskTable, function: NodeId) -> Option<Self> {
        let scope = program.tree.node(function).scope?;
        program.tree.as_function(function)?;

        let verdict = classify(program, risks, function, scope);
        let mut candidate = ClosureCandidate {
            function,
            scope,
            free_bindings: Vec::new(),
            verdict,
            destination: None,
        };
        if verdict == Verdict::Eligible {
            let target = resolve::resolve_target(program, risks, function, scope);
            candidate.free_bindings = target.free_bindings;
            candidate.destination = target.destination;
        }
        Some(candidate)
    }

    pub fn is_eligible(&self) -> bool {
        self.verdict == Verdict::Eligible
    }
}

/// Decide whether the closure `function`, which creates `scope`, may move.
pub fn classify(program: &Program, risks: &RiskTable, function: NodeId, scope: ScopeId) -> Verdict {
    let tree = &program.tree;
    let Some(f) = tree.as_function(function) else {
        return Verdict::Skip(SkipReason::UnrecognizedShape);
    };
    let node = tree.node(function);

    if node.flags.hoisted {
        return Verdict::Skip(SkipReason::AlreadyHoisted);
    }
    if f.kind.is_method() {
        return Verdict::Skip(SkipReason::Method);
    }
    let marks = risks.marks(function);
    if marks.captures_this {
        return Verdict::Skip(SkipReason::CapturesThis);
    }
    if marks.uses_eval {
        return Verdict::Skip(SkipReason::UsesEval);
    }
    if tree.ancestors(function).any(|a| {
        let flags = tree.node(a).flags;
        flags.generated || flags.compact
    }) {
        return Verdict::Skip(SkipReason::GeneratedAncestor);
    }

    let scopes = &program.scopes;
    let Some(parent) = scopes.parent(scope) else {
        return Verdict::Skip(SkipReason::UnrecognizedShape);
    };
    let name = f.id.and_then(|id| tree.ident_name(id));

    match (f.kind, name) {
        (FunctionKind::Declaration, Some(name)) => {
            let in_statement_list = tree
                .parent(function)
                .and_then(|p| tree.statement_list(p))
                .is_some_and(|list| list.contains(&function));
            if !in_statement_list {
                return Verdict::Skip(SkipReason::UnrecognizedShape);
            }
            let block_level = !matches!(scopes.scope(parent).kind, ScopeKind::Function | ScopeKind::Program);
            if block_level && !scopes.is_strict(parent) {
                return Verdict::Skip(SkipReason::SloppyBlockFunction);
            }
            if let Some(binding) = scopes.own_binding(parent, name) {
                if !scopes.binding(binding).mutations.is_empty() {
                    return Verdict::Skip(SkipReason::MutatedDeclaration);
                }
            }
            if owning_function_uses_eval(program, risks, parent) {
                return Verdict::Skip(SkipReason::DynamicScopeBinding);
            }
        }
        (FunctionKind::Declaration, None) => return Verdict::Skip(SkipReason::UnrecognizedShape),
        (_, Some(name)) => {
            // Named function expression: its own name is folded into the new declaration
            if let Some(binding) = scopes.own_binding(scope, name) {
                if !scopes.binding(binding).mutations.is_empty() {
                    return Verdict::Skip(SkipReason::MutatedDeclaration);
                }
            }
        }
        (_, None) => {}
    }

    Verdict::Eligible
}

/// Whether the function (or program) whose variable scope holds `scope` contains `eval` or `with`.
fn owning_function_uses_eval(program: &Program, risks: &RiskTable, scope: ScopeId) -> bool {
    let scopes = &program.scopes;
    let owner = scopes.var_scope(scope);
    risks.uses_eval(scopes.scope(owner).node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{closure, lower};

    fn verdict_of(source: &str, name: &str) -> Verdict {
        let program = lower(source);
        let risks = RiskTable::build(&program.tree, program.root);
        let candidate = ClosureCandidate::analyze(&program, &risks, closure(&program, name)).unwrap();
        candidate.verdict
    }

    fn method_verdicts(source: &str) -> Vec<Verdict> {
        let program = lower(source);
        let risks = RiskTable::build(&program.tree, program.root);
        program
            .tree
            .functions_post_order(program.root)
            .into_iter()
            .filter(|&f| program.tree.as_function(f).is_some_and(|f| f.kind.is_method()))
            .map(|f| ClosureCandidate::analyze(&program, &risks, f).unwrap().verdict)
            .collect()
    }

    #[test]
    fn test_plain_closure_is_eligible() {
        let verdict = verdict_of("function outer() { function inner() { return 1; } }", "inner");
        assert_eq!(verdict, Verdict::Eligible);
    }

    #[test]
    fn test_methods_are_skipped() {
        let verdicts = method_verdicts(
            "class A { m() {} get g() { return 1; } constructor() {} }\nconst o = { m() {}, set s(v) {} };",
        );
        assert_eq!(verdicts.len(), 5);
        assert!(verdicts.iter().all(|v| *v == Verdict::Skip(SkipReason::Method)));
    }

    #[test]
    fn test_risky_closures_are_skipped() {
        assert_eq!(
            verdict_of("function outer() { const a = () => this.value; }", "a"),
            Verdict::Skip(SkipReason::CapturesThis)
        );
        assert_eq!(
            verdict_of("function outer() { function inner() { return eval('1'); } }", "inner"),
            Verdict::Skip(SkipReason::UsesEval)
        );
    }

    #[test]
    fn test_generated_ancestor_is_skipped() {
        let mut program = lower("function outer() { function inner() {} }");
        let outer = closure(&program, "outer");
        program.tree.node_mut(outer).flags.generated = true;
        let risks = RiskTable::build(&program.tree, program.root);

        let inner = ClosureCandidate::analyze(&program, &risks, closure(&program, "inner")).unwrap();
        assert_eq!(inner.verdict, Verdict::Skip(SkipReason::GeneratedAncestor));
        // The flag applies to descendants only
        let outer = ClosureCandidate::analyze(&program, &risks, outer).unwrap();
        assert_eq!(outer.verdict, Verdict::Eligible);
    }

    #[test]
    fn test_compact_ancestor_is_skipped() {
        let mut program = lower("function outer() { const a = () => 1; }");
        let root = program.root;
        program.tree.node_mut(root).flags.compact = true;
        let risks = RiskTable::build(&program.tree, program.root);

        let a = ClosureCandidate::analyze(&program, &risks, closure(&program, "a")).unwrap();
        assert_eq!(a.verdict, Verdict::Skip(SkipReason::GeneratedAncestor));
    }

    #[test]
    fn test_hoisted_flag_is_skipped() {
        let mut program = lower("function outer() { function inner() {} }");
        let inner = closure(&program, "inner");
        program.tree.node_mut(inner).flags.hoisted = true;
        let risks = RiskTable::build(&program.tree, program.root);

        let candidate = ClosureCandidate::analyze(&program, &risks, inner).unwrap();
        assert_eq!(candidate.verdict, Verdict::Skip(SkipReason::AlreadyHoisted));
    }

    #[test]
    fn test_reassigned_declaration_is_skipped() {
        assert_eq!(
            verdict_of("function outer() { function inner() {} inner = null; }", "inner"),
            Verdict::Skip(SkipReason::MutatedDeclaration)
        );
    }

    #[test]
    fn test_declaration_visible_to_eval_is_skipped() {
        assert_eq!(
            verdict_of("function outer() { function inner() {} return eval('inner'); }", "inner"),
            Verdict::Skip(SkipReason::DynamicScopeBinding)
        );
    }

    #[test]
    fn test_declaration_outside_statement_list_is_skipped() {
        let program = crate::test_util::lower_as(
            "function outer() { label: function inner() {} }",
            hoist_types::SourceType::Script,
        );
        let risks = RiskTable::build(&program.tree, program.root);
        let candidate = ClosureCandidate::analyze(&program, &risks, closure(&program, "inner")).unwrap();
        assert_eq!(candidate.verdict, Verdict::Skip(SkipReason::UnrecognizedShape));
    }

    #[test]
    fn test_sloppy_block_function_is_skipped() {
        let source = "function outer(x) { if (x) { function inner() {} } return inner; }";
        let program = crate::test_util::lower_as(source, hoist_types::SourceType::Script);
        let risks = RiskTable::build(&program.tree, program.root);
        let candidate = ClosureCandidate::analyze(&program, &risks, closure(&program, "inner")).unwrap();
        assert_eq!(candidate.verdict, Verdict::Skip(SkipReason::SloppyBlockFunction));

        // Module code is strict, so the declaration is block-scoped only
        assert_eq!(verdict_of(source, "inner"), Verdict::Eligible);
    }

    #[test]
    fn test_free_bindings_collected() {
        let program = lower("function outer(x, y) { return function () { return x; }; }");
        let risks = RiskTable::build(&program.tree, program.root);
        let functions = program.tree.functions_post_order(program.root);
        let candidate = ClosureCandidate::analyze(&program, &risks, functions[0]).unwrap();

        assert!(candidate.is_eligible());
        let names: Vec<_> = candidate
            .free_bindings
            .iter()
            .map(|b| program.scopes.binding(*b).name.as_str())
            .collect();
        assert_eq!(names, vec!["x"]);
        assert_eq!(candidate.destination, None);
    }
}
