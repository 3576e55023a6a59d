//! Tree rewrite for a relocated closure
//!
//! A function declaration is renamed and moved as is. A function or arrow
//! expression becomes a new declaration at the destination, and its old
//! position gets a reference to the generated name. Either way the scope
//! model is updated before the next closure is analyzed.

use crate::eligibility::ClosureCandidate;
use crate::error::HoistError;
use hoist_diagnostics::Span;
use hoist_hir::{Function, FunctionKind, NodeKind, Program};
use hoist_types::{BindingKind, NodeId, ScopeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoistCase {
    /// A function declaration, moved and renamed
    Declaration,
    /// A function or arrow expression, replaced by a reference
    Expression,
}

impl HoistCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoistCase::Declaration => "declaration",
            HoistCase::Expression => "expression",
        }
    }
}

/// One relocated closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedClosure {
    pub function: NodeId,
    /// Name before the move; `None` for anonymous expressions
    pub original_name: Option<String>,
    pub generated_name: String,
    pub case: HoistCase,
    pub span: Span,
    pub destination: ScopeId,
}

/// Move `candidate` into `destination`, right before `anchor`.
pub fn relocate(
    program: &mut Program,
    candidate: &ClosureCandidate,
    destination: ScopeId,
    anchor: NodeId,
) -> Result<HoistedClosure, HoistError> {
    let Some(f) = program.tree.as_function(candidate.function).cloned() else {
        return Err(HoistError::NotAFunction(candidate.function));
    };
    if f.kind == FunctionKind::Declaration {
        relocate_declaration(program, candidate, destination, anchor)
    } else {
        relocate_expression(program, candidate, f, destination, anchor)
    }
}

fn declared_name(program: &Program, function: NodeId) -> Option<String> {
    let id = program.tree.as_function(function)?.id?;
    program.tree.ident_name(id).map(str::to_string)
}

fn relocate_declaration(
    program: &mut Program,
    candidate: &ClosureCandidate,
    destination: ScopeId,
    anchor: NodeId,
) -> Result<HoistedClosure, HoistError> {
    let function = candidate.function;
    let name = declared_name(program, function).unwrap_or_default();
    let parent = program.scopes.parent(candidate.scope).unwrap_or(candidate.scope);
    let binding = program
        .scopes
        .own_binding(parent, &name)
        .ok_or_else(|| HoistError::UnboundDeclaration {
            closure: function,
            scope: parent,
            name: name.clone(),
        })?;

    let uid = program.scopes.generate_uid(&name, destination);
    program.scopes.rename(&mut program.tree, binding, &uid);
    program.scopes.move_binding(binding, destination);

    program.tree.node_mut(function).flags.hoisted = true;
    program.tree.remove(function)?;
    program.tree.insert_before(anchor, function)?;
    program.scopes.reparent(candidate.scope, destination);

    Ok(HoistedClosure {
        function,
        original_name: Some(name),
        generated_name: uid,
        case: HoistCase::Declaration,
        span: program.tree.node(function).span,
        destination,
    })
}

fn relocate_expression(
    program: &mut Program,
    candidate: &ClosureCandidate,
    mut f: Function,
    destination: ScopeId,
    anchor: NodeId,
) -> Result<HoistedClosure, HoistError> {
    let function = candidate.function;
    let original_name = declared_name(program, function);
    let uid = program
        .scopes
        .generate_uid(original_name.as_deref().unwrap_or("ref"), destination);
    let span = program.tree.node(function).span;
    let tree = &mut program.tree;

    // A declaration needs a block body
    if f.expression_body {
        let body_span = tree.node(f.body).span;
        let ret = tree.alloc(NodeKind::Return { arg: Some(f.body) }, body_span);
        f.body = tree.alloc(NodeKind::Block { body: vec![ret] }, body_span);
        f.expression_body = false;
    }

    let reference = tree.alloc(NodeKind::Ident { name: uid.clone() }, span);
    tree.replace(function, reference)?;

    let new_id = tree.alloc(NodeKind::Ident { name: uid.clone() }, span);
    let old_id = f.id.replace(new_id);
    f.kind = FunctionKind::Declaration;
    tree.set_kind(function, NodeKind::Function(f));
    tree.node_mut(function).flags.hoisted = true;
    tree.insert_before(anchor, function)?;

    let scopes = &mut program.scopes;
    let binding = scopes.declare(destination, &uid, BindingKind::Function, Some(new_id));
    scopes.binding_mut(binding).references.push(reference);

    // A named expression's own name now refers to the declaration
    if let (Some(old_id), Some(name)) = (old_id, original_name.as_deref()) {
        let own = scopes
            .own_binding(candidate.scope, name)
            .filter(|&b| scopes.binding(b).declaration == Some(old_id));
        if let Some(own) = own {
            scopes.rename(&mut program.tree, own, &uid);
            let own_binding = scopes.binding_mut(own);
            let references = std::mem::take(&mut own_binding.references);
            let mutations = std::mem::take(&mut own_binding.mutations);
            scopes.remove_binding(own);
            let target = scopes.binding_mut(binding);
            target.references.extend(references);
            target.mutations.extend(mutations);
        }
    }
    scopes.reparent(candidate.scope, destination);

    Ok(HoistedClosure {
        function,
        original_name,
        generated_name: uid,
        case: HoistCase::Expression,
        span,
        destination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attach::attachment_point;
    use crate::risk::RiskTable;
    use crate::test_util::{closure, lower};
    use hoist_hir::print_program;

    fn hoist_one(program: &mut Program, function: NodeId) -> HoistedClosure {
        let risks = RiskTable::build(&program.tree, program.root);
        let candidate = ClosureCandidate::analyze(program, &risks, function).unwrap();
        let destination = candidate.destination.unwrap();
        let anchor = attachment_point(program, destination, function).unwrap();
        relocate(program, &candidate, destination, anchor).unwrap()
    }

    #[test]
    fn test_declaration_is_renamed_and_moved() {
        let mut program = lower("function outer() {\n  function inner() {\n    return 1;\n  }\n  return inner();\n}\n");
        let inner = closure(&program, "inner");
        let inner_scope = program.tree.node(inner).scope.unwrap();
        let hoisted = hoist_one(&mut program, inner);

        assert_eq!(hoisted.case, HoistCase::Declaration);
        assert_eq!(hoisted.original_name.as_deref(), Some("inner"));
        assert_eq!(hoisted.generated_name, "_inner");
        assert_eq!(
            print_program(&program),
            "function _inner() {\n  return 1;\n}\nfunction outer() {\n  return _inner();\n}\n"
        );

        let root = program.scopes.root();
        let binding = program.scopes.own_binding(root, "_inner").unwrap();
        assert_eq!(program.scopes.binding(binding).scope, root);
        assert_eq!(program.scopes.binding(binding).references.len(), 1);
        assert_eq!(program.scopes.parent(inner_scope), Some(root));
        assert!(program.tree.node(inner).flags.hoisted);
    }

    #[test]
    fn test_arrow_body_is_normalized() {
        let mut program = lower("function outer() {\n  const f = (a) => a * 2;\n  return f;\n}\n");
        let arrow = closure(&program, "f");
        let hoisted = hoist_one(&mut program, arrow);

        assert_eq!(hoisted.case, HoistCase::Expression);
        assert_eq!(hoisted.original_name, None);
        assert_eq!(hoisted.generated_name, "_ref");
        assert_eq!(
            print_program(&program),
            "function _ref(a) {\n  return a * 2;\n}\nfunction outer() {\n  const f = _ref;\n  return f;\n}\n"
        );

        let f = program.tree.as_function(arrow).unwrap();
        assert_eq!(f.kind, FunctionKind::Declaration);
        assert!(!f.expression_body);
    }

    #[test]
    fn test_expression_binding_sees_replacement() {
        let mut program = lower("function outer() { return function () { return 1; }; }");
        let expr = program.tree.functions_post_order(program.root)[0];
        hoist_one(&mut program, expr);

        let root = program.scopes.root();
        let binding = program.scopes.own_binding(root, "_ref").unwrap();
        let b = program.scopes.binding(binding);
        assert_eq!(b.kind, BindingKind::Function);
        assert_eq!(b.references.len(), 1);
        let outer = closure(&program, "outer");
        assert!(program.tree.is_ancestor_or_self(outer, b.references[0]));
    }

    #[test]
    fn test_async_and_generator_markers_kept() {
        let mut program = lower("function outer() { return [async () => 1, function* gen() { yield 1; }]; }");
        let functions = program.tree.functions_post_order(program.root);
        hoist_one(&mut program, functions[0]);
        hoist_one(&mut program, functions[1]);

        let printed = print_program(&program);
        assert!(printed.contains("async function _ref() {"));
        assert!(printed.contains("function* _gen() {"));
        assert!(printed.contains("return [_ref, _gen];"));
    }

    #[test]
    fn test_named_expression_self_reference_folded() {
        let mut program = lower(
            "function outer() { return function fact(n) { return n ? n * fact(n - 1) : 1; }; }",
        );
        let fact = closure(&program, "fact");
        let fact_scope = program.tree.node(fact).scope.unwrap();
        let hoisted = hoist_one(&mut program, fact);

        assert_eq!(hoisted.generated_name, "_fact");
        let printed = print_program(&program);
        assert!(printed.contains("function _fact(n) {"));
        assert!(printed.contains("n * _fact(n - 1)"));
        assert!(printed.contains("return _fact;"));

        let root = program.scopes.root();
        let binding = program.scopes.own_binding(root, "_fact").unwrap();
        assert_eq!(program.scopes.binding(binding).references.len(), 2);
        assert!(program.scopes.own_binding(fact_scope, "fact").is_none());
        assert!(program.scopes.own_binding(fact_scope, "_fact").is_none());
    }

    #[test]
    fn test_generated_name_avoids_collisions() {
        let mut program = lower("const _inner = 1;\nfunction outer() { function inner() {} return inner; }");
        let inner = closure(&program, "inner");
        let hoisted = hoist_one(&mut program, inner);
        assert_eq!(hoisted.generated_name, "_inner2");
    }
}
