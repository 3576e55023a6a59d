//! Lexical scopes and bindings
//!
//! Scopes and bindings live in two arenas owned by [`ScopeTree`]. A scope
//! points at its parent by id and maps names to the bindings it declares; a
//! binding points back at its scope and records every identifier node that
//! reads or writes it.

use crate::ir::{NodeKind, Tree};
use hoist_types::{BindingId, BindingKind, NodeId, ScopeId, ScopeKind};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Node that creates the scope
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    pub bindings: HashMap<String, BindingId>,
    /// Strict mode code: inherited from the parent, or set by a module,
    /// a class body or a `"use strict"` directive
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub scope: ScopeId,
    /// Identifier node of the first declaration
    pub declaration: Option<NodeId>,
    /// Read uses
    pub references: Vec<NodeId>,
    /// Writes: assignment and update targets, plus re-declarations
    pub mutations: Vec<NodeId>,
}

impl Binding {
    /// Every use site, reads first.
    pub fn sites(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.references.iter().chain(self.mutations.iter()).copied()
    }
}

/// The scope arena. The first scope added is the root.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    /// Every name declared, referenced or generated anywhere in the program
    used_names: HashSet<String>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scope(&mut self, kind: ScopeKind, node: NodeId, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len());
        let strict = parent.is_some_and(|p| self.scope(p).strict);
        self.scopes.push(Scope {
            kind,
            node,
            parent,
            bindings: HashMap::new(),
            strict,
        });
        id
    }

    /// Mark `scope` as strict. Scopes added under it afterwards inherit this.
    pub fn mark_strict(&mut self, scope: ScopeId) {
        self.scopes[scope.index()].strict = true;
    }

    pub fn is_strict(&self, scope: ScopeId) -> bool {
        self.scope(scope).strict
    }

    /// Nearest function or program scope at or above `scope`, where `var` binds.
    pub fn var_scope(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope)
            .into_iter()
            .find(|&s| matches!(self.scope(s).kind, ScopeKind::Function | ScopeKind::Program))
            .unwrap_or_else(|| self.root())
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    pub fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.index()]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    /// `[start, parent(start), ..., root]`
    pub fn ancestors(&self, start: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            out.push(id);
            current = self.parent(id);
        }
        out
    }

    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        self.ancestors(scope).contains(&ancestor)
    }

    /// Declare `name` in `scope`. A name already declared there keeps its
    /// binding and the new declaration site is recorded as a mutation.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
        declaration: Option<NodeId>,
    ) -> BindingId {
        self.used_names.insert(name.to_string());
        if let Some(&existing) = self.scope(scope).bindings.get(name) {
            if let Some(site) = declaration {
                self.binding_mut(existing).mutations.push(site);
            }
            return existing;
        }

        let id = BindingId::from_index(self.bindings.len());
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            scope,
            declaration,
            references: Vec::new(),
            mutations: Vec::new(),
        });
        self.scopes[scope.index()].bindings.insert(name.to_string(), id);
        id
    }

    pub fn own_binding(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        self.scope(scope).bindings.get(name).copied()
    }

    /// Resolve `name` from `scope` outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(binding) = self.own_binding(id, name) {
                return Some(binding);
            }
            current = self.parent(id);
        }
        None
    }

    /// Bindings visible from `scope`, innermost first. Shadowed names are
    /// reported once, for the binding that wins.
    pub fn visible_bindings(&self, scope: ScopeId) -> Vec<BindingId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.ancestors(scope) {
            let mut own: Vec<_> = self.scope(id).bindings.iter().collect();
            own.sort_by_key(|(_, b)| **b);
            for (name, binding) in own {
                if seen.insert(name.as_str()) {
                    out.push(*binding);
                }
            }
        }
        out
    }

    /// Record a global (unresolved) name so generated names avoid it.
    pub fn note_global(&mut self, name: &str) {
        self.used_names.insert(name.to_string());
    }

    pub fn is_used_name(&self, name: &str) -> bool {
        self.used_names.contains(name)
    }

    /// A fresh identifier derived from `seed`, unique in the whole program.
    ///
    /// Leading underscores and trailing digits are stripped from the seed
    /// and non-identifier characters dropped; an empty seed becomes `ref`.
    pub fn generate_uid(&mut self, seed: &str, scope: ScopeId) -> String {
        let base = sanitize_seed(seed);
        let mut counter = 1;
        loop {
            let candidate = if counter > 1 {
                format!("_{}{}", base, counter)
            } else {
                format!("_{}", base)
            };
            counter += 1;
            if !self.used_names.contains(&candidate) && self.lookup(scope, &candidate).is_none() {
                self.used_names.insert(candidate.clone());
                return candidate;
            }
        }
    }

    /// Rename a binding everywhere: its scope entry, declaration and every use site.
    pub fn rename(&mut self, tree: &mut Tree, binding: BindingId, new_name: &str) {
        let old_name = std::mem::replace(&mut self.binding_mut(binding).name, new_name.to_string());
        let scope = self.binding(binding).scope;
        let table = &mut self.scopes[scope.index()].bindings;
        if table.get(&old_name) == Some(&binding) {
            table.remove(&old_name);
        }
        table.insert(new_name.to_string(), binding);
        self.used_names.insert(new_name.to_string());

        let b = self.binding(binding);
        for site in b.declaration.into_iter().chain(b.sites()) {
            if let NodeKind::Ident { name } = &mut tree.node_mut(site).kind {
                *name = new_name.to_string();
            }
        }
    }

    /// Move a binding's table entry from its scope to `to`.
    pub fn move_binding(&mut self, binding: BindingId, to: ScopeId) {
        self.remove_binding(binding);
        let name = self.binding(binding).name.clone();
        self.scopes[to.index()].bindings.insert(name, binding);
        self.binding_mut(binding).scope = to;
    }

    /// Drop a binding from its scope's table. The arena slot stays so ids remain valid.
    pub fn remove_binding(&mut self, binding: BindingId) {
        let b = &self.bindings[binding.index()];
        let table = &mut self.scopes[b.scope.index()].bindings;
        if table.get(&b.name) == Some(&binding) {
            table.remove(&b.name);
        }
    }

    pub fn reparent(&mut self, scope: ScopeId, new_parent: ScopeId) {
        self.scopes[scope.index()].parent = Some(new_parent);
    }

    /// The node whose statement list can receive a declaration for `scope`.
    ///
    /// Program and block scopes host their own body; function scopes host
    /// their block body; catch scopes host the catch body. Expression-bodied
    /// arrows, loop heads, switches and classes have no host.
    pub fn statement_host(&self, tree: &Tree, scope: ScopeId) -> Option<NodeId> {
        let node = self.scope(scope).node;
        match (self.scope(scope).kind, tree.kind(node)) {
            (ScopeKind::Program, _) | (ScopeKind::Block, _) => Some(node),
            (ScopeKind::Function, NodeKind::Function(f)) if !f.expression_body => Some(f.body),
            // Class static blocks
            (ScopeKind::Function, NodeKind::Block { .. }) => Some(node),
            (ScopeKind::Catch, NodeKind::CatchClause { body, .. }) => Some(*body),
            _ => None,
        }
    }
}

fn sanitize_seed(seed: &str) -> String {
    let cleaned: String = seed
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    let trimmed = cleaned
        .trim_start_matches('_')
        .trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.is_empty() || trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        "ref".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_diagnostics::Span;

    fn ident(tree: &mut Tree, name: &str) -> NodeId {
        tree.alloc(NodeKind::Ident { name: name.to_string() }, Span::DUMMY)
    }

    fn two_level() -> (Tree, ScopeTree, ScopeId, ScopeId) {
        let mut tree = Tree::new();
        let root_node = tree.alloc(NodeKind::Block { body: vec![] }, Span::DUMMY);
        let inner_node = tree.alloc(NodeKind::Block { body: vec![] }, Span::DUMMY);
        let mut scopes = ScopeTree::new();
        let root = scopes.add_scope(ScopeKind::Program, root_node, None);
        let inner = scopes.add_scope(ScopeKind::Block, inner_node, Some(root));
        (tree, scopes, root, inner)
    }

    #[test]
    fn test_lookup_walks_chain() {
        let (_, mut scopes, root, inner) = two_level();
        let outer_x = scopes.declare(root, "x", BindingKind::Var, None);
        let y = scopes.declare(inner, "y", BindingKind::Let, None);

        assert_eq!(scopes.lookup(inner, "x"), Some(outer_x));
        assert_eq!(scopes.lookup(inner, "y"), Some(y));
        assert_eq!(scopes.lookup(root, "y"), None);
        assert_eq!(scopes.own_binding(inner, "x"), None);
        assert_eq!(scopes.ancestors(inner), vec![inner, root]);
    }

    #[test]
    fn test_visible_bindings_respects_shadowing() {
        let (_, mut scopes, root, inner) = two_level();
        scopes.declare(root, "x", BindingKind::Var, None);
        let a = scopes.declare(root, "a", BindingKind::Var, None);
        let inner_x = scopes.declare(inner, "x", BindingKind::Let, None);

        let visible = scopes.visible_bindings(inner);
        assert_eq!(visible, vec![inner_x, a]);
    }

    #[test]
    fn test_redeclaration_is_a_mutation() {
        let (mut tree, mut scopes, root, _) = two_level();
        let first = ident(&mut tree, "f");
        let second = ident(&mut tree, "f");
        let b = scopes.declare(root, "f", BindingKind::Function, Some(first));
        assert_eq!(scopes.declare(root, "f", BindingKind::Var, Some(second)), b);
        assert_eq!(scopes.binding(b).declaration, Some(first));
        assert_eq!(scopes.binding(b).mutations, vec![second]);
    }

    #[test]
    fn test_generate_uid_sequence() {
        let (_, mut scopes, root, inner) = two_level();
        scopes.declare(root, "_inner", BindingKind::Var, None);
        scopes.note_global("_inner2");

        assert_eq!(scopes.generate_uid("inner", inner), "_inner3");
        assert_eq!(scopes.generate_uid("inner", inner), "_inner4");
        assert_eq!(scopes.generate_uid("other", inner), "_other");
        assert_eq!(scopes.generate_uid("", inner), "_ref");
        assert_eq!(scopes.generate_uid("__x12", inner), "_x");
    }

    #[test]
    fn test_rename_updates_sites() {
        let (mut tree, mut scopes, root, _) = two_level();
        let decl = ident(&mut tree, "f");
        let read = ident(&mut tree, "f");
        let write = ident(&mut tree, "f");
        let b = scopes.declare(root, "f", BindingKind::Function, Some(decl));
        scopes.binding_mut(b).references.push(read);
        scopes.binding_mut(b).mutations.push(write);

        scopes.rename(&mut tree, b, "_f");
        for site in [decl, read, write] {
            assert_eq!(tree.ident_name(site), Some("_f"));
        }
        assert_eq!(scopes.own_binding(root, "_f"), Some(b));
        assert_eq!(scopes.own_binding(root, "f"), None);
        assert!(scopes.is_used_name("_f"));
    }

    #[test]
    fn test_move_binding_and_reparent() {
        let (mut tree, mut scopes, root, inner) = two_level();
        let third_node = tree.alloc(NodeKind::Block { body: vec![] }, Span::DUMMY);
        let third = scopes.add_scope(ScopeKind::Block, third_node, Some(inner));
        let b = scopes.declare(third, "g", BindingKind::Function, None);

        scopes.move_binding(b, root);
        assert_eq!(scopes.binding(b).scope, root);
        assert_eq!(scopes.own_binding(root, "g"), Some(b));
        assert_eq!(scopes.own_binding(third, "g"), None);

        scopes.reparent(third, root);
        assert_eq!(scopes.ancestors(third), vec![third, root]);
    }

    #[test]
    fn test_strictness_is_inherited() {
        let (mut tree, mut scopes, root, inner) = two_level();
        assert!(!scopes.is_strict(inner));

        let strict_node = tree.alloc(NodeKind::Block { body: vec![] }, Span::DUMMY);
        let strict = scopes.add_scope(ScopeKind::Function, strict_node, Some(inner));
        scopes.mark_strict(strict);
        let nested_node = tree.alloc(NodeKind::Block { body: vec![] }, Span::DUMMY);
        let nested = scopes.add_scope(ScopeKind::Block, nested_node, Some(strict));

        assert!(scopes.is_strict(nested));
        assert!(!scopes.is_strict(root));
        assert_eq!(scopes.var_scope(nested), strict);
        assert_eq!(scopes.var_scope(inner), root);
    }

    #[test]
    fn test_statement_host() {
        let (tree, scopes, root, inner) = two_level();
        assert_eq!(scopes.statement_host(&tree, root), Some(scopes.scope(root).node));
        assert_eq!(scopes.statement_host(&tree, inner), Some(scopes.scope(inner).node));
    }
}
