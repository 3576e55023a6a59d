//! Arena syntax tree
//!
//! Every node lives in one `Vec` owned by [`Tree`] and is addressed by a
//! [`NodeId`]. Children are stored as ids inside [`NodeKind`], and each node
//! keeps a parent link so the tree can be walked upward without recursion.

use crate::scope::ScopeTree;
use hoist_diagnostics::{FileId, Span};
use hoist_types::{NodeId, ScopeId, SourceType};
use thiserror::Error;

/// Marks attached to a node by earlier passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Synthesized by another transform
    pub generated: bool,
    /// Produced by a compacting (minifying) transform
    pub compact: bool,
    /// Already relocated by closure hoisting
    pub hoisted: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    /// Scope created by this node, if any
    pub scope: Option<ScopeId>,
    pub flags: NodeFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// Syntactic form of a function literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
    Method,
    Getter,
    Setter,
    Constructor,
}

impl FunctionKind {
    /// Methods, accessors and constructors belong to a single object or class
    pub fn is_method(&self) -> bool {
        matches!(
            self,
            FunctionKind::Method | FunctionKind::Getter | FunctionKind::Setter | FunctionKind::Constructor
        )
    }

    /// Whether the function supplies its own `this`, `arguments` and `new.target`
    pub fn binds_this(&self) -> bool {
        !matches!(self, FunctionKind::Arrow)
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub kind: FunctionKind,
    pub id: Option<NodeId>,
    pub params: Vec<NodeId>,
    /// A `Block`, or any expression when `expression_body` is set
    pub body: NodeId,
    pub expression_body: bool,
    pub is_async: bool,
    pub is_generator: bool,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: Option<NodeId>,
    pub super_class: Option<NodeId>,
    pub members: Vec<NodeId>,
    pub is_declaration: bool,
}

/// Key of a property, method or class member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    Ident(String),
    /// Raw source text, quotes included
    Str(String),
    /// Raw source text
    Num(String),
    Computed(NodeId),
    Private(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberProp {
    Ident(String),
    Private(String),
    Computed(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Default,
    Namespace,
    /// `import { imported as local }`
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSpec {
    /// `export { orig as exported }`; `orig` is an `Ident` (or a string `Lit` in
    /// re-exports). `exported` is always filled.
    Named { orig: NodeId, exported: String },
    /// `export * as name from "..."`
    Namespace(String),
    /// `export name from "..."`
    Default(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaPropKind {
    NewTarget,
    ImportMeta,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Program { body: Vec<NodeId>, source_type: SourceType },

    // Statements
    VarDecl { kind: VarKind, decls: Vec<NodeId> },
    VarDeclarator { name: NodeId, init: Option<NodeId> },
    ExprStmt { expr: NodeId },
    Block { body: Vec<NodeId> },
    Empty,
    Debugger,
    Return { arg: Option<NodeId> },
    If { test: NodeId, cons: NodeId, alt: Option<NodeId> },
    Switch { discriminant: NodeId, cases: Vec<NodeId> },
    SwitchCase { test: Option<NodeId>, body: Vec<NodeId> },
    Throw { arg: NodeId },
    Try { block: NodeId, handler: Option<NodeId>, finalizer: Option<NodeId> },
    CatchClause { param: Option<NodeId>, body: NodeId },
    While { test: NodeId, body: NodeId },
    DoWhile { body: NodeId, test: NodeId },
    For { init: Option<NodeId>, test: Option<NodeId>, update: Option<NodeId>, body: NodeId },
    ForIn { left: NodeId, right: NodeId, body: NodeId },
    ForOf { left: NodeId, right: NodeId, body: NodeId, is_await: bool },
    Labeled { label: String, body: NodeId },
    Break { label: Option<String> },
    Continue { label: Option<String> },
    With { object: NodeId, body: NodeId },

    // Module declarations
    Import { specifiers: Vec<NodeId>, source: String },
    ImportSpecifier { kind: ImportKind, local: NodeId },
    ExportDecl { decl: NodeId },
    ExportDefaultDecl { decl: NodeId },
    ExportDefaultExpr { expr: NodeId },
    ExportNamed { specifiers: Vec<ExportSpec>, source: Option<String> },
    ExportAll { source: String },

    // Functions and classes
    Function(Function),
    Class(Class),
    ClassMethod { key: PropKey, function: NodeId, is_static: bool },
    ClassProp { key: PropKey, value: Option<NodeId>, is_static: bool },
    StaticBlock { body: NodeId },

    // Expressions
    Ident { name: String },
    This,
    Super,
    /// Any literal, regular expressions included, as raw source text
    Lit { raw: String },
    Template { quasis: Vec<String>, exprs: Vec<NodeId> },
    TaggedTemplate { tag: NodeId, template: NodeId },
    Array { elems: Vec<Option<NodeId>> },
    Object { props: Vec<NodeId> },
    /// Object literal property, also used for object pattern properties
    Property { key: PropKey, value: NodeId, shorthand: bool },
    ObjectMethod { key: PropKey, function: NodeId },
    Spread { arg: NodeId },
    Unary { op: &'static str, arg: NodeId },
    Update { op: &'static str, prefix: bool, arg: NodeId },
    Binary { op: &'static str, left: NodeId, right: NodeId },
    Assign { op: &'static str, target: NodeId, value: NodeId },
    Member { object: NodeId, prop: MemberProp, optional: bool },
    Call { callee: NodeId, args: Vec<NodeId>, optional: bool },
    New { callee: NodeId, args: Option<Vec<NodeId>> },
    Seq { exprs: Vec<NodeId> },
    Cond { test: NodeId, cons: NodeId, alt: NodeId },
    Paren { expr: NodeId },
    Yield { arg: Option<NodeId>, delegate: bool },
    Await { arg: NodeId },
    MetaProp(MetaPropKind),
    /// The `import` in `import(...)`
    ImportCallee,
    PrivateName { name: String },

    // Patterns
    ArrayPat { elems: Vec<Option<NodeId>> },
    ObjectPat { props: Vec<NodeId> },
    Rest { arg: NodeId },
    AssignPat { left: NodeId, right: NodeId },
}

/// Visit every child slot of a node kind in source order.
///
/// `$ref` is `ref` or `ref mut`; `$f` is called with `&NodeId` or
/// `&mut NodeId` accordingly.
macro_rules! visit_child_slots {
    ($kind:expr, $f:ident, $($ref:tt)+) => {
        match *$kind {
            NodeKind::Program { $($ref)+ body, .. }
            | NodeKind::Block { $($ref)+ body }
            | NodeKind::Seq { exprs: $($ref)+ body }
            | NodeKind::Object { props: $($ref)+ body }
            | NodeKind::ObjectPat { props: $($ref)+ body }
            | NodeKind::Import { specifiers: $($ref)+ body, .. }
            | NodeKind::VarDecl { decls: $($ref)+ body, .. } => {
                for c in body {
                    $f(c);
                }
            }
            NodeKind::VarDeclarator { $($ref)+ name, $($ref)+ init } => {
                $f(name);
                if let Some(c) = init {
                    $f(c);
                }
            }
            NodeKind::ExprStmt { expr: $($ref)+ c }
            | NodeKind::Throw { arg: $($ref)+ c }
            | NodeKind::Labeled { body: $($ref)+ c, .. }
            | NodeKind::ImportSpecifier { local: $($ref)+ c, .. }
            | NodeKind::ExportDecl { decl: $($ref)+ c }
            | NodeKind::ExportDefaultDecl { decl: $($ref)+ c }
            | NodeKind::ExportDefaultExpr { expr: $($ref)+ c }
            | NodeKind::StaticBlock { body: $($ref)+ c }
            | NodeKind::Spread { arg: $($ref)+ c }
            | NodeKind::Unary { arg: $($ref)+ c, .. }
            | NodeKind::Update { arg: $($ref)+ c, .. }
            | NodeKind::Paren { expr: $($ref)+ c }
            | NodeKind::Await { arg: $($ref)+ c }
            | NodeKind::Rest { arg: $($ref)+ c } => {
                $f(c);
            }
            NodeKind::Return { arg: $($ref)+ arg } | NodeKind::Yield { arg: $($ref)+ arg, .. } => {
                if let Some(c) = arg {
                    $f(c);
                }
            }
            NodeKind::If { $($ref)+ test, $($ref)+ cons, $($ref)+ alt } => {
                $f(test);
                $f(cons);
                if let Some(c) = alt {
                    $f(c);
                }
            }
            NodeKind::Switch { $($ref)+ discriminant, $($ref)+ cases } => {
                $f(discriminant);
                for c in cases {
                    $f(c);
                }
            }
            NodeKind::SwitchCase { $($ref)+ test, $($ref)+ body } => {
                if let Some(c) = test {
                    $f(c);
                }
                for c in body {
                    $f(c);
                }
            }
            NodeKind::Try { $($ref)+ block, $($ref)+ handler, $($ref)+ finalizer } => {
                $f(block);
                if let Some(c) = handler {
                    $f(c);
                }
                if let Some(c) = finalizer {
                    $f(c);
                }
            }
            NodeKind::CatchClause { $($ref)+ param, $($ref)+ body } => {
                if let Some(c) = param {
                    $f(c);
                }
                $f(body);
            }
            NodeKind::While { $($ref)+ test, $($ref)+ body } => {
                $f(test);
                $f(body);
            }
            NodeKind::DoWhile { $($ref)+ body, $($ref)+ test } => {
                $f(body);
                $f(test);
            }
            NodeKind::For { $($ref)+ init, $($ref)+ test, $($ref)+ update, $($ref)+ body } => {
                if let Some(c) = init {
                    $f(c);
                }
                if let Some(c) = test {
                    $f(c);
                }
                if let Some(c) = update {
                    $f(c);
                }
                $f(body);
            }
            NodeKind::ForIn { $($ref)+ left, $($ref)+ right, $($ref)+ body }
            | NodeKind::ForOf { $($ref)+ left, $($ref)+ right, $($ref)+ body, .. } => {
                $f(left);
                $f(right);
                $f(body);
            }
            NodeKind::With { $($ref)+ object, $($ref)+ body } => {
                $f(object);
                $f(body);
            }
            NodeKind::ExportNamed { $($ref)+ specifiers, .. } => {
                for spec in specifiers {
                    if let ExportSpec::Named { orig, .. } = spec {
                        $f(orig);
                    }
                }
            }
            NodeKind::Function(Function { $($ref)+ id, $($ref)+ params, $($ref)+ body, .. }) => {
                if let Some(c) = id {
                    $f(c);
                }
                for c in params {
                    $f(c);
                }
                $f(body);
            }
            NodeKind::Class(Class { $($ref)+ id, $($ref)+ super_class, $($ref)+ members, .. }) => {
                if let Some(c) = id {
                    $f(c);
                }
                if let Some(c) = super_class {
                    $f(c);
                }
                for c in members {
                    $f(c);
                }
            }
            NodeKind::ClassMethod { $($ref)+ key, $($ref)+ function, .. }
            | NodeKind::ObjectMethod { $($ref)+ key, $($ref)+ function } => {
                if let PropKey::Computed(c) = key {
                    $f(c);
                }
                $f(function);
            }
            NodeKind::ClassProp { $($ref)+ key, $($ref)+ value, .. } => {
                if let PropKey::Computed(c) = key {
                    $f(c);
                }
                if let Some(c) = value {
                    $f(c);
                }
            }
            NodeKind::Property { $($ref)+ key, $($ref)+ value, .. } => {
                if let PropKey::Computed(c) = key {
                    $f(c);
                }
                $f(value);
            }
            NodeKind::Template { $($ref)+ exprs, .. } => {
                for c in exprs {
                    $f(c);
                }
            }
            NodeKind::TaggedTemplate { $($ref)+ tag, $($ref)+ template } => {
                $f(tag);
                $f(template);
            }
            NodeKind::Array { $($ref)+ elems } | NodeKind::ArrayPat { $($ref)+ elems } => {
                for e in elems {
                    if let Some(c) = e {
                        $f(c);
                    }
                }
            }
            NodeKind::Binary { $($ref)+ left, $($ref)+ right, .. }
            | NodeKind::AssignPat { $($ref)+ left, $($ref)+ right } => {
                $f(left);
                $f(right);
            }
            NodeKind::Assign { $($ref)+ target, $($ref)+ value, .. } => {
                $f(target);
                $f(value);
            }
            NodeKind::Member { $($ref)+ object, $($ref)+ prop, .. } => {
                $f(object);
                if let MemberProp::Computed(c) = prop {
                    $f(c);
                }
            }
            NodeKind::Call { $($ref)+ callee, $($ref)+ args, .. } => {
                $f(callee);
                for c in args {
                    $f(c);
                }
            }
            NodeKind::New { $($ref)+ callee, $($ref)+ args } => {
                $f(callee);
                if let Some(args) = args {
                    for c in args {
                        $f(c);
                    }
                }
            }
            NodeKind::Cond { $($ref)+ test, $($ref)+ cons, $($ref)+ alt } => {
                $f(test);
                $f(cons);
                $f(alt);
            }
            NodeKind::Empty
            | NodeKind::Debugger
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::ExportAll { .. }
            | NodeKind::Ident { .. }
            | NodeKind::This
            | NodeKind::Super
            | NodeKind::Lit { .. }
            | NodeKind::MetaProp(_)
            | NodeKind::ImportCallee
            | NodeKind::PrivateName { .. } => {}
        }
    };
}

impl NodeKind {
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        let mut visit = |c: &NodeId| f(*c);
        visit_child_slots!(self, visit, ref);
    }

    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut NodeId)) {
        visit_child_slots!(self, f, ref mut);
    }

    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::Function(_))
    }
}

/// A structural edit was requested at a position that cannot take it
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} has no parent")]
    Detached(NodeId),

    #[error("node {node} is not an entry of a statement list (parent {parent})")]
    NotInStatementList { node: NodeId, parent: NodeId },

    #[error("node {child} is not a child of {parent}")]
    NotAChild { child: NodeId, parent: NodeId },
}

/// The node arena
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node and adopt its children.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = self.reserve(span);
        self.set_kind(id, kind);
        id
    }

    /// Add a placeholder node whose kind is filled in later with [`Tree::set_kind`].
    ///
    /// Lowering uses this for nodes that own a scope, since the scope must
    /// point at its node before the children are lowered.
    pub fn reserve(&mut self, span: Span) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Empty,
            span,
            parent: None,
            scope: None,
            flags: NodeFlags::default(),
        });
        id
    }

    /// Replace a node's kind and adopt the children it names.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        kind.for_each_child(|c| self.nodes[c.index()].parent = Some(id));
        self.nodes[id.index()].kind = kind;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.kind(id).for_each_child(|c| out.push(c));
        out
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// The subtree rooted at `id`, pre-order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let start = stack.len();
            self.kind(current).for_each_child(|c| stack.push(c));
            stack[start..].reverse();
        }
        out
    }

    /// Function nodes under `root` in post-order: a function comes after
    /// every function nested in it, siblings in source order.
    pub fn functions_post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((current, exiting)) = stack.pop() {
            if exiting {
                if self.kind(current).is_function() {
                    out.push(current);
                }
                continue;
            }
            stack.push((current, true));
            let start = stack.len();
            self.kind(current).for_each_child(|c| stack.push((c, false)));
            stack[start..].reverse();
        }
        out
    }

    pub fn as_function(&self, id: NodeId) -> Option<&Function> {
        match self.kind(id) {
            NodeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self, id: NodeId) -> Option<&mut Function> {
        match &mut self.node_mut(id).kind {
            NodeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// The ordered statements of a program, block or switch case.
    pub fn statement_list(&self, id: NodeId) -> Option<&Vec<NodeId>> {
        match self.kind(id) {
            NodeKind::Program { body, .. }
            | NodeKind::Block { body }
            | NodeKind::SwitchCase { body, .. } => Some(body),
            _ => None,
        }
    }

    fn statement_list_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Program { body, .. }
            | NodeKind::Block { body }
            | NodeKind::SwitchCase { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Locate `node` inside its parent's statement list.
    fn list_position(&self, node: NodeId) -> Result<(NodeId, usize), TreeError> {
        let parent = self.parent(node).ok_or(TreeError::Detached(node))?;
        let position = self
            .statement_list(parent)
            .and_then(|list| list.iter().position(|&s| s == node))
            .ok_or(TreeError::NotInStatementList { node, parent })?;
        Ok((parent, position))
    }

    /// Insert `node` into the statement list holding `anchor`, right before it.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<(), TreeError> {
        let (parent, position) = self.list_position(anchor)?;
        if let Some(list) = self.statement_list_mut(parent) {
            list.insert(position, node);
        }
        self.node_mut(node).parent = Some(parent);
        Ok(())
    }

    /// Detach a statement from its statement list.
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreeError> {
        let (parent, position) = self.list_position(node)?;
        if let Some(list) = self.statement_list_mut(parent) {
            list.remove(position);
        }
        self.node_mut(node).parent = None;
        Ok(())
    }

    /// Put `new` into the child slot currently holding `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(old).ok_or(TreeError::Detached(old))?;
        let mut found = false;
        self.node_mut(parent).kind.for_each_child_mut(|slot| {
            if *slot == old && !found {
                *slot = new;
                found = true;
            }
        });
        if !found {
            return Err(TreeError::NotAChild { child: old, parent });
        }
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
        Ok(())
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// A lowered program: the node arena plus its scope model.
#[derive(Debug, Clone)]
pub struct Program {
    pub tree: Tree,
    pub scopes: ScopeTree,
    pub root: NodeId,
    pub source_type: SourceType,
    pub file_id: FileId,
}

impl Program {
    /// The nearest scope containing `node`, counting a scope `node` itself creates.
    pub fn enclosing_scope(&self, node: NodeId) -> Option<ScopeId> {
        std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .find_map(|id| self.tree.node(id).scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(tree: &mut Tree, name: &str) -> NodeId {
        tree.alloc(NodeKind::Ident { name: name.to_string() }, Span::DUMMY)
    }

    fn stmt(tree: &mut Tree, name: &str) -> NodeId {
        let expr = ident(tree, name);
        tree.alloc(NodeKind::ExprStmt { expr }, Span::DUMMY)
    }

    fn block_of(tree: &mut Tree, names: &[&str]) -> (NodeId, Vec<NodeId>) {
        let stmts: Vec<_> = names.iter().map(|n| stmt(tree, n)).collect();
        let block = tree.alloc(NodeKind::Block { body: stmts.clone() }, Span::DUMMY);
        (block, stmts)
    }

    #[test]
    fn test_alloc_sets_parents() {
        let mut tree = Tree::new();
        let (block, stmts) = block_of(&mut tree, &["a", "b"]);
        assert_eq!(tree.parent(stmts[0]), Some(block));
        assert_eq!(tree.children(block), stmts);
        assert_eq!(tree.parent(block), None);
    }

    #[test]
    fn test_insert_before_and_remove() {
        let mut tree = Tree::new();
        let (block, stmts) = block_of(&mut tree, &["a", "b"]);
        let new = stmt(&mut tree, "c");

        tree.insert_before(stmts[1], new).unwrap();
        assert_eq!(tree.statement_list(block).unwrap(), &vec![stmts[0], new, stmts[1]]);
        assert_eq!(tree.parent(new), Some(block));

        tree.remove(stmts[0]).unwrap();
        assert_eq!(tree.statement_list(block).unwrap(), &vec![new, stmts[1]]);
        assert_eq!(tree.parent(stmts[0]), None);
    }

    #[test]
    fn test_remove_outside_statement_list_fails() {
        let mut tree = Tree::new();
        let (_, stmts) = block_of(&mut tree, &["a"]);
        let expr = tree.children(stmts[0])[0];
        assert_eq!(
            tree.remove(expr),
            Err(TreeError::NotInStatementList { node: expr, parent: stmts[0] })
        );
        let detached = ident(&mut tree, "x");
        assert_eq!(tree.remove(detached), Err(TreeError::Detached(detached)));
    }

    #[test]
    fn test_replace_child_slot() {
        let mut tree = Tree::new();
        let left = ident(&mut tree, "a");
        let right = ident(&mut tree, "b");
        let bin = tree.alloc(NodeKind::Binary { op: "+", left, right }, Span::DUMMY);
        let new = ident(&mut tree, "c");

        tree.replace(right, new).unwrap();
        assert_eq!(tree.children(bin), vec![left, new]);
        assert_eq!(tree.parent(new), Some(bin));
        assert_eq!(tree.parent(right), None);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut tree = Tree::new();
        let (inner, stmts) = block_of(&mut tree, &["a"]);
        let outer = tree.alloc(NodeKind::Block { body: vec![inner] }, Span::DUMMY);
        let expr = tree.children(stmts[0])[0];

        assert_eq!(tree.ancestors(expr).collect::<Vec<_>>(), vec![stmts[0], inner, outer]);
        assert!(tree.is_ancestor_or_self(outer, expr));
        assert!(tree.is_ancestor_or_self(expr, expr));
        assert!(!tree.is_ancestor_or_self(expr, outer));
        assert_eq!(tree.descendants(outer), vec![outer, inner, stmts[0], expr]);
    }

    #[test]
    fn test_functions_post_order() {
        let mut tree = Tree::new();
        let function = |tree: &mut Tree, body: Vec<NodeId>| {
            let body = tree.alloc(NodeKind::Block { body }, Span::DUMMY);
            tree.alloc(
                NodeKind::Function(Function {
                    kind: FunctionKind::Expression,
                    id: None,
                    params: vec![],
                    body,
                    expression_body: false,
                    is_async: false,
                    is_generator: false,
                }),
                Span::DUMMY,
            )
        };
        let inner = function(&mut tree, vec![]);
        let inner_stmt = tree.alloc(NodeKind::ExprStmt { expr: inner }, Span::DUMMY);
        let outer = function(&mut tree, vec![inner_stmt]);
        let sibling = function(&mut tree, vec![]);
        let stmts = [outer, sibling].map(|f| tree.alloc(NodeKind::ExprStmt { expr: f }, Span::DUMMY));
        let root = tree.alloc(
            NodeKind::Program { body: stmts.to_vec(), source_type: SourceType::Module },
            Span::DUMMY,
        );

        assert_eq!(tree.functions_post_order(root), vec![inner, outer, sibling]);
    }
}
