//! Risk marking
//!
//! One top-down sweep over the tree finds the constructs that pin a closure
//! to its activation and propagates a mark upward from each:
//! - `this`, `super`, `arguments` and `new.target` mark every arrow function
//!   between the use and the function that supplies the value.
//! - A direct `eval` call or a `with` statement marks every enclosing
//!   scope-owning node, functions included. Functions inside a `with` body
//!   are marked too, since their free names resolve against the object.
//!
//! The table is keyed by node id and lives for one run of the pass.

use hoist_hir::{MetaPropKind, NodeKind, Tree};
use hoist_types::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskMarks {
    /// Inherits `this` (or `arguments`, `super`, `new.target`) from its surroundings
    pub captures_this: bool,
    /// Contains a direct `eval` call or a `with` statement
    pub uses_eval: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RiskTable {
    marks: HashMap<NodeId, RiskMarks>,
}

impl RiskTable {
    pub fn build(tree: &Tree, root: NodeId) -> Self {
        let mut table = Self::default();
        for node in tree.descendants(root) {
            match tree.kind(node) {
                NodeKind::This | NodeKind::Super | NodeKind::MetaProp(MetaPropKind::NewTarget) => {
                    table.mark_this_capture(tree, node)
                }
                NodeKind::Ident { name } if name == "arguments" => table.mark_this_capture(tree, node),
                NodeKind::Call { callee, .. } if is_direct_eval(tree, *callee) => table.mark_eval(tree, node),
                NodeKind::With { body, .. } => {
                    table.mark_eval(tree, node);
                    for inner in tree.descendants(*body) {
                        if tree.kind(inner).is_function() {
                            table.entry(inner).uses_eval = true;
                        }
                    }
                }
                _ => {}
            }
        }
        log::trace!("risk marks recorded for {} nodes", table.marks.len());
        table
    }

    pub fn marks(&self, node: NodeId) -> RiskMarks {
        self.marks.get(&node).copied().unwrap_or_default()
    }

    pub fn captures_this(&self, node: NodeId) -> bool {
        self.marks(node).captures_this
    }

    pub fn uses_eval(&self, node: NodeId) -> bool {
        self.marks(node).uses_eval
    }

    fn entry(&mut self, node: NodeId) -> &mut RiskMarks {
        self.marks.entry(node).or_default()
    }

    fn mark_this_capture(&mut self, tree: &Tree, node: NodeId) {
        let mut child = node;
        for ancestor in tree.ancestors(node) {
            match tree.kind(ancestor) {
                NodeKind::Function(f) if f.kind.binds_this() => break,
                NodeKind::Function(_) => self.entry(ancestor).captures_this = true,
                // Field initializers see the instance (or the class) as `this`
                NodeKind::ClassProp { value: Some(value), .. } if *value == child => break,
                NodeKind::StaticBlock { .. } => break,
                _ => {}
            }
            child = ancestor;
        }
    }

    fn mark_eval(&mut self, tree: &Tree, node: NodeId) {
        for ancestor in tree.ancestors(node) {
            if tree.node(ancestor).scope.is_some() {
                self.entry(ancestor).uses_eval = true;
            }
        }
    }
}

/// `eval(...)` or `(eval)(...)`
fn is_direct_eval(tree: &Tree, callee: NodeId) -> bool {
    let mut callee = callee;
    while let NodeKind::Paren { expr } = tree.kind(callee) {
        callee = *expr;
    }
    tree.ident_name(callee) == Some("eval")
}
