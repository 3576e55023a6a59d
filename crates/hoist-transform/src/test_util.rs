use hoist_hir::{lower_program, NodeKind, Program};
use hoist_parser::parse_javascript;
use hoist_types::{NodeId, SourceType};

pub fn lower_as(source: &str, source_type: SourceType) -> Program {
    let parsed = parse_javascript(source, "test.js", Some(source_type)).unwrap();
    lower_program(&parsed.program, source, parsed.start_pos, parsed.file_id).unwrap()
}

pub fn lower(source: &str) -> Program {
    lower_as(source, SourceType::Module)
}

/// The function declared or bound (`const name = ...`) under `name`.
pub fn closure(program: &Program, name: &str) -> NodeId {
    let tree = &program.tree;
    tree.descendants(program.root)
        .into_iter()
        .find_map(|id| match tree.kind(id) {
            NodeKind::Function(f) if f.id.and_then(|i| tree.ident_name(i)) == Some(name) => Some(id),
            NodeKind::VarDeclarator { name: binding, init: Some(init) }
                if tree.ident_name(*binding) == Some(name) && tree.kind(*init).is_function() =>
            {
                Some(*init)
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no closure named {}", name))
}
