//! JavaScript printer for the arena tree
//!
//! Produces readable output with two-space indentation. Parentheses come
//! only from `Paren` nodes kept from the source, so the printer never has to
//! reason about operator precedence.

use crate::ir::*;
use hoist_types::NodeId;

pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new(&program.tree);
    if let NodeKind::Program { body, .. } = program.tree.kind(program.root) {
        for &stmt in body {
            printer.stmt(stmt);
            printer.out.push('\n');
        }
    }
    printer.out
}

/// Print any node on its own, e.g. a single expression.
pub fn print_node(tree: &Tree, node: NodeId) -> String {
    let mut printer = Printer::new(tree);
    printer.stmt(node);
    printer.out
}

struct Printer<'a> {
    tree: &'a Tree,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            out: String::new(),
            indent: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn comma_list(&mut self, items: &[NodeId]) {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(item);
        }
    }

    fn statements(&mut self, stmts: &[NodeId]) {
        self.indent += 1;
        for &stmt in stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    fn block(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Block { body } if body.is_empty() => self.push("{}"),
            NodeKind::Block { body } => {
                self.push("{");
                self.statements(body);
                self.newline();
                self.push("}");
            }
            _ => self.stmt(id),
        }
    }

    fn is_block(&self, id: NodeId) -> bool {
        matches!(self.tree.kind(id), NodeKind::Block { .. })
    }

    /// The statement following a header like `while (x)`.
    fn body(&mut self, id: NodeId) {
        if self.is_block(id) {
            self.push(" ");
            self.block(id);
        } else {
            self.indent += 1;
            self.newline();
            self.stmt(id);
            self.indent -= 1;
        }
    }

    /// Declaration or expression in a `for` head, without a semicolon.
    fn for_head(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::VarDecl { kind, decls } => {
                self.push(kind.as_str());
                self.push(" ");
                self.comma_list(decls);
            }
            _ => self.expr(id),
        }
    }

    fn stmt(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::VarDecl { .. } => {
                self.for_head(id);
                self.push(";");
            }
            NodeKind::ExprStmt { expr } => {
                self.expr(*expr);
                self.push(";");
            }
            NodeKind::Block { .. } => self.block(id),
            NodeKind::Empty => self.push(";"),
            NodeKind::Debugger => self.push("debugger;"),
            NodeKind::Return { arg } => {
                self.push("return");
                if let Some(arg) = arg {
                    self.push(" ");
                    self.expr(*arg);
                }
                self.push(";");
            }
            NodeKind::If { test, cons, alt } => {
                self.push("if (");
                self.expr(*test);
                self.push(")");
                self.body(*cons);
                if let Some(alt) = alt {
                    if self.is_block(*cons) {
                        self.push(" ");
                    } else {
                        self.newline();
                    }
                    self.push("else");
                    if matches!(self.tree.kind(*alt), NodeKind::If { .. }) {
                        self.push(" ");
                        self.stmt(*alt);
                    } else {
                        self.body(*alt);
                    }
                }
            }
            NodeKind::Switch { discriminant, cases } => {
                self.push("switch (");
                self.expr(*discriminant);
                self.push(") {");
                self.indent += 1;
                for &case in cases {
                    self.newline();
                    if let NodeKind::SwitchCase { test, body } = self.tree.kind(case) {
                        match test {
                            Some(test) => {
                                self.push("case ");
                                self.expr(*test);
                                self.push(":");
                            }
                            None => self.push("default:"),
                        }
                        self.statements(body);
                    }
                }
                self.indent -= 1;
                self.newline();
                self.push("}");
            }
            NodeKind::Throw { arg } => {
                self.push("throw ");
                self.expr(*arg);
                self.push(";");
            }
            NodeKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.push("try ");
                self.block(*block);
                if let Some(handler) = handler {
                    if let NodeKind::CatchClause { param, body } = self.tree.kind(*handler) {
                        self.push(" catch ");
                        if let Some(param) = param {
                            self.push("(");
                            self.expr(*param);
                            self.push(") ");
                        }
                        self.block(*body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.block(*finalizer);
                }
            }
            NodeKind::While { test, body } => {
                self.push("while (");
                self.expr(*test);
                self.push(")");
                self.body(*body);
            }
            NodeKind::DoWhile { body, test } => {
                self.push("do");
                self.body(*body);
                if self.is_block(*body) {
                    self.push(" ");
                } else {
                    self.newline();
                }
                self.push("while (");
                self.expr(*test);
                self.push(");");
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.push("for (");
                if let Some(init) = init {
                    self.for_head(*init);
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(*test);
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(*update);
                }
                self.push(")");
                self.body(*body);
            }
            NodeKind::ForIn { left, right, body } => {
                self.push("for (");
                self.for_head(*left);
                self.push(" in ");
                self.expr(*right);
                self.push(")");
                self.body(*body);
            }
            NodeKind::ForOf {
                left,
                right,
                body,
                is_await,
            } => {
                self.push(if *is_await { "for await (" } else { "for (" });
                self.for_head(*left);
                self.push(" of ");
                self.expr(*right);
                self.push(")");
                self.body(*body);
            }
            NodeKind::Labeled { label, body } => {
                self.push(label);
                self.push(": ");
                self.stmt(*body);
            }
            NodeKind::Break { label } => self.jump("break", label.as_deref()),
            NodeKind::Continue { label } => self.jump("continue", label.as_deref()),
            NodeKind::With { object, body } => {
                self.push("with (");
                self.expr(*object);
                self.push(")");
                self.body(*body);
            }
            NodeKind::Import { specifiers, source } => self.import(specifiers, source),
            NodeKind::ExportDecl { decl } => {
                self.push("export ");
                self.stmt(*decl);
            }
            NodeKind::ExportDefaultDecl { decl } => {
                self.push("export default ");
                self.stmt(*decl);
            }
            NodeKind::ExportDefaultExpr { expr } => {
                self.push("export default ");
                self.expr(*expr);
                self.push(";");
            }
            NodeKind::ExportNamed { specifiers, source } => self.export_named(specifiers, source.as_deref()),
            NodeKind::ExportAll { source } => {
                self.push("export * from ");
                self.push(source);
                self.push(";");
            }
            _ => self.expr(id),
        }
    }

    fn jump(&mut self, keyword: &str, label: Option<&str>) {
        self.push(keyword);
        if let Some(label) = label {
            self.push(" ");
            self.push(label);
        }
        self.push(";");
    }

    fn ident_text(&self, id: NodeId) -> String {
        match self.tree.kind(id) {
            NodeKind::Ident { name } => name.clone(),
            NodeKind::Lit { raw } => raw.clone(),
            _ => String::new(),
        }
    }

    fn import(&mut self, specifiers: &[NodeId], source: &str) {
        self.push("import ");
        let mut parts = Vec::new();
        let mut named = Vec::new();
        for &spec in specifiers {
            if let NodeKind::ImportSpecifier { kind, local } = self.tree.kind(spec) {
                let local = self.ident_text(*local);
                match kind {
                    ImportKind::Default => parts.push(local),
                    ImportKind::Namespace => parts.push(format!("* as {}", local)),
                    ImportKind::Named(imported) if *imported == local => named.push(local),
                    ImportKind::Named(imported) => named.push(format!("{} as {}", imported, local)),
                }
            }
        }
        if !named.is_empty() {
            parts.push(format!("{{ {} }}", named.join(", ")));
        }
        if !parts.is_empty() {
            self.push(&parts.join(", "));
            self.push(" from ");
        }
        self.push(source);
        self.push(";");
    }

    fn export_named(&mut self, specifiers: &[ExportSpec], source: Option<&str>) {
        self.push("export ");
        let mut parts = Vec::new();
        let mut named = Vec::new();
        for spec in specifiers {
            match spec {
                ExportSpec::Default(name) => parts.push(name.clone()),
                ExportSpec::Namespace(name) => parts.push(format!("* as {}", name)),
                ExportSpec::Named { orig, exported } => {
                    let orig = self.ident_text(*orig);
                    if orig == *exported {
                        named.push(orig);
                    } else {
                        named.push(format!("{} as {}", orig, exported));
                    }
                }
            }
        }
        if named.is_empty() {
            if parts.is_empty() {
                parts.push("{}".to_string());
            }
        } else {
            parts.push(format!("{{ {} }}", named.join(", ")));
        }
        self.push(&parts.join(", "));
        if let Some(source) = source {
            self.push(" from ");
            self.push(source);
        }
        self.push(";");
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) | PropKey::Str(name) | PropKey::Num(name) => self.push(name),
            PropKey::Private(name) => {
                self.push("#");
                self.push(name);
            }
            PropKey::Computed(expr) => {
                self.push("[");
                self.expr(*expr);
                self.push("]");
            }
        }
    }

    fn params(&mut self, params: &[NodeId]) {
        self.push("(");
        self.comma_list(params);
        self.push(")");
    }

    /// A method-style function: `static async *key(params) { ... }`.
    fn method(&mut self, key: &PropKey, function: NodeId, is_static: bool) {
        let Some(f) = self.tree.as_function(function) else {
            return;
        };
        if is_static {
            self.push("static ");
        }
        if f.is_async {
            self.push("async ");
        }
        match f.kind {
            FunctionKind::Getter => self.push("get "),
            FunctionKind::Setter => self.push("set "),
            _ => {}
        }
        if f.is_generator {
            self.push("*");
        }
        self.prop_key(key);
        self.params(&f.params);
        self.push(" ");
        self.block(f.body);
    }

    fn function(&mut self, f: &Function) {
        if f.is_async {
            self.push("async ");
        }
        if f.kind == FunctionKind::Arrow {
            self.params(&f.params);
            self.push(" => ");
            if f.expression_body {
                self.expr(f.body);
            } else {
                self.block(f.body);
            }
            return;
        }

        self.push("function");
        if f.is_generator {
            self.push("*");
        }
        match f.id {
            Some(id) => {
                self.push(" ");
                self.expr(id);
            }
            None => self.push(" "),
        }
        self.params(&f.params);
        self.push(" ");
        self.block(f.body);
    }

    fn class(&mut self, class: &Class) {
        self.push("class");
        if let Some(id) = class.id {
            self.push(" ");
            self.expr(id);
        }
        if let Some(super_class) = class.super_class {
            self.push(" extends ");
            self.expr(super_class);
        }
        if class.members.is_empty() {
            self.push(" {}");
            return;
        }
        self.push(" {");
        self.indent += 1;
        for &member in &class.members {
            self.newline();
            match self.tree.kind(member) {
                NodeKind::ClassMethod {
                    key,
                    function,
                    is_static,
                } => self.method(key, *function, *is_static),
                NodeKind::ClassProp { key, value, is_static } => {
                    if *is_static {
                        self.push("static ");
                    }
                    self.prop_key(key);
                    if let Some(value) = value {
                        self.push(" = ");
                        self.expr(*value);
                    }
                    self.push(";");
                }
                NodeKind::StaticBlock { body } => {
                    self.push("static ");
                    self.block(*body);
                }
                _ => self.expr(member),
            }
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    /// `{ a, b: c }` when `value` is the shorthand form of `key`.
    fn is_shorthand(&self, key: &PropKey, value: NodeId) -> bool {
        let PropKey::Ident(key) = key else {
            return false;
        };
        let target = match self.tree.kind(value) {
            NodeKind::AssignPat { left, .. } => *left,
            _ => value,
        };
        self.tree.ident_name(target) == Some(key.as_str())
    }

    fn property(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Property { key, value, shorthand } => {
                if *shorthand && self.is_shorthand(key, *value) {
                    self.expr(*value);
                } else {
                    self.prop_key(key);
                    self.push(": ");
                    self.expr(*value);
                }
            }
            NodeKind::ObjectMethod { key, function } => self.method(key, *function, false),
            _ => self.expr(id),
        }
    }

    fn elements(&mut self, elems: &[Option<NodeId>]) {
        self.push("[");
        for (i, elem) in elems.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if let Some(elem) = elem {
                self.expr(*elem);
            }
        }
        if matches!(elems.last(), Some(None)) {
            self.push(",");
        }
        self.push("]");
    }

    fn expr(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Function(f) => self.function(f),
            NodeKind::Class(class) => self.class(class),
            NodeKind::VarDeclarator { name, init } => {
                self.expr(*name);
                if let Some(init) = init {
                    self.push(" = ");
                    self.expr(*init);
                }
            }
            NodeKind::Ident { name } => self.push(name),
            NodeKind::This => self.push("this"),
            NodeKind::Super => self.push("super"),
            NodeKind::Lit { raw } => self.push(raw),
            NodeKind::Template { quasis, exprs } => {
                self.push("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.push(quasi);
                    if let Some(expr) = exprs.get(i) {
                        self.push("${");
                        self.expr(*expr);
                        self.push("}");
                    }
                }
                self.push("`");
            }
            NodeKind::TaggedTemplate { tag, template } => {
                self.expr(*tag);
                self.expr(*template);
            }
            NodeKind::Array { elems } | NodeKind::ArrayPat { elems } => self.elements(elems),
            NodeKind::Object { props } => {
                if props.is_empty() {
                    self.push("{}");
                    return;
                }
                self.push("{");
                self.indent += 1;
                for (i, &prop) in props.iter().enumerate() {
                    self.newline();
                    self.property(prop);
                    if i + 1 < props.len() {
                        self.push(",");
                    }
                }
                self.indent -= 1;
                self.newline();
                self.push("}");
            }
            NodeKind::ObjectPat { props } => {
                if props.is_empty() {
                    self.push("{}");
                    return;
                }
                self.push("{ ");
                for (i, &prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.property(prop);
                }
                self.push(" }");
            }
            NodeKind::Property { .. } | NodeKind::ObjectMethod { .. } => self.property(id),
            NodeKind::Spread { arg } | NodeKind::Rest { arg } => {
                self.push("...");
                self.expr(*arg);
            }
            NodeKind::Unary { op, arg } => {
                self.push(op);
                let needs_space = op.chars().all(|c| c.is_ascii_alphabetic())
                    || matches!(
                        self.tree.kind(*arg),
                        NodeKind::Unary { op: inner, .. }
                            | NodeKind::Update { op: inner, prefix: true, .. }
                            if inner.starts_with(*op)
                    );
                if needs_space {
                    self.push(" ");
                }
                self.expr(*arg);
            }
            NodeKind::Update { op, prefix, arg } => {
                if *prefix {
                    self.push(op);
                    self.expr(*arg);
                } else {
                    self.expr(*arg);
                    self.push(op);
                }
            }
            NodeKind::Binary { op, left, right } | NodeKind::Assign { op, target: left, value: right } => {
                self.expr(*left);
                self.push(" ");
                self.push(op);
                self.push(" ");
                self.expr(*right);
            }
            NodeKind::AssignPat { left, right } => {
                self.expr(*left);
                self.push(" = ");
                self.expr(*right);
            }
            NodeKind::Member {
                object,
                prop,
                optional,
            } => {
                self.expr(*object);
                match prop {
                    MemberProp::Ident(name) => {
                        self.push(if *optional { "?." } else { "." });
                        self.push(name);
                    }
                    MemberProp::Private(name) => {
                        self.push(if *optional { "?.#" } else { ".#" });
                        self.push(name);
                    }
                    MemberProp::Computed(expr) => {
                        self.push(if *optional { "?.[" } else { "[" });
                        self.expr(*expr);
                        self.push("]");
                    }
                }
            }
            NodeKind::Call { callee, args, optional } => {
                self.expr(*callee);
                if *optional {
                    self.push("?.");
                }
                self.params(args);
            }
            NodeKind::New { callee, args } => {
                self.push("new ");
                self.expr(*callee);
                if let Some(args) = args {
                    self.params(args);
                }
            }
            NodeKind::Seq { exprs } => self.comma_list(exprs),
            NodeKind::Cond { test, cons, alt } => {
                self.expr(*test);
                self.push(" ? ");
                self.expr(*cons);
                self.push(" : ");
                self.expr(*alt);
            }
            NodeKind::Paren { expr } => {
                self.push("(");
                self.expr(*expr);
                self.push(")");
            }
            NodeKind::Yield { arg, delegate } => {
                self.push(if *delegate { "yield*" } else { "yield" });
                if let Some(arg) = arg {
                    self.push(" ");
                    self.expr(*arg);
                }
            }
            NodeKind::Await { arg } => {
                self.push("await ");
                self.expr(*arg);
            }
            NodeKind::MetaProp(MetaPropKind::NewTarget) => self.push("new.target"),
            NodeKind::MetaProp(MetaPropKind::ImportMeta) => self.push("import.meta"),
            NodeKind::ImportCallee => self.push("import"),
            NodeKind::PrivateName { name } => {
                self.push("#");
                self.push(name);
            }
            NodeKind::ClassMethod {
                key,
                function,
                is_static,
            } => self.method(key, *function, *is_static),
            // Statements in expression position only occur through `print_node`
            kind if is_statement(kind) => self.stmt(id),
            _ => {}
        }
    }
}

fn is_statement(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::VarDecl { .. }
            | NodeKind::ExprStmt { .. }
            | NodeKind::Block { .. }
            | NodeKind::Empty
            | NodeKind::Debugger
            | NodeKind::Return { .. }
            | NodeKind::If { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Throw { .. }
            | NodeKind::Try { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::For { .. }
            | NodeKind::ForIn { .. }
            | NodeKind::ForOf { .. }
            | NodeKind::Labeled { .. }
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::With { .. }
            | NodeKind::Import { .. }
            | NodeKind::ExportDecl { .. }
            | NodeKind::ExportDefaultDecl { .. }
            | NodeKind::ExportDefaultExpr { .. }
            | NodeKind::ExportNamed { .. }
            | NodeKind::ExportAll { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_program;
    use hoist_parser::parse_javascript;
    use hoist_types::SourceType;

    fn round_trip(source: &str) -> String {
        let parsed = parse_javascript(source, "test.js", Some(SourceType::Module)).unwrap();
        let program = lower_program(&parsed.program, source, parsed.start_pos, parsed.file_id).unwrap();
        print_program(&program)
    }

    #[test]
    fn test_function_declaration() {
        let source = "function outer(a, b = 1) {\n  function inner() {\n    return a + b;\n  }\n  return inner;\n}\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_control_flow() {
        let source = "for (let i = 0; i < 3; i++) {\n  if (i) continue;\n  else {\n    break;\n  }\n}\n";
        let expected = "for (let i = 0; i < 3; i++) {\n  if (i)\n    continue;\n  else {\n    break;\n  }\n}\n";
        assert_eq!(round_trip(source), expected);
    }

    #[test]
    fn test_expressions_keep_parens() {
        let source = "const x = (a + b) * c, y = !(a && b), z = (function () {})();\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_arrows_and_objects() {
        let source = "const f = async x => ({ x });\nconst o = { a: 1, get b() { return 2; }, [k]: 3, ...rest };\n";
        let expected = "const f = async (x) => ({\n  x\n});\nconst o = {\n  a: 1,\n  get b() {\n    return 2;\n  },\n  [k]: 3,\n  ...rest\n};\n";
        assert_eq!(round_trip(source), expected);
    }

    #[test]
    fn test_modules() {
        let source = "import a, { b as c, d } from \"m\";\nexport { c as e, d };\nexport * from './x';\nexport default function () {}\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_classes() {
        let source = "class A extends B {\n  static x = 1;\n  #y;\n  constructor() {\n    super();\n  }\n  get z() {\n    return this.#y;\n  }\n  static {}\n}\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_unary_spacing() {
        assert_eq!(round_trip("x = - -y;\ntypeof x;\n"), "x = - -y;\ntypeof x;\n");
    }

    #[test]
    fn test_patterns_and_templates() {
        let source = "const { a, b: [c, , d], e = 1, ...f } = g;\nconst t = `x${a}y${b}`;\n";
        assert_eq!(round_trip(source), source);
    }
}
