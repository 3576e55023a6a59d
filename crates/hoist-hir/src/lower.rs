//! AST to arena lowering
//!
//! Converts an SWC `Program` into the arena [`Tree`] and builds the scope
//! model while walking. Declarations are bound as they are met; identifier
//! uses are queued and resolved once the whole program has been seen, so
//! uses of hoisted `var`s and function declarations find their binding.

use crate::ir::*;
use crate::scope::ScopeTree;
use anyhow::{anyhow, bail, Result};
use hoist_diagnostics::{FileId, Span};
use hoist_types::{BindingKind, NodeId, ScopeId, ScopeKind, SourceType};
use swc_common::Spanned;
use swc_ecma_ast as ast;

/// How identifiers inside a pattern are treated
#[derive(Debug, Clone, Copy)]
enum PatMode {
    /// Binding pattern of a declaration, parameter or catch clause
    Declare { kind: BindingKind, scope: ScopeId },
    /// Assignment target: identifiers are mutation sites
    Assign,
}

struct PendingRef {
    ident: NodeId,
    scope: ScopeId,
    mutation: bool,
}

/// Context for lowering, tracking the current scope and unresolved uses
struct LoweringContext<'a> {
    tree: Tree,
    scopes: ScopeTree,
    source: &'a str,
    /// SWC position of the first byte of `source`
    base: u32,
    file_id: FileId,
    root: NodeId,
    current: ScopeId,
    pending: Vec<PendingRef>,
}

impl<'a> LoweringContext<'a> {
    fn new(source: &'a str, base: u32, file_id: FileId, program_span: swc_common::Span) -> Self {
        let mut ctx = Self {
            tree: Tree::new(),
            scopes: ScopeTree::new(),
            source,
            base,
            file_id,
            root: NodeId(0),
            current: ScopeId(0),
            pending: Vec::new(),
        };
        let span = ctx.span(program_span);
        ctx.root = ctx.tree.reserve(span);
        ctx.current = ctx.scopes.add_scope(ScopeKind::Program, ctx.root, None);
        ctx.tree.node_mut(ctx.root).scope = Some(ctx.current);
        ctx
    }

    fn span(&self, span: swc_common::Span) -> Span {
        Span::new(
            self.file_id,
            span.lo.0.saturating_sub(self.base),
            span.hi.0.saturating_sub(self.base),
        )
    }

    /// Source text covered by an SWC span
    fn raw(&self, span: swc_common::Span) -> Result<String> {
        let s = self.span(span);
        self.source
            .get(s.start as usize..s.end as usize)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("span {}..{} is outside the source text", s.start, s.end))
    }

    fn alloc(&mut self, kind: NodeKind, span: swc_common::Span) -> NodeId {
        let span = self.span(span);
        self.tree.alloc(kind, span)
    }

    fn reserve(&mut self, span: swc_common::Span) -> NodeId {
        let span = self.span(span);
        self.tree.reserve(span)
    }

    /// Open a scope owned by `node`, returning the scope to restore afterwards.
    fn enter_scope(&mut self, kind: ScopeKind, node: NodeId) -> ScopeId {
        let outer = self.current;
        let scope = self.scopes.add_scope(kind, node, Some(outer));
        self.tree.node_mut(node).scope = Some(scope);
        self.current = scope;
        outer
    }

    fn leave_scope(&mut self, outer: ScopeId) {
        self.current = outer;
    }

    /// Nearest function or program scope, where `var` binds.
    fn var_scope(&self) -> ScopeId {
        self.scopes.var_scope(self.current)
    }

    /// Mark the current scope strict when `stmts` open with a `"use strict"` directive.
    fn apply_directives(&mut self, stmts: &[ast::Stmt]) {
        for stmt in stmts {
            let ast::Stmt::Expr(expr_stmt) = stmt else {
                return;
            };
            let ast::Expr::Lit(ast::Lit::Str(directive)) = &*expr_stmt.expr else {
                return;
            };
            // The raw text decides: an escaped "use strict" is not a directive
            if let Ok(raw) = self.raw(directive.span) {
                if raw == "'use strict'" || raw == "\"use strict\"" {
                    self.scopes.mark_strict(self.current);
                    return;
                }
            }
        }
    }

    fn declare(&mut self, ident: &ast::Ident, kind: BindingKind, scope: ScopeId) -> NodeId {
        let name = ident.sym.to_string();
        let node = self.alloc(NodeKind::Ident { name: name.clone() }, ident.span);
        self.scopes.declare(scope, &name, kind, Some(node));
        node
    }

    fn reference(&mut self, ident: &ast::Ident, mutation: bool) -> NodeId {
        let node = self.alloc(
            NodeKind::Ident {
                name: ident.sym.to_string(),
            },
            ident.span,
        );
        self.pending.push(PendingRef {
            ident: node,
            scope: self.current,
            mutation,
        });
        node
    }

    fn bind_ident(&mut self, ident: &ast::Ident, mode: PatMode) -> NodeId {
        match mode {
            PatMode::Declare { kind, scope } => self.declare(ident, kind, scope),
            PatMode::Assign => self.reference(ident, true),
        }
    }

    fn resolve_references(&mut self) {
        for PendingRef { ident, scope, mutation } in std::mem::take(&mut self.pending) {
            let Some(name) = self.tree.ident_name(ident).map(str::to_string) else {
                continue;
            };
            match self.scopes.lookup(scope, &name) {
                Some(binding) => {
                    let binding = self.scopes.binding_mut(binding);
                    if mutation {
                        binding.mutations.push(ident);
                    } else {
                        binding.references.push(ident);
                    }
                }
                None => self.scopes.note_global(&name),
            }
        }
    }
}

/// Lower a parsed program.
///
/// `base` is the SWC byte position of the start of `source` (see
/// `hoist_parser::ParseResult::start_pos`).
pub fn lower_program(
    program: &ast::Program,
    source: &str,
    base: u32,
    file_id: FileId,
) -> Result<Program> {
    let mut ctx = LoweringContext::new(source, base, file_id, program.span());

    let (body, source_type) = match program {
        ast::Program::Module(module) => {
            let root = ctx.scopes.root();
            ctx.scopes.mark_strict(root);
            let mut body = Vec::with_capacity(module.body.len());
            for item in &module.body {
                body.push(match item {
                    ast::ModuleItem::ModuleDecl(decl) => lower_module_decl(&mut ctx, decl)?,
                    ast::ModuleItem::Stmt(stmt) => lower_stmt(&mut ctx, stmt)?,
                });
            }
            (body, SourceType::Module)
        }
        ast::Program::Script(script) => {
            ctx.apply_directives(&script.body);
            (lower_stmts(&mut ctx, &script.body)?, SourceType::Script)
        }
    };

    let root = ctx.root;
    ctx.tree.set_kind(root, NodeKind::Program { body, source_type });
    ctx.resolve_references();

    log::debug!(
        "lowered program: {} nodes, {} scopes",
        ctx.tree.len(),
        ctx.scopes.len()
    );

    Ok(Program {
        tree: ctx.tree,
        scopes: ctx.scopes,
        root,
        source_type,
        file_id,
    })
}

fn lower_stmts(ctx: &mut LoweringContext, stmts: &[ast::Stmt]) -> Result<Vec<NodeId>> {
    stmts.iter().map(|s| lower_stmt(ctx, s)).collect()
}

/// A block that opens its own scope.
fn lower_block_scoped(ctx: &mut LoweringContext, block: &ast::BlockStmt) -> Result<NodeId> {
    let node = ctx.reserve(block.span);
    let outer = ctx.enter_scope(ScopeKind::Block, node);
    let body = lower_stmts(ctx, &block.stmts)?;
    ctx.leave_scope(outer);
    ctx.tree.set_kind(node, NodeKind::Block { body });
    Ok(node)
}

/// A function or catch body, which shares the scope already open.
fn lower_block_body(ctx: &mut LoweringContext, block: &ast::BlockStmt) -> Result<NodeId> {
    let body = lower_stmts(ctx, &block.stmts)?;
    Ok(ctx.alloc(NodeKind::Block { body }, block.span))
}

fn lower_stmt(ctx: &mut LoweringContext, stmt: &ast::Stmt) -> Result<NodeId> {
    let node = match stmt {
        ast::Stmt::Block(block) => lower_block_scoped(ctx, block)?,
        ast::Stmt::Empty(e) => ctx.alloc(NodeKind::Empty, e.span),
        ast::Stmt::Debugger(d) => ctx.alloc(NodeKind::Debugger, d.span),
        ast::Stmt::With(with) => {
            let object = lower_expr(ctx, &with.obj)?;
            let body = lower_stmt(ctx, &with.body)?;
            ctx.alloc(NodeKind::With { object, body }, with.span)
        }
        ast::Stmt::Return(ret) => {
            let arg = ret.arg.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            ctx.alloc(NodeKind::Return { arg }, ret.span)
        }
        ast::Stmt::Labeled(labeled) => {
            let body = lower_stmt(ctx, &labeled.body)?;
            let label = labeled.label.sym.to_string();
            ctx.alloc(NodeKind::Labeled { label, body }, labeled.span)
        }
        ast::Stmt::Break(b) => {
            let label = b.label.as_ref().map(|l| l.sym.to_string());
            ctx.alloc(NodeKind::Break { label }, b.span)
        }
        ast::Stmt::Continue(c) => {
            let label = c.label.as_ref().map(|l| l.sym.to_string());
            ctx.alloc(NodeKind::Continue { label }, c.span)
        }
        ast::Stmt::If(if_stmt) => {
            let test = lower_expr(ctx, &if_stmt.test)?;
            let cons = lower_stmt(ctx, &if_stmt.cons)?;
            let alt = if_stmt.alt.as_deref().map(|s| lower_stmt(ctx, s)).transpose()?;
            ctx.alloc(NodeKind::If { test, cons, alt }, if_stmt.span)
        }
        ast::Stmt::Switch(switch) => {
            let discriminant = lower_expr(ctx, &switch.discriminant)?;
            let node = ctx.reserve(switch.span);
            let outer = ctx.enter_scope(ScopeKind::Switch, node);
            let mut cases = Vec::with_capacity(switch.cases.len());
            for case in &switch.cases {
                let test = case.test.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
                let body = lower_stmts(ctx, &case.cons)?;
                cases.push(ctx.alloc(NodeKind::SwitchCase { test, body }, case.span));
            }
            ctx.leave_scope(outer);
            ctx.tree.set_kind(node, NodeKind::Switch { discriminant, cases });
            node
        }
        ast::Stmt::Throw(throw) => {
            let arg = lower_expr(ctx, &throw.arg)?;
            ctx.alloc(NodeKind::Throw { arg }, throw.span)
        }
        ast::Stmt::Try(try_stmt) => {
            let block = lower_block_scoped(ctx, &try_stmt.block)?;
            let handler = try_stmt
                .handler
                .as_ref()
                .map(|h| lower_catch(ctx, h))
                .transpose()?;
            let finalizer = try_stmt
                .finalizer
                .as_ref()
                .map(|f| lower_block_scoped(ctx, f))
                .transpose()?;
            ctx.alloc(NodeKind::Try { block, handler, finalizer }, try_stmt.span)
        }
        ast::Stmt::While(w) => {
            let test = lower_expr(ctx, &w.test)?;
            let body = lower_stmt(ctx, &w.body)?;
            ctx.alloc(NodeKind::While { test, body }, w.span)
        }
        ast::Stmt::DoWhile(d) => {
            let body = lower_stmt(ctx, &d.body)?;
            let test = lower_expr(ctx, &d.test)?;
            ctx.alloc(NodeKind::DoWhile { body, test }, d.span)
        }
        ast::Stmt::For(for_stmt) => {
            let node = ctx.reserve(for_stmt.span);
            let outer = ctx.enter_scope(ScopeKind::Loop, node);
            let init = match &for_stmt.init {
                Some(ast::VarDeclOrExpr::VarDecl(decl)) => Some(lower_var_decl(ctx, decl)?),
                Some(ast::VarDeclOrExpr::Expr(expr)) => Some(lower_expr(ctx, expr)?),
                None => None,
            };
            let test = for_stmt.test.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            let update = for_stmt.update.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            let body = lower_stmt(ctx, &for_stmt.body)?;
            ctx.leave_scope(outer);
            ctx.tree.set_kind(node, NodeKind::For { init, test, update, body });
            node
        }
        ast::Stmt::ForIn(for_in) => {
            let node = ctx.reserve(for_in.span);
            let outer = ctx.enter_scope(ScopeKind::Loop, node);
            let left = lower_for_head(ctx, &for_in.left)?;
            let right = lower_expr(ctx, &for_in.right)?;
            let body = lower_stmt(ctx, &for_in.body)?;
            ctx.leave_scope(outer);
            ctx.tree.set_kind(node, NodeKind::ForIn { left, right, body });
            node
        }
        ast::Stmt::ForOf(for_of) => {
            let node = ctx.reserve(for_of.span);
            let outer = ctx.enter_scope(ScopeKind::Loop, node);
            let left = lower_for_head(ctx, &for_of.left)?;
            let right = lower_expr(ctx, &for_of.right)?;
            let body = lower_stmt(ctx, &for_of.body)?;
            ctx.leave_scope(outer);
            ctx.tree.set_kind(
                node,
                NodeKind::ForOf {
                    left,
                    right,
                    body,
                    is_await: for_of.is_await,
                },
            );
            node
        }
        ast::Stmt::Decl(decl) => lower_decl(ctx, decl)?,
        ast::Stmt::Expr(expr_stmt) => {
            let expr = lower_expr(ctx, &expr_stmt.expr)?;
            ctx.alloc(NodeKind::ExprStmt { expr }, expr_stmt.span)
        }
    };
    Ok(node)
}

fn lower_catch(ctx: &mut LoweringContext, clause: &ast::CatchClause) -> Result<NodeId> {
    let node = ctx.reserve(clause.span);
    let outer = ctx.enter_scope(ScopeKind::Catch, node);
    let scope = ctx.current;
    let param = clause
        .param
        .as_ref()
        .map(|p| {
            lower_pat(
                ctx,
                p,
                PatMode::Declare {
                    kind: BindingKind::CatchParam,
                    scope,
                },
            )
        })
        .transpose()?;
    let body = lower_block_body(ctx, &clause.body)?;
    ctx.leave_scope(outer);
    ctx.tree.set_kind(node, NodeKind::CatchClause { param, body });
    Ok(node)
}

fn lower_for_head(ctx: &mut LoweringContext, head: &ast::ForHead) -> Result<NodeId> {
    match head {
        ast::ForHead::VarDecl(decl) => lower_var_decl(ctx, decl),
        ast::ForHead::Pat(pat) => lower_pat(ctx, pat, PatMode::Assign),
        ast::ForHead::UsingDecl(_) => bail!("unsupported syntax: `using` declaration"),
    }
}

fn lower_decl(ctx: &mut LoweringContext, decl: &ast::Decl) -> Result<NodeId> {
    match decl {
        ast::Decl::Fn(fn_decl) => {
            if fn_decl.declare {
                bail!("unsupported syntax: ambient function declaration");
            }
            lower_function(ctx, FunctionKind::Declaration, Some(&fn_decl.ident), &fn_decl.function)
        }
        ast::Decl::Class(class_decl) => lower_class(ctx, Some(&class_decl.ident), &class_decl.class, true),
        ast::Decl::Var(var_decl) => lower_var_decl(ctx, var_decl),
        ast::Decl::Using(_) => bail!("unsupported syntax: `using` declaration"),
        _ => bail!("unsupported syntax: TypeScript declaration"),
    }
}

fn lower_var_decl(ctx: &mut LoweringContext, decl: &ast::VarDecl) -> Result<NodeId> {
    let (kind, binding_kind, scope) = match decl.kind {
        ast::VarDeclKind::Var => (VarKind::Var, BindingKind::Var, ctx.var_scope()),
        ast::VarDeclKind::Let => (VarKind::Let, BindingKind::Let, ctx.current),
        ast::VarDeclKind::Const => (VarKind::Const, BindingKind::Const, ctx.current),
    };

    let mut decls = Vec::with_capacity(decl.decls.len());
    for declarator in &decl.decls {
        let name = lower_pat(
            ctx,
            &declarator.name,
            PatMode::Declare {
                kind: binding_kind,
                scope,
            },
        )?;
        let init = declarator.init.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
        decls.push(ctx.alloc(NodeKind::VarDeclarator { name, init }, declarator.span));
    }
    Ok(ctx.alloc(NodeKind::VarDecl { kind, decls }, decl.span))
}

fn lower_module_decl(ctx: &mut LoweringContext, decl: &ast::ModuleDecl) -> Result<NodeId> {
    let node = match decl {
        ast::ModuleDecl::Import(import) => {
            if import.type_only {
                bail!("unsupported syntax: type-only import");
            }
            if import.with.is_some() {
                bail!("unsupported syntax: import attributes");
            }
            let root = ctx.scopes.root();
            let mut specifiers = Vec::with_capacity(import.specifiers.len());
            for spec in &import.specifiers {
                let (kind, local, span) = match spec {
                    ast::ImportSpecifier::Named(named) => {
                        let imported = match &named.imported {
                            Some(name) => module_export_name(ctx, name)?,
                            None => named.local.sym.to_string(),
                        };
                        (ImportKind::Named(imported), &named.local, named.span)
                    }
                    ast::ImportSpecifier::Default(default) => {
                        (ImportKind::Default, &default.local, default.span)
                    }
                    ast::ImportSpecifier::Namespace(ns) => (ImportKind::Namespace, &ns.local, ns.span),
                };
                let local = ctx.declare(local, BindingKind::Import, root);
                specifiers.push(ctx.alloc(NodeKind::ImportSpecifier { kind, local }, span));
            }
            let source = ctx.raw(import.src.span)?;
            ctx.alloc(NodeKind::Import { specifiers, source }, import.span)
        }
        ast::ModuleDecl::ExportDecl(export) => {
            let decl = lower_decl(ctx, &export.decl)?;
            ctx.alloc(NodeKind::ExportDecl { decl }, export.span)
        }
        ast::ModuleDecl::ExportNamed(export) => {
            if export.type_only {
                bail!("unsupported syntax: type-only export");
            }
            let reexport = export.src.is_some();
            let mut specifiers = Vec::with_capacity(export.specifiers.len());
            for spec in &export.specifiers {
                specifiers.push(match spec {
                    ast::ExportSpecifier::Named(named) => {
                        let orig = match &named.orig {
                            // Local exports read the binding; re-exports name the other module's export
                            ast::ModuleExportName::Ident(ident) if !reexport => ctx.reference(ident, false),
                            ast::ModuleExportName::Ident(ident) => ctx.alloc(
                                NodeKind::Ident {
                                    name: ident.sym.to_string(),
                                },
                                ident.span,
                            ),
                            ast::ModuleExportName::Str(s) => {
                                let raw = ctx.raw(s.span)?;
                                ctx.alloc(NodeKind::Lit { raw }, s.span)
                            }
                        };
                        let exported =
                            module_export_name(ctx, named.exported.as_ref().unwrap_or(&named.orig))?;
                        ExportSpec::Named { orig, exported }
                    }
                    ast::ExportSpecifier::Namespace(ns) => ExportSpec::Namespace(module_export_name(ctx, &ns.name)?),
                    ast::ExportSpecifier::Default(default) => {
                        ExportSpec::Default(default.exported.sym.to_string())
                    }
                });
            }
            let source = export.src.as_ref().map(|s| ctx.raw(s.span)).transpose()?;
            ctx.alloc(NodeKind::ExportNamed { specifiers, source }, export.span)
        }
        ast::ModuleDecl::ExportDefaultDecl(export) => {
            let decl = match &export.decl {
                ast::DefaultDecl::Fn(fn_expr) => {
                    let kind = if fn_expr.ident.is_some() {
                        FunctionKind::Declaration
                    } else {
                        FunctionKind::Expression
                    };
                    lower_function(ctx, kind, fn_expr.ident.as_ref(), &fn_expr.function)?
                }
                ast::DefaultDecl::Class(class_expr) => {
                    lower_class(ctx, class_expr.ident.as_ref(), &class_expr.class, true)?
                }
                ast::DefaultDecl::TsInterfaceDecl(_) => bail!("unsupported syntax: TypeScript interface"),
            };
            ctx.alloc(NodeKind::ExportDefaultDecl { decl }, export.span)
        }
        ast::ModuleDecl::ExportDefaultExpr(export) => {
            let expr = lower_expr(ctx, &export.expr)?;
            ctx.alloc(NodeKind::ExportDefaultExpr { expr }, export.span)
        }
        ast::ModuleDecl::ExportAll(export) => {
            if export.type_only {
                bail!("unsupported syntax: type-only export");
            }
            let source = ctx.raw(export.src.span)?;
            ctx.alloc(NodeKind::ExportAll { source }, export.span)
        }
        _ => bail!("unsupported syntax: TypeScript module declaration"),
    };
    Ok(node)
}

fn module_export_name(ctx: &LoweringContext, name: &ast::ModuleExportName) -> Result<String> {
    match name {
        ast::ModuleExportName::Ident(ident) => Ok(ident.sym.to_string()),
        ast::ModuleExportName::Str(s) => ctx.raw(s.span),
    }
}

enum FnBody<'a> {
    Block(&'a ast::BlockStmt),
    Expr(&'a ast::Expr),
}

/// Everything needed to lower any form of function literal
struct FunctionParts<'a> {
    kind: FunctionKind,
    name: Option<&'a ast::Ident>,
    params: Vec<&'a ast::Pat>,
    body: FnBody<'a>,
    is_async: bool,
    is_generator: bool,
    span: swc_common::Span,
}

fn lower_function(
    ctx: &mut LoweringContext,
    kind: FunctionKind,
    name: Option<&ast::Ident>,
    function: &ast::Function,
) -> Result<NodeId> {
    if !function.decorators.is_empty() {
        bail!("unsupported syntax: decorators");
    }
    let body = function
        .body
        .as_ref()
        .ok_or_else(|| anyhow!("unsupported syntax: function without a body"))?;
    lower_function_parts(
        ctx,
        FunctionParts {
            kind,
            name,
            params: function.params.iter().map(|p| &p.pat).collect(),
            body: FnBody::Block(body),
            is_async: function.is_async,
            is_generator: function.is_generator,
            span: function.span,
        },
    )
}

fn lower_function_parts(ctx: &mut LoweringContext, parts: FunctionParts) -> Result<NodeId> {
    // A declaration's name belongs to the enclosing scope
    let mut id = match (parts.kind, parts.name) {
        (FunctionKind::Declaration, Some(name)) => {
            let scope = ctx.current;
            let ident = ctx.declare(name, BindingKind::Function, scope);
            // Sloppy-mode block functions are also var-bound in the enclosing function
            let block_level = !matches!(ctx.scopes.scope(scope).kind, ScopeKind::Function | ScopeKind::Program);
            if block_level && !ctx.scopes.is_strict(scope) {
                let var_scope = ctx.var_scope();
                ctx.scopes.declare(var_scope, &name.sym.to_string(), BindingKind::Var, Some(ident));
            }
            Some(ident)
        }
        _ => None,
    };

    let node = ctx.reserve(parts.span);
    let outer = ctx.enter_scope(ScopeKind::Function, node);
    let scope = ctx.current;
    if let FnBody::Block(block) = &parts.body {
        ctx.apply_directives(&block.stmts);
    }

    // A named function expression sees its own name
    if let (FunctionKind::Expression, Some(name)) = (parts.kind, parts.name) {
        id = Some(ctx.declare(name, BindingKind::Function, scope));
    }

    let params = parts
        .params
        .into_iter()
        .map(|p| {
            lower_pat(
                ctx,
                p,
                PatMode::Declare {
                    kind: BindingKind::Param,
                    scope,
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let (body, expression_body) = match parts.body {
        FnBody::Block(block) => (lower_block_body(ctx, block)?, false),
        FnBody::Expr(expr) => (lower_expr(ctx, expr)?, true),
    };
    ctx.leave_scope(outer);

    ctx.tree.set_kind(
        node,
        NodeKind::Function(Function {
            kind: parts.kind,
            id,
            params,
            body,
            expression_body,
            is_async: parts.is_async,
            is_generator: parts.is_generator,
        }),
    );
    Ok(node)
}

fn lower_arrow(ctx: &mut LoweringContext, arrow: &ast::ArrowExpr) -> Result<NodeId> {
    let body = match &*arrow.body {
        ast::BlockStmtOrExpr::BlockStmt(block) => FnBody::Block(block),
        ast::BlockStmtOrExpr::Expr(expr) => FnBody::Expr(expr),
    };
    lower_function_parts(
        ctx,
        FunctionParts {
            kind: FunctionKind::Arrow,
            name: None,
            params: arrow.params.iter().collect(),
            body,
            is_async: arrow.is_async,
            is_generator: arrow.is_generator,
            span: arrow.span,
        },
    )
}

fn method_kind(kind: ast::MethodKind) -> FunctionKind {
    match kind {
        ast::MethodKind::Method => FunctionKind::Method,
        ast::MethodKind::Getter => FunctionKind::Getter,
        ast::MethodKind::Setter => FunctionKind::Setter,
    }
}

fn lower_class(
    ctx: &mut LoweringContext,
    name: Option<&ast::Ident>,
    class: &ast::Class,
    is_declaration: bool,
) -> Result<NodeId> {
    if !class.decorators.is_empty() {
        bail!("unsupported syntax: decorators");
    }

    // Declarations bind in the enclosing scope, expressions inside the class scope
    let mut id = None;
    if is_declaration {
        if let Some(name) = name {
            let scope = ctx.current;
            id = Some(ctx.declare(name, BindingKind::Class, scope));
        }
    }
    let node = ctx.reserve(class.span);
    let outer = ctx.enter_scope(ScopeKind::Class, node);
    // The heritage clause and the body are strict code
    let scope = ctx.current;
    ctx.scopes.mark_strict(scope);
    if !is_declaration {
        if let Some(name) = name {
            id = Some(ctx.declare(name, BindingKind::Class, scope));
        }
    }
    let super_class = class.super_class.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;

    let mut members = Vec::with_capacity(class.body.len());
    for member in &class.body {
        if let Some(member) = lower_class_member(ctx, member)? {
            members.push(member);
        }
    }
    ctx.leave_scope(outer);

    ctx.tree.set_kind(
        node,
        NodeKind::Class(Class {
            id,
            super_class,
            members,
            is_declaration,
        }),
    );
    Ok(node)
}

fn lower_class_member(ctx: &mut LoweringContext, member: &ast::ClassMember) -> Result<Option<NodeId>> {
    let node = match member {
        ast::ClassMember::Constructor(ctor) => {
            let mut params = Vec::with_capacity(ctor.params.len());
            for param in &ctor.params {
                match param {
                    ast::ParamOrTsParamProp::Param(p) => params.push(&p.pat),
                    ast::ParamOrTsParamProp::TsParamProp(_) => {
                        bail!("unsupported syntax: TypeScript parameter property")
                    }
                }
            }
            let body = ctor
                .body
                .as_ref()
                .ok_or_else(|| anyhow!("unsupported syntax: constructor without a body"))?;
            let key = lower_prop_name(ctx, &ctor.key)?;
            let function = lower_function_parts(
                ctx,
                FunctionParts {
                    kind: FunctionKind::Constructor,
                    name: None,
                    params,
                    body: FnBody::Block(body),
                    is_async: false,
                    is_generator: false,
                    span: ctor.span,
                },
            )?;
            ctx.alloc(
                NodeKind::ClassMethod {
                    key,
                    function,
                    is_static: false,
                },
                ctor.span,
            )
        }
        ast::ClassMember::Method(method) => {
            let key = lower_prop_name(ctx, &method.key)?;
            let function = lower_function(ctx, method_kind(method.kind), None, &method.function)?;
            ctx.alloc(
                NodeKind::ClassMethod {
                    key,
                    function,
                    is_static: method.is_static,
                },
                method.span,
            )
        }
        ast::ClassMember::PrivateMethod(method) => {
            let key = PropKey::Private(method.key.name.to_string());
            let function = lower_function(ctx, method_kind(method.kind), None, &method.function)?;
            ctx.alloc(
                NodeKind::ClassMethod {
                    key,
                    function,
                    is_static: method.is_static,
                },
                method.span,
            )
        }
        ast::ClassMember::ClassProp(prop) => {
            let key = lower_prop_name(ctx, &prop.key)?;
            let value = prop.value.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            ctx.alloc(
                NodeKind::ClassProp {
                    key,
                    value,
                    is_static: prop.is_static,
                },
                prop.span,
            )
        }
        ast::ClassMember::PrivateProp(prop) => {
            let key = PropKey::Private(prop.key.name.to_string());
            let value = prop.value.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            ctx.alloc(
                NodeKind::ClassProp {
                    key,
                    value,
                    is_static: prop.is_static,
                },
                prop.span,
            )
        }
        ast::ClassMember::StaticBlock(block) => {
            // Static blocks are their own var scope
            let body_node = ctx.reserve(block.body.span);
            let outer = ctx.enter_scope(ScopeKind::Function, body_node);
            let body = lower_stmts(ctx, &block.body.stmts)?;
            ctx.leave_scope(outer);
            ctx.tree.set_kind(body_node, NodeKind::Block { body });
            ctx.alloc(NodeKind::StaticBlock { body: body_node }, block.span)
        }
        ast::ClassMember::Empty(_) => return Ok(None),
        ast::ClassMember::AutoAccessor(_) => bail!("unsupported syntax: auto-accessor"),
        ast::ClassMember::TsIndexSignature(_) => bail!("unsupported syntax: TypeScript index signature"),
    };
    Ok(Some(node))
}

fn lower_prop_name(ctx: &mut LoweringContext, name: &ast::PropName) -> Result<PropKey> {
    Ok(match name {
        ast::PropName::Ident(ident) => PropKey::Ident(ident.sym.to_string()),
        ast::PropName::Str(s) => PropKey::Str(ctx.raw(s.span)?),
        ast::PropName::Num(n) => PropKey::Num(ctx.raw(n.span)?),
        ast::PropName::BigInt(b) => PropKey::Num(ctx.raw(b.span)?),
        ast::PropName::Computed(computed) => PropKey::Computed(lower_expr(ctx, &computed.expr)?),
    })
}

fn lower_pat(ctx: &mut LoweringContext, pat: &ast::Pat, mode: PatMode) -> Result<NodeId> {
    match pat {
        ast::Pat::Ident(binding) => Ok(ctx.bind_ident(&binding.id, mode)),
        ast::Pat::Array(array) => lower_array_pat(ctx, array, mode),
        ast::Pat::Object(object) => lower_object_pat(ctx, object, mode),
        ast::Pat::Rest(rest) => {
            let arg = lower_pat(ctx, &rest.arg, mode)?;
            Ok(ctx.alloc(NodeKind::Rest { arg }, rest.span))
        }
        ast::Pat::Assign(assign) => {
            let left = lower_pat(ctx, &assign.left, mode)?;
            let right = lower_expr(ctx, &assign.right)?;
            Ok(ctx.alloc(NodeKind::AssignPat { left, right }, assign.span))
        }
        ast::Pat::Expr(expr) => match mode {
            PatMode::Assign => lower_target_expr(ctx, expr),
            PatMode::Declare { .. } => bail!("expression in a binding pattern"),
        },
        ast::Pat::Invalid(_) => bail!("invalid pattern"),
    }
}

fn lower_array_pat(ctx: &mut LoweringContext, array: &ast::ArrayPat, mode: PatMode) -> Result<NodeId> {
    let mut elems = Vec::with_capacity(array.elems.len());
    for elem in &array.elems {
        elems.push(elem.as_ref().map(|p| lower_pat(ctx, p, mode)).transpose()?);
    }
    Ok(ctx.alloc(NodeKind::ArrayPat { elems }, array.span))
}

fn lower_object_pat(ctx: &mut LoweringContext, object: &ast::ObjectPat, mode: PatMode) -> Result<NodeId> {
    let mut props = Vec::with_capacity(object.props.len());
    for prop in &object.props {
        let node = match prop {
            ast::ObjectPatProp::KeyValue(kv) => {
                let key = lower_prop_name(ctx, &kv.key)?;
                let value = lower_pat(ctx, &kv.value, mode)?;
                ctx.alloc(
                    NodeKind::Property {
                        key,
                        value,
                        shorthand: false,
                    },
                    kv.span(),
                )
            }
            ast::ObjectPatProp::Assign(assign) => {
                let ident = ctx.bind_ident(&assign.key.id, mode);
                let value = match &assign.value {
                    Some(default) => {
                        let right = lower_expr(ctx, default)?;
                        ctx.alloc(NodeKind::AssignPat { left: ident, right }, assign.span)
                    }
                    None => ident,
                };
                ctx.alloc(
                    NodeKind::Property {
                        key: PropKey::Ident(assign.key.id.sym.to_string()),
                        value,
                        shorthand: true,
                    },
                    assign.span,
                )
            }
            ast::ObjectPatProp::Rest(rest) => {
                let arg = lower_pat(ctx, &rest.arg, mode)?;
                ctx.alloc(NodeKind::Rest { arg }, rest.span)
            }
        };
        props.push(node);
    }
    Ok(ctx.alloc(NodeKind::ObjectPat { props }, object.span))
}

fn lower_assign_target(ctx: &mut LoweringContext, target: &ast::AssignTarget) -> Result<NodeId> {
    match target {
        ast::AssignTarget::Simple(simple) => match simple {
            ast::SimpleAssignTarget::Ident(binding) => Ok(ctx.reference(&binding.id, true)),
            ast::SimpleAssignTarget::Member(member) => lower_member(ctx, member, false),
            ast::SimpleAssignTarget::SuperProp(super_prop) => lower_super_prop(ctx, super_prop),
            ast::SimpleAssignTarget::Paren(paren) => {
                let expr = lower_target_expr(ctx, &paren.expr)?;
                Ok(ctx.alloc(NodeKind::Paren { expr }, paren.span))
            }
            ast::SimpleAssignTarget::OptChain(chain) => lower_opt_chain(ctx, chain),
            _ => bail!("unsupported syntax: assignment target"),
        },
        ast::AssignTarget::Pat(pat) => match pat {
            ast::AssignTargetPat::Array(array) => lower_array_pat(ctx, array, PatMode::Assign),
            ast::AssignTargetPat::Object(object) => lower_object_pat(ctx, object, PatMode::Assign),
            ast::AssignTargetPat::Invalid(_) => bail!("invalid assignment target"),
        },
    }
}

/// An expression in write position: bare identifiers become mutation sites.
fn lower_target_expr(ctx: &mut LoweringContext, expr: &ast::Expr) -> Result<NodeId> {
    match expr {
        ast::Expr::Ident(ident) => Ok(ctx.reference(ident, true)),
        ast::Expr::Paren(paren) => {
            let inner = lower_target_expr(ctx, &paren.expr)?;
            Ok(ctx.alloc(NodeKind::Paren { expr: inner }, paren.span))
        }
        _ => lower_expr(ctx, expr),
    }
}

fn lower_args(ctx: &mut LoweringContext, args: &[ast::ExprOrSpread]) -> Result<Vec<NodeId>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        out.push(lower_expr_or_spread(ctx, arg)?);
    }
    Ok(out)
}

fn lower_expr_or_spread(ctx: &mut LoweringContext, arg: &ast::ExprOrSpread) -> Result<NodeId> {
    let expr = lower_expr(ctx, &arg.expr)?;
    Ok(match arg.spread {
        Some(_) => ctx.alloc(NodeKind::Spread { arg: expr }, arg.span()),
        None => expr,
    })
}

fn lower_member(ctx: &mut LoweringContext, member: &ast::MemberExpr, optional: bool) -> Result<NodeId> {
    let object = lower_expr(ctx, &member.obj)?;
    let prop = match &member.prop {
        ast::MemberProp::Ident(ident) => MemberProp::Ident(ident.sym.to_string()),
        ast::MemberProp::PrivateName(private) => MemberProp::Private(private.name.to_string()),
        ast::MemberProp::Computed(computed) => MemberProp::Computed(lower_expr(ctx, &computed.expr)?),
    };
    Ok(ctx.alloc(NodeKind::Member { object, prop, optional }, member.span))
}

fn lower_super_prop(ctx: &mut LoweringContext, super_prop: &ast::SuperPropExpr) -> Result<NodeId> {
    let object = ctx.alloc(NodeKind::Super, super_prop.obj.span);
    let prop = match &super_prop.prop {
        ast::SuperProp::Ident(ident) => MemberProp::Ident(ident.sym.to_string()),
        ast::SuperProp::Computed(computed) => MemberProp::Computed(lower_expr(ctx, &computed.expr)?),
    };
    Ok(ctx.alloc(
        NodeKind::Member {
            object,
            prop,
            optional: false,
        },
        super_prop.span,
    ))
}

fn lower_opt_chain(ctx: &mut LoweringContext, chain: &ast::OptChainExpr) -> Result<NodeId> {
    match &*chain.base {
        ast::OptChainBase::Member(member) => lower_member(ctx, member, chain.optional),
        ast::OptChainBase::Call(call) => {
            let callee = lower_expr(ctx, &call.callee)?;
            let args = lower_args(ctx, &call.args)?;
            Ok(ctx.alloc(
                NodeKind::Call {
                    callee,
                    args,
                    optional: chain.optional,
                },
                chain.span,
            ))
        }
    }
}

fn lower_template(ctx: &mut LoweringContext, tpl: &ast::Tpl) -> Result<NodeId> {
    let quasis = tpl.quasis.iter().map(|q| q.raw.to_string()).collect();
    let mut exprs = Vec::with_capacity(tpl.exprs.len());
    for expr in &tpl.exprs {
        exprs.push(lower_expr(ctx, expr)?);
    }
    Ok(ctx.alloc(NodeKind::Template { quasis, exprs }, tpl.span))
}

fn lower_object(ctx: &mut LoweringContext, object: &ast::ObjectLit) -> Result<NodeId> {
    let mut props = Vec::with_capacity(object.props.len());
    for prop in &object.props {
        let node = match prop {
            ast::PropOrSpread::Spread(spread) => {
                let arg = lower_expr(ctx, &spread.expr)?;
                ctx.alloc(NodeKind::Spread { arg }, spread.span())
            }
            ast::PropOrSpread::Prop(prop) => lower_prop(ctx, prop)?,
        };
        props.push(node);
    }
    Ok(ctx.alloc(NodeKind::Object { props }, object.span))
}

fn lower_prop(ctx: &mut LoweringContext, prop: &ast::Prop) -> Result<NodeId> {
    let node = match prop {
        ast::Prop::Shorthand(ident) => {
            let value = ctx.reference(ident, false);
            ctx.alloc(
                NodeKind::Property {
                    key: PropKey::Ident(ident.sym.to_string()),
                    value,
                    shorthand: true,
                },
                ident.span,
            )
        }
        ast::Prop::KeyValue(kv) => {
            let key = lower_prop_name(ctx, &kv.key)?;
            let value = lower_expr(ctx, &kv.value)?;
            ctx.alloc(
                NodeKind::Property {
                    key,
                    value,
                    shorthand: false,
                },
                prop.span(),
            )
        }
        ast::Prop::Assign(_) => bail!("shorthand property initializer outside a pattern"),
        ast::Prop::Getter(getter) => {
            let key = lower_prop_name(ctx, &getter.key)?;
            let body = getter
                .body
                .as_ref()
                .ok_or_else(|| anyhow!("getter without a body"))?;
            let function = lower_function_parts(
                ctx,
                FunctionParts {
                    kind: FunctionKind::Getter,
                    name: None,
                    params: Vec::new(),
                    body: FnBody::Block(body),
                    is_async: false,
                    is_generator: false,
                    span: getter.span,
                },
            )?;
            ctx.alloc(NodeKind::ObjectMethod { key, function }, getter.span)
        }
        ast::Prop::Setter(setter) => {
            let key = lower_prop_name(ctx, &setter.key)?;
            let body = setter
                .body
                .as_ref()
                .ok_or_else(|| anyhow!("setter without a body"))?;
            let function = lower_function_parts(
                ctx,
                FunctionParts {
                    kind: FunctionKind::Setter,
                    name: None,
                    params: vec![setter.param.as_ref()],
                    body: FnBody::Block(body),
                    is_async: false,
                    is_generator: false,
                    span: setter.span,
                },
            )?;
            ctx.alloc(NodeKind::ObjectMethod { key, function }, setter.span)
        }
        ast::Prop::Method(method) => {
            let key = lower_prop_name(ctx, &method.key)?;
            let function = lower_function(ctx, FunctionKind::Method, None, &method.function)?;
            ctx.alloc(NodeKind::ObjectMethod { key, function }, prop.span())
        }
    };
    Ok(node)
}

fn lower_expr(ctx: &mut LoweringContext, expr: &ast::Expr) -> Result<NodeId> {
    let node = match expr {
        ast::Expr::This(this) => ctx.alloc(NodeKind::This, this.span),
        ast::Expr::Ident(ident) => ctx.reference(ident, false),
        ast::Expr::Lit(lit) => {
            let raw = ctx.raw(lit.span())?;
            ctx.alloc(NodeKind::Lit { raw }, lit.span())
        }
        ast::Expr::Array(array) => {
            let mut elems = Vec::with_capacity(array.elems.len());
            for elem in &array.elems {
                elems.push(elem.as_ref().map(|e| lower_expr_or_spread(ctx, e)).transpose()?);
            }
            ctx.alloc(NodeKind::Array { elems }, array.span)
        }
        ast::Expr::Object(object) => lower_object(ctx, object)?,
        ast::Expr::Fn(fn_expr) => {
            lower_function(ctx, FunctionKind::Expression, fn_expr.ident.as_ref(), &fn_expr.function)?
        }
        ast::Expr::Arrow(arrow) => lower_arrow(ctx, arrow)?,
        ast::Expr::Class(class_expr) => lower_class(ctx, class_expr.ident.as_ref(), &class_expr.class, false)?,
        ast::Expr::Unary(unary) => {
            let arg = lower_expr(ctx, &unary.arg)?;
            ctx.alloc(
                NodeKind::Unary {
                    op: unary.op.as_str(),
                    arg,
                },
                unary.span,
            )
        }
        ast::Expr::Update(update) => {
            let arg = lower_target_expr(ctx, &update.arg)?;
            ctx.alloc(
                NodeKind::Update {
                    op: update.op.as_str(),
                    prefix: update.prefix,
                    arg,
                },
                update.span,
            )
        }
        ast::Expr::Bin(bin) => {
            let left = lower_expr(ctx, &bin.left)?;
            let right = lower_expr(ctx, &bin.right)?;
            ctx.alloc(
                NodeKind::Binary {
                    op: bin.op.as_str(),
                    left,
                    right,
                },
                bin.span,
            )
        }
        ast::Expr::Assign(assign) => {
            let target = lower_assign_target(ctx, &assign.left)?;
            let value = lower_expr(ctx, &assign.right)?;
            ctx.alloc(
                NodeKind::Assign {
                    op: assign.op.as_str(),
                    target,
                    value,
                },
                assign.span,
            )
        }
        ast::Expr::Member(member) => lower_member(ctx, member, false)?,
        ast::Expr::SuperProp(super_prop) => lower_super_prop(ctx, super_prop)?,
        ast::Expr::OptChain(chain) => lower_opt_chain(ctx, chain)?,
        ast::Expr::Cond(cond) => {
            let test = lower_expr(ctx, &cond.test)?;
            let cons = lower_expr(ctx, &cond.cons)?;
            let alt = lower_expr(ctx, &cond.alt)?;
            ctx.alloc(NodeKind::Cond { test, cons, alt }, cond.span)
        }
        ast::Expr::Call(call) => {
            let callee = match &call.callee {
                ast::Callee::Super(s) => ctx.alloc(NodeKind::Super, s.span),
                ast::Callee::Import(i) => ctx.alloc(NodeKind::ImportCallee, i.span),
                ast::Callee::Expr(e) => lower_expr(ctx, e)?,
            };
            let args = lower_args(ctx, &call.args)?;
            ctx.alloc(
                NodeKind::Call {
                    callee,
                    args,
                    optional: false,
                },
                call.span,
            )
        }
        ast::Expr::New(new) => {
            let callee = lower_expr(ctx, &new.callee)?;
            let args = new.args.as_deref().map(|a| lower_args(ctx, a)).transpose()?;
            ctx.alloc(NodeKind::New { callee, args }, new.span)
        }
        ast::Expr::Seq(seq) => {
            let mut exprs = Vec::with_capacity(seq.exprs.len());
            for e in &seq.exprs {
                exprs.push(lower_expr(ctx, e)?);
            }
            ctx.alloc(NodeKind::Seq { exprs }, seq.span)
        }
        ast::Expr::Tpl(tpl) => lower_template(ctx, tpl)?,
        ast::Expr::TaggedTpl(tagged) => {
            let tag = lower_expr(ctx, &tagged.tag)?;
            let template = lower_template(ctx, &tagged.tpl)?;
            ctx.alloc(NodeKind::TaggedTemplate { tag, template }, tagged.span)
        }
        ast::Expr::Yield(y) => {
            let arg = y.arg.as_deref().map(|e| lower_expr(ctx, e)).transpose()?;
            ctx.alloc(
                NodeKind::Yield {
                    arg,
                    delegate: y.delegate,
                },
                y.span,
            )
        }
        ast::Expr::Await(a) => {
            let arg = lower_expr(ctx, &a.arg)?;
            ctx.alloc(NodeKind::Await { arg }, a.span)
        }
        ast::Expr::MetaProp(meta) => {
            let kind = match meta.kind {
                ast::MetaPropKind::NewTarget => MetaPropKind::NewTarget,
                ast::MetaPropKind::ImportMeta => MetaPropKind::ImportMeta,
            };
            ctx.alloc(NodeKind::MetaProp(kind), meta.span)
        }
        ast::Expr::Paren(paren) => {
            let inner = lower_expr(ctx, &paren.expr)?;
            ctx.alloc(NodeKind::Paren { expr: inner }, paren.span)
        }
        ast::Expr::PrivateName(private) => ctx.alloc(
            NodeKind::PrivateName {
                name: private.name.to_string(),
            },
            private.span,
        ),
        ast::Expr::Invalid(_) => bail!("invalid expression"),
        _ => bail!("unsupported syntax: TypeScript or JSX expression"),
    };
    Ok(node)
}
