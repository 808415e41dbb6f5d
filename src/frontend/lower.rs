//! Per-file lowering into the program model
//!
//! Walks one parsed file and produces its compilation unit: records, enum
//! variant field lists, functions, globals. Inside bodies it keeps a stack
//! of lexical scopes so that every identifier resolves to the object
//! identity of the binding it names, and it tags every expression with
//! the innermost `defer!` block around it.

use super::declare::{for_each_item, Declarations, TypeContext};
use super::{pos, span_of, DEFER_MACRO};
use crate::model::{
    Block, CompilationUnit, DeferBlock, DeferId, Expr, ExprKind, FieldDecl, FieldList, FuncDecl, GlobalDecl, ObjectId,
    RecordDecl, Span, Stmt, TypeRef, Visibility,
};
use std::collections::HashMap;
use std::path::Path;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;

/// Hands out object and defer identities, unique across the program.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    objects: u32,
    defers: u32,
}

impl IdAllocator {
    fn object(&mut self) -> ObjectId {
        self.objects += 1;
        ObjectId(self.objects)
    }

    fn defer(&mut self) -> DeferId {
        self.defers += 1;
        DeferId(self.defers)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    object: ObjectId,
    ty: TypeRef,
}

type Scope = HashMap<String, Binding>;

pub(crate) fn lower_file(
    decls: &Declarations,
    ids: &mut IdAllocator,
    file: usize,
    path: &Path,
    ast: &syn::File,
) -> CompilationUnit {
    let mut lowerer = Lowerer {
        decls,
        ids,
        file,
        unit: CompilationUnit::new(path),
        scopes: vec![Scope::new()],
        defer: None,
        ctx: TypeContext::default(),
    };
    for_each_item(&ast.items, &mut |item| lowerer.bind_global(item));
    lowerer.lower_items(&ast.items);
    lowerer.unit
}

struct Lowerer<'a> {
    decls: &'a Declarations,
    ids: &'a mut IdAllocator,
    file: usize,
    unit: CompilationUnit,
    /// Innermost last; the first scope holds the file's statics and consts.
    scopes: Vec<Scope>,
    defer: Option<DeferId>,
    /// `Self` and the type parameters in scope.
    ctx: TypeContext,
}

impl Lowerer<'_> {
    // Items

    fn bind_global(&mut self, item: &syn::Item) {
        match item {
            syn::Item::Const(c) => {
                let ty = self.resolve(&c.ty);
                self.bind(&c.ident.unraw().to_string(), ty);
            }
            syn::Item::Static(s) => {
                let ty = self.resolve(&s.ty);
                self.bind(&s.ident.unraw().to_string(), ty);
            }
            _ => {}
        }
    }

    fn lower_items(&mut self, items: &[syn::Item]) {
        for item in items {
            self.lower_item(item);
        }
    }

    fn lower_item(&mut self, item: &syn::Item) {
        match item {
            syn::Item::Struct(s) => self.lower_struct(s),
            syn::Item::Enum(e) => self.lower_enum(e),
            syn::Item::Fn(f) => self.lower_fn(f.sig.ident.to_string(), &f.sig, &f.block, span_of(f)),
            syn::Item::Impl(imp) => self.lower_impl(imp),
            syn::Item::Trait(t) => self.lower_trait(t),
            syn::Item::Const(c) => self.lower_global(c.ident.to_string(), &c.expr, span_of(c)),
            syn::Item::Static(s) => self.lower_global(s.ident.to_string(), &s.expr, span_of(s)),
            syn::Item::Mod(m) => {
                if let Some((_, items)) = &m.content {
                    self.lower_items(items);
                }
            }
            _ => {}
        }
    }

    fn lower_struct(&mut self, item: &syn::ItemStruct) {
        let Some(id) = self.decls.declared_type(self.file, &item.ident) else {
            return;
        };
        let ctx = self
            .decls
            .with_generics(self.file, &TypeContext::with_self(TypeRef::Named(id)), &item.generics);
        let fields = self.lower_fields(&item.fields, &ctx);
        self.unit.records.push(RecordDecl {
            id,
            name: item.ident.unraw().to_string(),
            fields,
            span: span_of(item),
        });
    }

    fn lower_enum(&mut self, item: &syn::ItemEnum) {
        let self_ty = self
            .decls
            .declared_type(self.file, &item.ident)
            .map(TypeRef::Named)
            .unwrap_or(TypeRef::Unknown);
        let ctx = self
            .decls
            .with_generics(self.file, &TypeContext::with_self(self_ty), &item.generics);
        for variant in &item.variants {
            if let syn::Fields::Named(_) = variant.fields {
                let fields = self.lower_fields(&variant.fields, &ctx);
                self.unit.field_lists.push(FieldList {
                    fields,
                    span: span_of(variant),
                });
            }
        }
    }

    fn lower_fields(&self, fields: &syn::Fields, ctx: &TypeContext) -> Vec<FieldDecl> {
        fields
            .iter()
            .map(|field| FieldDecl {
                name: field.ident.as_ref().map(|ident| ident.unraw().to_string()),
                ty: self.decls.resolve_type(self.file, &field.ty, ctx),
                visibility: visibility(&field.vis),
                docs: doc_comment(&field.attrs),
                pos: match &field.ident {
                    Some(ident) => pos(ident.span()),
                    None => pos(field.ty.span()),
                },
                span: span_of(field),
            })
            .collect()
    }

    fn lower_impl(&mut self, item: &syn::ItemImpl) {
        let generics = self.decls.with_generics(self.file, &self.ctx, &item.generics);
        let self_ty = self.decls.resolve_type(self.file, &item.self_ty, &generics);
        let owner = type_label(&item.self_ty);
        let ctx = TypeContext {
            self_ty: Some(self_ty),
            ..generics
        };
        let outer = std::mem::replace(&mut self.ctx, ctx);

        for impl_item in &item.items {
            match impl_item {
                syn::ImplItem::Fn(f) => {
                    self.lower_fn(format!("{}::{}", owner, f.sig.ident), &f.sig, &f.block, span_of(f));
                }
                syn::ImplItem::Const(c) => {
                    self.lower_global(format!("{}::{}", owner, c.ident), &c.expr, span_of(c));
                }
                _ => {}
            }
        }

        self.ctx = outer;
    }

    fn lower_trait(&mut self, item: &syn::ItemTrait) {
        let self_ty = self.decls.declared_type(self.file, &item.ident).map(TypeRef::Named);
        let ctx = TypeContext {
            self_ty,
            ..self.decls.with_generics(self.file, &self.ctx, &item.generics)
        };
        let outer = std::mem::replace(&mut self.ctx, ctx);

        for trait_item in &item.items {
            if let syn::TraitItem::Fn(f) = trait_item {
                if let Some(block) = &f.default {
                    self.lower_fn(format!("{}::{}", item.ident, f.sig.ident), &f.sig, block, span_of(f));
                }
            }
        }

        self.ctx = outer;
    }

    fn lower_global(&mut self, name: String, expr: &syn::Expr, span: Span) {
        let init = self.lower_expr(expr);
        self.unit.globals.push(GlobalDecl {
            name,
            span,
            init: Some(init),
        });
    }

    fn lower_fn(&mut self, name: String, sig: &syn::Signature, block: &syn::Block, span: Span) {
        let outer_defer = self.defer.take();
        let fn_ctx = self.decls.with_generics(self.file, &self.ctx, &sig.generics);
        let outer_ctx = std::mem::replace(&mut self.ctx, fn_ctx);
        self.scopes.push(Scope::new());

        for input in &sig.inputs {
            match input {
                syn::FnArg::Receiver(receiver) => {
                    let ty = self.resolve(&receiver.ty);
                    self.bind("self", ty);
                }
                syn::FnArg::Typed(arg) => {
                    let ty = self.resolve(&arg.ty);
                    self.bind_pat(&arg.pat, ty);
                }
            }
        }
        let body = self.lower_block(block);

        self.scopes.pop();
        self.ctx = outer_ctx;
        self.defer = outer_defer;
        self.unit.functions.push(FuncDecl { name, span, body });
    }

    /// An item nested in a body sees the file's globals but none of the
    /// enclosing function's locals, `Self` or type parameters.
    fn lower_nested_item(&mut self, item: &syn::Item) {
        let globals = self.scopes.first().cloned().unwrap_or_default();
        let outer = std::mem::replace(&mut self.scopes, vec![globals]);
        let outer_ctx = std::mem::take(&mut self.ctx);
        self.lower_item(item);
        self.ctx = outer_ctx;
        self.scopes = outer;
    }

    // Scopes

    fn bind(&mut self, name: &str, ty: TypeRef) {
        let object = self.ids.object();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { object, ty });
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn resolve(&self, ty: &syn::Type) -> TypeRef {
        self.decls.resolve_type(self.file, ty, &self.ctx)
    }

    fn bind_pat(&mut self, pat: &syn::Pat, ty: TypeRef) {
        match pat {
            syn::Pat::Ident(p) => {
                let ty = if p.by_ref.is_some() {
                    TypeRef::pointer_to(ty)
                } else {
                    ty
                };
                if let Some((_, sub)) = &p.subpat {
                    self.bind_pat(sub, TypeRef::Unknown);
                }
                self.bind(&p.ident.unraw().to_string(), ty);
            }
            syn::Pat::Type(p) => {
                let ty = self.resolve(&p.ty);
                self.bind_pat(&p.pat, ty);
            }
            syn::Pat::Reference(p) => {
                let inner = match ty {
                    TypeRef::Pointer(inner) => *inner,
                    _ => TypeRef::Unknown,
                };
                self.bind_pat(&p.pat, inner);
            }
            syn::Pat::Paren(p) => self.bind_pat(&p.pat, ty),
            syn::Pat::Or(p) => {
                for case in &p.cases {
                    self.bind_pat(case, ty.clone());
                }
            }
            syn::Pat::Tuple(p) => self.bind_each(&p.elems),
            syn::Pat::TupleStruct(p) => self.bind_each(&p.elems),
            syn::Pat::Slice(p) => self.bind_each(&p.elems),
            syn::Pat::Struct(p) => {
                for field in &p.fields {
                    self.bind_pat(&field.pat, TypeRef::Unknown);
                }
            }
            _ => {}
        }
    }

    fn bind_each<'p>(&mut self, pats: impl IntoIterator<Item = &'p syn::Pat>) {
        for pat in pats {
            self.bind_pat(pat, TypeRef::Unknown);
        }
    }

    // Statements

    fn lower_block(&mut self, block: &syn::Block) -> Block {
        self.scopes.push(Scope::new());
        let stmts = self.lower_stmts(&block.stmts);
        self.scopes.pop();
        Block {
            open: pos(block.brace_token.span.open()),
            stmts,
        }
    }

    fn lower_stmts(&mut self, stmts: &[syn::Stmt]) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out);
        }
        out
    }

    fn lower_stmt(&mut self, stmt: &syn::Stmt, out: &mut Vec<Stmt>) {
        match stmt {
            syn::Stmt::Local(local) => {
                let mut ty = TypeRef::Unknown;
                let mut init = None;
                if let Some(local_init) = &local.init {
                    let expr = self.lower_expr(&local_init.expr);
                    ty = expr.ty.clone();
                    init = Some(match &local_init.diverge {
                        // The else branch runs without the new bindings.
                        Some((_, diverge)) => {
                            let diverge = self.lower_expr(diverge);
                            self.node(ExprKind::Other(vec![expr, diverge]), TypeRef::Unknown, span_of(local))
                        }
                        None => expr,
                    });
                }
                self.bind_pat(&local.pat, ty);
                out.push(Stmt::Local { init });
            }
            syn::Stmt::Item(syn::Item::Const(c)) => {
                let init = self.lower_expr(&c.expr);
                let ty = self.resolve(&c.ty);
                self.bind(&c.ident.unraw().to_string(), ty);
                out.push(Stmt::Local { init: Some(init) });
            }
            syn::Stmt::Item(syn::Item::Static(s)) => {
                let init = self.lower_expr(&s.expr);
                let ty = self.resolve(&s.ty);
                self.bind(&s.ident.unraw().to_string(), ty);
                out.push(Stmt::Local { init: Some(init) });
            }
            syn::Stmt::Item(item) => self.lower_nested_item(item),
            syn::Stmt::Expr(syn::Expr::Macro(m), _) if is_defer(&m.mac) => match self.lower_defer(&m.mac) {
                Some(defer) => out.push(Stmt::Defer(defer)),
                None => out.push(Stmt::Expr(self.lower_macro(&m.mac))),
            },
            syn::Stmt::Expr(expr, _) => out.push(Stmt::Expr(self.lower_expr(expr))),
            syn::Stmt::Macro(m) => {
                let lowered = if is_defer(&m.mac) {
                    self.lower_defer(&m.mac).map(Stmt::Defer)
                } else {
                    None
                };
                out.push(lowered.unwrap_or_else(|| Stmt::Expr(self.lower_macro(&m.mac))));
            }
        }
    }

    /// `defer! { .. }`: a fresh defer identity for everything inside.
    fn lower_defer(&mut self, mac: &syn::Macro) -> Option<DeferBlock> {
        let stmts = mac.parse_body_with(syn::Block::parse_within).ok()?;
        let id = self.ids.defer();
        let outer = self.defer.replace(id);

        self.scopes.push(Scope::new());
        let lowered = self.lower_stmts(&stmts);
        self.scopes.pop();
        self.defer = outer;

        Some(DeferBlock {
            id,
            span: span_of(mac),
            body: Block {
                open: pos(delimiter_open(&mac.delimiter)),
                stmts: lowered,
            },
        })
    }

    /// Any other macro: its arguments, when they parse as expressions.
    fn lower_macro(&mut self, mac: &syn::Macro) -> Expr {
        let args = mac
            .parse_body_with(Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated)
            .map(|args| args.iter().map(|arg| self.lower_expr(arg)).collect::<Vec<_>>())
            .unwrap_or_default();
        self.node(ExprKind::Other(args), TypeRef::Unknown, span_of(mac))
    }

    // Expressions

    fn node(&self, kind: ExprKind, ty: TypeRef, span: Span) -> Expr {
        Expr::new(kind, ty, span, self.defer)
    }

    fn other(&self, children: Vec<Expr>, span: Span) -> Expr {
        self.node(ExprKind::Other(children), TypeRef::Unknown, span)
    }

    fn lower_opt(&mut self, expr: Option<&syn::Expr>) -> Vec<Expr> {
        expr.map(|e| vec![self.lower_expr(e)]).unwrap_or_default()
    }

    fn lower_all<'e>(&mut self, exprs: impl IntoIterator<Item = &'e syn::Expr>) -> Vec<Expr> {
        exprs.into_iter().map(|e| self.lower_expr(e)).collect()
    }

    fn lower_expr(&mut self, expr: &syn::Expr) -> Expr {
        let span = span_of(expr);
        match expr {
            syn::Expr::Path(p) => self.lower_path(&p.path, p.qself.is_some(), span),
            syn::Expr::Field(f) => {
                let base = self.lower_expr(&f.base);
                let name = match &f.member {
                    syn::Member::Named(ident) => ident.unraw().to_string(),
                    syn::Member::Unnamed(index) => index.index.to_string(),
                };
                let ty = base
                    .ty
                    .named()
                    .and_then(|record| self.decls.field_type(record, &name))
                    .cloned()
                    .unwrap_or(TypeRef::Unknown);
                self.node(
                    ExprKind::Field {
                        base: Box::new(base),
                        name,
                    },
                    ty,
                    span,
                )
            }
            syn::Expr::MethodCall(m) => {
                let receiver = self.lower_expr(&m.receiver);
                let args = self.lower_all(&m.args);
                let method = m.method.to_string();
                let target = self
                    .decls
                    .types()
                    .lookup_method(&receiver.ty, &method)
                    .filter(|sig| sig.params == args.len())
                    .cloned();
                let ty = if method == "clone" {
                    receiver.ty.clone()
                } else {
                    TypeRef::Unknown
                };
                self.node(
                    ExprKind::MethodCall {
                        receiver: Box::new(receiver),
                        method,
                        args,
                        target,
                    },
                    ty,
                    span,
                )
            }
            syn::Expr::Call(c) => {
                let ty = self.call_type(&c.func);
                let func = self.lower_expr(&c.func);
                let args = self.lower_all(&c.args);
                self.node(
                    ExprKind::Call {
                        func: Box::new(func),
                        args,
                    },
                    ty,
                    span,
                )
            }
            syn::Expr::Struct(s) => {
                let ty = self.path_type(&s.path);
                let mut children = self.lower_all(s.fields.iter().map(|field| &field.expr));
                children.extend(self.lower_opt(s.rest.as_deref()));
                self.node(ExprKind::Other(children), ty, span)
            }
            syn::Expr::Reference(r) => {
                let inner = self.lower_expr(&r.expr);
                let ty = match inner.ty {
                    TypeRef::Unknown => TypeRef::Unknown,
                    ref ty => TypeRef::pointer_to(ty.clone()),
                };
                self.node(ExprKind::Other(vec![inner]), ty, span)
            }
            syn::Expr::Unary(u) => {
                let inner = self.lower_expr(&u.expr);
                match u.op {
                    syn::UnOp::Deref(_) => {
                        let ty = match &inner.ty {
                            TypeRef::Pointer(pointee) => (**pointee).clone(),
                            _ => TypeRef::Unknown,
                        };
                        self.node(ExprKind::Deref(Box::new(inner)), ty, span)
                    }
                    _ => self.node(ExprKind::Other(vec![inner]), TypeRef::Unknown, span),
                }
            }
            syn::Expr::Paren(p) => self.lower_expr(&p.expr),
            syn::Expr::Group(g) => self.lower_expr(&g.expr),
            syn::Expr::Closure(c) => {
                self.scopes.push(Scope::new());
                for input in &c.inputs {
                    self.bind_pat(input, TypeRef::Unknown);
                }
                let body = match &*c.body {
                    syn::Expr::Block(b) => self.lower_block(&b.block),
                    other => Block {
                        open: pos(other.span()),
                        stmts: vec![Stmt::Expr(self.lower_expr(other))],
                    },
                };
                self.scopes.pop();
                self.node(ExprKind::Closure(body), TypeRef::Unknown, span)
            }
            syn::Expr::Block(b) => self.lower_block_expr(&b.block, span),
            syn::Expr::Unsafe(u) => self.lower_block_expr(&u.block, span),
            syn::Expr::Async(a) => self.lower_block_expr(&a.block, span),
            syn::Expr::Const(c) => self.lower_block_expr(&c.block, span),
            syn::Expr::TryBlock(t) => self.lower_block_expr(&t.block, span),
            syn::Expr::Loop(l) => self.lower_block_expr(&l.body, span),
            syn::Expr::If(i) => {
                // `if let` bindings are visible in the then-branch only.
                self.scopes.push(Scope::new());
                let cond = self.lower_expr(&i.cond);
                let then = self.lower_block_expr(&i.then_branch, span_of(&i.then_branch));
                self.scopes.pop();
                let mut children = vec![cond, then];
                if let Some((_, otherwise)) = &i.else_branch {
                    children.push(self.lower_expr(otherwise));
                }
                self.other(children, span)
            }
            syn::Expr::While(w) => {
                self.scopes.push(Scope::new());
                let cond = self.lower_expr(&w.cond);
                let body = self.lower_block_expr(&w.body, span_of(&w.body));
                self.scopes.pop();
                self.other(vec![cond, body], span)
            }
            syn::Expr::ForLoop(f) => {
                let iter = self.lower_expr(&f.expr);
                self.scopes.push(Scope::new());
                self.bind_pat(&f.pat, TypeRef::Unknown);
                let body = self.lower_block_expr(&f.body, span_of(&f.body));
                self.scopes.pop();
                self.other(vec![iter, body], span)
            }
            syn::Expr::Match(m) => {
                let scrutinee = self.lower_expr(&m.expr);
                let scrutinee_ty = scrutinee.ty.clone();
                let mut children = vec![scrutinee];
                for arm in &m.arms {
                    self.scopes.push(Scope::new());
                    self.bind_pat(&arm.pat, scrutinee_ty.clone());
                    if let Some((_, guard)) = &arm.guard {
                        children.push(self.lower_expr(guard));
                    }
                    children.push(self.lower_expr(&arm.body));
                    self.scopes.pop();
                }
                self.other(children, span)
            }
            syn::Expr::Let(l) => {
                let init = self.lower_expr(&l.expr);
                self.bind_pat(&l.pat, init.ty.clone());
                self.other(vec![init], span)
            }
            syn::Expr::Macro(m) => {
                if is_defer(&m.mac) {
                    if let Some(defer) = self.lower_defer(&m.mac) {
                        let block = Block {
                            open: defer.body.open,
                            stmts: vec![Stmt::Defer(defer)],
                        };
                        return self.node(ExprKind::Block(block), TypeRef::Unknown, span);
                    }
                }
                self.lower_macro(&m.mac)
            }
            syn::Expr::Assign(a) => {
                let children = vec![self.lower_expr(&a.left), self.lower_expr(&a.right)];
                self.other(children, span)
            }
            syn::Expr::Binary(b) => {
                let children = vec![self.lower_expr(&b.left), self.lower_expr(&b.right)];
                self.other(children, span)
            }
            syn::Expr::Index(i) => {
                let children = vec![self.lower_expr(&i.expr), self.lower_expr(&i.index)];
                self.other(children, span)
            }
            syn::Expr::Repeat(r) => {
                let children = vec![self.lower_expr(&r.expr), self.lower_expr(&r.len)];
                self.other(children, span)
            }
            syn::Expr::Range(r) => {
                let mut children = self.lower_opt(r.start.as_deref());
                children.extend(self.lower_opt(r.end.as_deref()));
                self.other(children, span)
            }
            syn::Expr::Tuple(t) => {
                let children = self.lower_all(&t.elems);
                self.other(children, span)
            }
            syn::Expr::Array(a) => {
                let children = self.lower_all(&a.elems);
                self.other(children, span)
            }
            syn::Expr::Cast(c) => {
                let children = vec![self.lower_expr(&c.expr)];
                self.other(children, span)
            }
            syn::Expr::Await(a) => {
                let children = vec![self.lower_expr(&a.base)];
                self.other(children, span)
            }
            syn::Expr::Try(t) => {
                let children = vec![self.lower_expr(&t.expr)];
                self.other(children, span)
            }
            syn::Expr::Return(r) => {
                let children = self.lower_opt(r.expr.as_deref());
                self.other(children, span)
            }
            syn::Expr::Break(b) => {
                let children = self.lower_opt(b.expr.as_deref());
                self.other(children, span)
            }
            syn::Expr::Yield(y) => {
                let children = self.lower_opt(y.expr.as_deref());
                self.other(children, span)
            }
            _ => self.other(Vec::new(), span),
        }
    }

    fn lower_block_expr(&mut self, block: &syn::Block, span: Span) -> Expr {
        let block = self.lower_block(block);
        self.node(ExprKind::Block(block), TypeRef::Unknown, span)
    }

    fn lower_path(&self, path: &syn::Path, qualified: bool, span: Span) -> Expr {
        let single = match (qualified, path.segments.len()) {
            (false, 1) => path.segments.first().map(|segment| segment.ident.unraw().to_string()),
            _ => None,
        };
        let Some(name) = single else {
            let name = path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            return self.node(ExprKind::Ident { name, object: None }, TypeRef::Unknown, span);
        };

        let (object, ty) = match self.lookup(&name) {
            Some(binding) => (Some(binding.object), binding.ty.clone()),
            None => (None, TypeRef::Unknown),
        };
        self.node(ExprKind::Ident { name, object }, ty, span)
    }

    /// The type named by a struct literal or constructor path.
    fn path_type(&self, path: &syn::Path) -> TypeRef {
        let Some(last) = path.segments.last() else {
            return TypeRef::Unknown;
        };
        if last.ident == "Self" {
            return self.ctx.self_ty.clone().unwrap_or(TypeRef::Unknown);
        }
        self.decls
            .lookup_name(self.file, &last.ident.unraw().to_string())
            .map(TypeRef::Named)
            .unwrap_or(TypeRef::Unknown)
    }

    /// Result type of `Type::function(..)` or of a tuple-struct constructor.
    fn call_type(&self, func: &syn::Expr) -> TypeRef {
        let syn::Expr::Path(p) = func else {
            return TypeRef::Unknown;
        };
        let segments: Vec<_> = p.path.segments.iter().collect();
        match segments.as_slice() {
            [single] => self
                .decls
                .lookup_name(self.file, &single.ident.unraw().to_string())
                .map(TypeRef::Named)
                .unwrap_or(TypeRef::Unknown),
            [.., owner, function] => {
                let owner = if owner.ident == "Self" {
                    self.ctx.self_ty.clone()
                } else {
                    self.decls
                        .lookup_name(self.file, &owner.ident.unraw().to_string())
                        .map(TypeRef::Named)
                };
                let Some(id) = owner.as_ref().and_then(TypeRef::named) else {
                    return TypeRef::Unknown;
                };
                let function = function.ident.to_string();
                match self.decls.constructor(id, &function) {
                    Some(ty) => ty.clone(),
                    None if function == "default" => TypeRef::Named(id),
                    None => TypeRef::Unknown,
                }
            }
            [] => TypeRef::Unknown,
        }
    }
}

fn is_defer(mac: &syn::Macro) -> bool {
    mac.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == DEFER_MACRO)
}

fn delimiter_open(delimiter: &syn::MacroDelimiter) -> proc_macro2::Span {
    match delimiter {
        syn::MacroDelimiter::Paren(d) => d.span.open(),
        syn::MacroDelimiter::Brace(d) => d.span.open(),
        syn::MacroDelimiter::Bracket(d) => d.span.open(),
    }
}

fn visibility(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Exported,
        _ => Visibility::Private,
    }
}

/// `///` lines (and `#[doc = ".."]` attributes) joined with newlines.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Short name of an impl's self type, for function names.
fn type_label(ty: &syn::Type) -> String {
    match ty {
        syn::Type::Path(p) => p
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        syn::Type::Reference(r) => type_label(&r.elem),
        other => quote::ToTokens::to_token_stream(other).to_string(),
    }
}
