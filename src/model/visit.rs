//! Read-only traversal of the program model, in the spirit of `syn::visit`.
//!
//! Override the `visit_*` methods you care about and call the matching
//! `walk_*` function to keep descending.

use super::{Block, DeferBlock, Expr, ExprKind, Stmt};

pub trait Visit<'ast> {
    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_defer(&mut self, defer: &'ast DeferBlock) {
        self.visit_block(&defer.body);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_block<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, block: &'ast Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::Local { init } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Defer(defer) => v.visit_defer(defer),
    }
}

pub fn walk_expr<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Ident { .. } => {}
        ExprKind::Field { base, .. } => v.visit_expr(base),
        ExprKind::MethodCall { receiver, args, .. } => {
            v.visit_expr(receiver);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Call { func, args } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Deref(inner) => v.visit_expr(inner),
        ExprKind::Closure(body) | ExprKind::Block(body) => v.visit_block(body),
        ExprKind::Other(children) => {
            for child in children {
                v.visit_expr(child);
            }
        }
    }
}
