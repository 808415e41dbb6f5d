//! Statements and expressions of the program model
//!
//! Every expression carries the resolved static type, and the identity of
//! the deferred block it lexically sits in. Identifiers additionally carry
//! the object identity they resolve to.

use super::{Pos, Span, TypeRef};

/// Identity of a runtime object (a local variable, parameter or global).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

/// Identity of one deferred block (one `defer` statement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferId(pub u32);

/// Signature shape of a method: its name and number of non-receiver parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub name: String,
    pub params: usize,
    /// Callable only through a pointer to the type.
    pub pointer_receiver: bool,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, params: usize, pointer_receiver: bool) -> Self {
        MethodSig {
            name: name.into(),
            params,
            pointer_receiver,
        }
    }
}

/// A `{ ... }` statement list.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Position of the opening brace.
    pub open: Pos,
    pub stmts: Vec<Stmt>,
}

/// A deferred block: runs when the enclosing function returns.
#[derive(Debug, Clone)]
pub struct DeferBlock {
    pub id: DeferId,
    pub span: Span,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// A local binding with its initializer.
    Local { init: Option<Expr> },
    Expr(Expr),
    Defer(DeferBlock),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeRef,
    pub span: Span,
    /// Innermost deferred block containing this expression.
    pub defer: Option<DeferId>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A name resolving (maybe) to an object.
    Ident {
        name: String,
        object: Option<ObjectId>,
    },
    /// Selector access `base.name`.
    Field { base: Box<Expr>, name: String },
    /// `receiver.method(args)`. `target` is the resolved method, if any.
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        target: Option<MethodSig>,
    },
    Call { func: Box<Expr>, args: Vec<Expr> },
    /// `*inner`: the same object as `inner`.
    Deref(Box<Expr>),
    Closure(Block),
    Block(Block),
    /// Any other expression, reduced to its sub-expressions.
    Other(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeRef, span: Span, defer: Option<DeferId>) -> Self {
        Expr { kind, ty, span, defer }
    }

    pub fn pos(&self) -> Pos {
        self.span.start
    }

    /// The object this expression names directly, if it is a resolved
    /// identifier or a dereference of one.
    pub fn object(&self) -> Option<ObjectId> {
        match &self.kind {
            ExprKind::Ident { object, .. } => *object,
            ExprKind::Deref(inner) => inner.object(),
            _ => None,
        }
    }

    /// Source text of an identifier, used in messages.
    pub fn ident_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident { name, .. } => Some(name),
            ExprKind::Deref(inner) => inner.ident_name(),
            _ => None,
        }
    }
}
