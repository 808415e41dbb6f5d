//! Program model consumed by the checker
//!
//! This is the narrow interface between a language front end and the
//! analysis core. A front end (see `crate::frontend`) resolves:
//! - Records and their ordered fields (name, type, visibility, docs, span)
//! - Static types, including the method sets needed for lock capability checks
//! - Object identities of receiver expressions
//! - Deferred-block membership of every expression
//!
//! The core never parses source text; it only reads this model.

pub mod expr;
pub mod visit;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub use expr::{Block, DeferBlock, DeferId, Expr, ExprKind, MethodSig, ObjectId, Stmt};
pub use visit::Visit;

/// A position inside one compilation unit (1-based line and column).
///
/// Positions order lexicographically, which gives the "occurs before"
/// relation the verifier relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub const fn new(line: usize, column: usize) -> Self {
        Pos { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Span { start, end }
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Identity of a named type in the program's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

/// Position of a field inside its record's ordered field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Reachable from outside the analyzed package.
    Exported,
    /// Package-private.
    Private,
}

/// A resolved static type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(TypeId),
    Pointer(Box<TypeRef>),
    /// A type the checker has no use for (primitives, foreign types, ...).
    Other(String),
    Unknown,
}

impl TypeRef {
    pub fn pointer_to(inner: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(inner))
    }

    /// Strip every level of pointer indirection.
    pub fn deref_all(&self) -> &TypeRef {
        let mut ty = self;
        while let TypeRef::Pointer(inner) = ty {
            ty = inner;
        }
        ty
    }

    /// The named type behind any number of pointers, if any.
    pub fn named(&self) -> Option<TypeId> {
        match self.deref_all() {
            TypeRef::Named(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeRef::Pointer(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Record,
    /// A method-only type (trait object / interface).
    Interface,
    Other,
}

/// Entry of the type table.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    pub methods: Vec<MethodSig>,
}

/// All named types of a program, indexed by `TypeId`.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new named type and return its identity.
    pub fn insert(&mut self, name: impl Into<String>, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo {
            id,
            name: name.into(),
            kind,
            methods: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id.0 as usize)
    }

    /// Add a method to a type. A later declaration with the same name
    /// replaces the earlier one.
    pub fn add_method(&mut self, id: TypeId, method: MethodSig) {
        if let Some(info) = self.types.get_mut(id.0 as usize) {
            match info.methods.iter_mut().find(|m| m.name == method.name) {
                Some(existing) => *existing = method,
                None => info.methods.push(method),
            }
        }
    }

    pub fn name_of(&self, id: TypeId) -> &str {
        self.get(id).map(|info| info.name.as_str()).unwrap_or("<unknown>")
    }

    /// Method set of a type.
    ///
    /// For a value of a named type only value-receiver methods are
    /// callable; through a pointer every method is. Interfaces expose
    /// all their methods either way.
    pub fn method_set<'a>(&'a self, ty: &TypeRef) -> Vec<&'a MethodSig> {
        let through_pointer = ty.is_pointer();
        let Some(info) = ty.named().and_then(|id| self.get(id)) else {
            return Vec::new();
        };
        info.methods
            .iter()
            .filter(|m| through_pointer || info.kind == TypeKind::Interface || !m.pointer_receiver)
            .collect()
    }

    /// Look up a method callable on `ty` by name.
    pub fn lookup_method(&self, ty: &TypeRef, name: &str) -> Option<&MethodSig> {
        let id = ty.named()?;
        self.get(id)?.methods.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A field of a record (or of any other field list).
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// `None` for embedded / anonymous fields.
    pub name: Option<String>,
    pub ty: TypeRef,
    pub visibility: Visibility,
    /// Concatenated attached documentation, if any.
    pub docs: Option<String>,
    /// Position of the field name (or type, for anonymous fields).
    pub pos: Pos,
    /// Whole declaration, attached documentation included.
    pub span: Span,
}

impl FieldDecl {
    /// The blank identifier never names a real field.
    pub fn is_blank(&self) -> bool {
        self.name.as_deref() == Some("_")
    }

    /// Embedded, anonymous and blank fields cannot be protected.
    pub fn is_protectable(&self) -> bool {
        self.name.is_some() && !self.is_blank()
    }
}

/// A named record (struct) declaration.
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub id: TypeId,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

impl RecordDecl {
    /// Find a field by exact name.
    pub fn field_by_name(&self, name: &str) -> Option<(FieldIndex, &FieldDecl)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name.as_deref() == Some(name))
            .map(|(i, f)| (FieldIndex(i), f))
    }
}

/// Field-like declarations that do not belong to a record
/// (e.g. the named fields of an enum variant).
#[derive(Debug, Clone)]
pub struct FieldList {
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// A function declaration with a body.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub span: Span,
    pub body: Block,
}

/// A package-level variable / constant with an optional initializer.
#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub name: String,
    pub span: Span,
    pub init: Option<Expr>,
}

/// One compilation unit (a source file).
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub records: Vec<RecordDecl>,
    pub field_lists: Vec<FieldList>,
    pub functions: Vec<FuncDecl>,
    pub globals: Vec<GlobalDecl>,
}

impl CompilationUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CompilationUnit {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Every field declared in this unit, wherever it appears.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.records
            .iter()
            .flat_map(|r| r.fields.iter())
            .chain(self.field_lists.iter().flat_map(|l| l.fields.iter()))
    }

    /// The smallest record whose span contains `span`.
    ///
    /// Record spans never partially overlap, so among the containing
    /// records the innermost one starts last.
    pub fn enclosing_record(&self, span: &Span) -> Option<&RecordDecl> {
        self.records
            .iter()
            .filter(|r| r.span.contains(span))
            .max_by_key(|r| r.span.start)
    }

    /// The innermost function declaration whose span contains `span`.
    pub fn enclosing_function(&self, span: &Span) -> Option<usize> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.span.contains(span))
            .max_by_key(|(_, f)| f.span.start)
            .map(|(i, _)| i)
    }
}

/// The whole analyzed program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
    pub types: TypeTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(l1: usize, c1: usize, l2: usize, c2: usize) -> Span {
        Span::new(Pos::new(l1, c1), Pos::new(l2, c2))
    }

    #[test]
    fn test_enclosing_record_picks_innermost() {
        let mut unit = CompilationUnit::new("a.rs");
        for (i, s) in [span(1, 1, 20, 2), span(5, 5, 10, 6)].into_iter().enumerate() {
            unit.records.push(RecordDecl {
                id: TypeId(i as u32),
                name: format!("R{}", i),
                fields: Vec::new(),
                span: s,
            });
        }

        let inner = unit.enclosing_record(&span(6, 9, 6, 20)).map(|r| r.id);
        assert_eq!(inner, Some(TypeId(1)));
        let outer = unit.enclosing_record(&span(15, 1, 15, 3)).map(|r| r.id);
        assert_eq!(outer, Some(TypeId(0)));
        assert!(unit.enclosing_record(&span(30, 1, 30, 2)).is_none());
    }

    #[test]
    fn test_method_set_respects_receivers() {
        let mut types = TypeTable::new();
        let id = types.insert("Mutex", TypeKind::Record);
        types.add_method(id, MethodSig::new("lock", 0, true));
        types.add_method(id, MethodSig::new("unlock", 0, false));

        let by_value: Vec<_> = types.method_set(&TypeRef::Named(id)).iter().map(|m| m.name.clone()).collect();
        assert_eq!(by_value, vec!["unlock".to_string()]);

        let by_ptr = types.method_set(&TypeRef::pointer_to(TypeRef::Named(id)));
        assert_eq!(by_ptr.len(), 2);
    }

    #[test]
    fn test_blank_and_anonymous_fields_are_not_protectable() {
        let field = |name: Option<&str>| FieldDecl {
            name: name.map(str::to_string),
            ty: TypeRef::Unknown,
            visibility: Visibility::Private,
            docs: Some("protected by mu".into()),
            pos: Pos::default(),
            span: Span::default(),
        };
        assert!(field(Some("i")).is_protectable());
        assert!(!field(Some("_")).is_protectable());
        assert!(!field(None).is_protectable());
    }
}
