//! Program-wide declarations
//!
//! Named types, method sets, type aliases, field types and associated
//! constructors, collected from every file before any function body is
//! lowered. Rust items are order independent, so a body may refer to a
//! type declared later or in another file.

use super::pos;
use crate::model::{MethodSig, Pos, TypeId, TypeKind, TypeRef, TypeTable};
use quote::ToTokens;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;

/// Smart pointers treated as one level of pointer indirection.
pub const POINTER_WRAPPERS: &[&str] = &["Box", "Rc", "Arc"];

const MAX_ALIAS_DEPTH: usize = 16;

/// What `Self` and the type parameters in scope stand for where a type
/// is written.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeContext {
    pub self_ty: Option<TypeRef>,
    /// Type parameters, resolved to their first known trait bound.
    pub params: HashMap<String, TypeRef>,
}

impl TypeContext {
    pub fn with_self(self_ty: TypeRef) -> Self {
        TypeContext {
            self_ty: Some(self_ty),
            params: HashMap::new(),
        }
    }
}

/// One declaration of a name, with the module it lives in.
#[derive(Debug, Clone)]
struct Declared<T> {
    file: usize,
    /// Module path inside the crate: file module, then inline modules.
    module: Vec<String>,
    item: T,
}

/// Names brought into a file by `use` items.
#[derive(Debug, Clone, Default)]
struct Imports {
    /// Local name to full imported path, original name last.
    names: HashMap<String, Vec<String>>,
    /// Module paths of glob imports.
    globs: Vec<Vec<String>>,
}

pub(crate) struct Declarations {
    types: TypeTable,
    names: HashMap<String, Vec<Declared<TypeId>>>,
    aliases: HashMap<String, Vec<Declared<syn::Type>>>,
    imports: Vec<Imports>,
    /// Declared types by file and name position.
    declared: HashMap<(usize, Pos), TypeId>,
    field_types: HashMap<TypeId, HashMap<String, TypeRef>>,
    /// Return types of receiver-less associated functions.
    constructors: HashMap<(TypeId, String), TypeRef>,
}

impl Declarations {
    pub fn collect(files: &[(PathBuf, syn::File)]) -> Self {
        let mut decls = Declarations {
            types: TypeTable::new(),
            names: HashMap::new(),
            aliases: HashMap::new(),
            imports: vec![Imports::default(); files.len()],
            declared: HashMap::new(),
            field_types: HashMap::new(),
            constructors: HashMap::new(),
        };

        for (file, (path, ast)) in files.iter().enumerate() {
            let mut module = file_module(path);
            decls.declare_items(file, &mut module, &ast.items);
        }
        // Trait methods first: trait impls inherit them.
        for (file, (_, ast)) in files.iter().enumerate() {
            for_each_item(&ast.items, &mut |item| {
                if let syn::Item::Trait(t) = item {
                    decls.define_trait(file, t);
                }
            });
        }
        for (file, (_, ast)) in files.iter().enumerate() {
            for_each_item(&ast.items, &mut |item| match item {
                syn::Item::Struct(s) => decls.define_struct(file, s),
                syn::Item::Impl(imp) => decls.define_impl(file, imp),
                _ => {}
            });
        }

        decls
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn into_types(self) -> TypeTable {
        self.types
    }

    /// The type registered for the struct, enum or trait named by `ident`.
    pub fn declared_type(&self, file: usize, ident: &syn::Ident) -> Option<TypeId> {
        self.declared.get(&(file, pos(ident.span()))).copied()
    }

    /// The type `name` refers to in `file`, or `None` when it is unknown or
    /// ambiguous.
    pub fn lookup_name(&self, file: usize, name: &str) -> Option<TypeId> {
        self.lookup(&self.names, file, name).copied()
    }

    pub fn field_type(&self, record: TypeId, field: &str) -> Option<&TypeRef> {
        self.field_types.get(&record)?.get(field)
    }

    pub fn constructor(&self, owner: TypeId, name: &str) -> Option<&TypeRef> {
        self.constructors.get(&(owner, name.to_string()))
    }

    /// Resolve a syntactic type as seen from `file`.
    pub fn resolve_type(&self, file: usize, ty: &syn::Type, ctx: &TypeContext) -> TypeRef {
        self.resolve_type_at(file, ty, ctx, 0)
    }

    /// Extend `outer` with the type parameters declared by `generics`.
    ///
    /// A parameter stands for its first known trait bound, from its own
    /// bounds or from the where clause. Parameters without one resolve to
    /// `Unknown` so they never fall through to a type of the same name.
    pub fn with_generics(&self, file: usize, outer: &TypeContext, generics: &syn::Generics) -> TypeContext {
        let mut ctx = outer.clone();
        for param in generics.type_params() {
            let bound = self.resolve_bounds(file, &param.bounds);
            ctx.params.insert(param.ident.unraw().to_string(), bound);
        }
        let predicates = generics.where_clause.iter().flat_map(|clause| clause.predicates.iter());
        for predicate in predicates {
            let syn::WherePredicate::Type(predicate) = predicate else {
                continue;
            };
            let syn::Type::Path(bounded) = &predicate.bounded_ty else {
                continue;
            };
            let Some(ident) = bounded.path.get_ident() else {
                continue;
            };
            if let Some(slot) = ctx.params.get_mut(&ident.unraw().to_string()) {
                if *slot == TypeRef::Unknown {
                    *slot = self.resolve_bounds(file, &predicate.bounds);
                }
            }
        }
        ctx
    }

    fn resolve_type_at(&self, file: usize, ty: &syn::Type, ctx: &TypeContext, depth: usize) -> TypeRef {
        match ty {
            syn::Type::Reference(r) => TypeRef::pointer_to(self.resolve_type_at(file, &r.elem, ctx, depth)),
            syn::Type::Ptr(p) => TypeRef::pointer_to(self.resolve_type_at(file, &p.elem, ctx, depth)),
            syn::Type::Paren(p) => self.resolve_type_at(file, &p.elem, ctx, depth),
            syn::Type::Group(g) => self.resolve_type_at(file, &g.elem, ctx, depth),
            syn::Type::TraitObject(t) => self.resolve_bounds(file, &t.bounds),
            syn::Type::ImplTrait(t) => self.resolve_bounds(file, &t.bounds),
            syn::Type::Path(p) if p.qself.is_none() => self.resolve_path(file, &p.path, ctx, depth),
            other => TypeRef::Other(other.to_token_stream().to_string()),
        }
    }

    fn resolve_path(&self, file: usize, path: &syn::Path, ctx: &TypeContext, depth: usize) -> TypeRef {
        let Some(last) = path.segments.last() else {
            return TypeRef::Unknown;
        };
        let name = last.ident.unraw().to_string();

        if name == "Self" {
            return ctx.self_ty.clone().unwrap_or(TypeRef::Unknown);
        }
        if path.get_ident().is_some() {
            if let Some(param) = ctx.params.get(&name) {
                return param.clone();
            }
        }
        if POINTER_WRAPPERS.contains(&name.as_str()) {
            if let Some(inner) = first_type_argument(&last.arguments) {
                return TypeRef::pointer_to(self.resolve_type_at(file, inner, ctx, depth));
            }
        }
        if let Some(id) = self.lookup_name(file, &name) {
            return TypeRef::Named(id);
        }
        if let Some(alias) = self.lookup_declared(&self.aliases, file, &name) {
            if depth >= MAX_ALIAS_DEPTH {
                return TypeRef::Unknown;
            }
            return self.resolve_type_at(alias.file, &alias.item, ctx, depth + 1);
        }
        TypeRef::Other(path.to_token_stream().to_string())
    }

    /// A trait object resolves to its first known trait bound.
    fn resolve_bounds(&self, file: usize, bounds: &Punctuated<syn::TypeParamBound, syn::Token![+]>) -> TypeRef {
        bounds
            .iter()
            .find_map(|bound| match bound {
                syn::TypeParamBound::Trait(t) => t
                    .path
                    .segments
                    .last()
                    .and_then(|segment| self.lookup_name(file, &segment.ident.to_string())),
                _ => None,
            })
            .map(TypeRef::Named)
            .unwrap_or(TypeRef::Unknown)
    }

    fn lookup<'t, T>(&self, table: &'t HashMap<String, Vec<Declared<T>>>, file: usize, name: &str) -> Option<&'t T> {
        self.lookup_declared(table, file, name).map(|declared| &declared.item)
    }

    /// Pick the declaration `name` refers to in `file`:
    /// 1. An explicit `use` of the name decides
    /// 2. Otherwise a declaration in the file itself
    /// 3. Otherwise the only declaration in the program
    /// 4. Otherwise the only one reachable through a glob import
    fn lookup_declared<'t, T>(
        &self,
        table: &'t HashMap<String, Vec<Declared<T>>>,
        file: usize,
        name: &str,
    ) -> Option<&'t Declared<T>> {
        let imports = self.imports.get(file);

        if let Some((target, parent)) = imports
            .and_then(|imports| imports.names.get(name))
            .and_then(|path| path.split_last())
        {
            let candidates = table.get(target)?;
            if let Some(declared) = unique(candidates.iter().filter(|c| module_matches(&c.module, parent))) {
                return Some(declared);
            }
            if target != name {
                return None;
            }
        }

        let candidates = table.get(name)?;
        if let Some(local) = candidates.iter().find(|c| c.file == file) {
            return Some(local);
        }
        if let [only] = candidates.as_slice() {
            return Some(only);
        }
        let globs = imports.map(|imports| imports.globs.as_slice()).unwrap_or_default();
        unique(
            candidates
                .iter()
                .filter(|c| globs.iter().any(|glob| module_matches(&c.module, glob))),
        )
    }

    fn declare_items(&mut self, file: usize, module: &mut Vec<String>, items: &[syn::Item]) {
        for item in items {
            match item {
                syn::Item::Struct(s) => self.declare_type(file, module, &s.ident, TypeKind::Record),
                syn::Item::Enum(e) => self.declare_type(file, module, &e.ident, TypeKind::Other),
                syn::Item::Union(u) => self.declare_type(file, module, &u.ident, TypeKind::Other),
                syn::Item::Trait(t) => self.declare_type(file, module, &t.ident, TypeKind::Interface),
                syn::Item::Type(t) => {
                    self.aliases.entry(t.ident.unraw().to_string()).or_default().push(Declared {
                        file,
                        module: module.clone(),
                        item: (*t.ty).clone(),
                    });
                }
                syn::Item::Use(u) => {
                    if let Some(imports) = self.imports.get_mut(file) {
                        collect_imports(&u.tree, &mut Vec::new(), imports);
                    }
                }
                syn::Item::Mod(m) => {
                    if let Some((_, content)) = &m.content {
                        module.push(m.ident.unraw().to_string());
                        self.declare_items(file, module, content);
                        module.pop();
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_type(&mut self, file: usize, module: &[String], ident: &syn::Ident, kind: TypeKind) {
        let name = ident.unraw().to_string();
        let id = self.types.insert(name.clone(), kind);
        self.names.entry(name).or_default().push(Declared {
            file,
            module: module.to_vec(),
            item: id,
        });
        self.declared.insert((file, pos(ident.span())), id);
    }

    fn define_trait(&mut self, file: usize, item: &syn::ItemTrait) {
        let Some(id) = self.declared_type(file, &item.ident) else {
            return;
        };
        for trait_item in &item.items {
            if let syn::TraitItem::Fn(f) = trait_item {
                if let Some(method) = method_sig(&f.sig) {
                    self.types.add_method(id, method);
                }
            }
        }
    }

    fn define_struct(&mut self, file: usize, item: &syn::ItemStruct) {
        let Some(id) = self.declared_type(file, &item.ident) else {
            return;
        };
        let ctx = self.with_generics(file, &TypeContext::with_self(TypeRef::Named(id)), &item.generics);
        let fields = item
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let name = field
                    .ident
                    .as_ref()
                    .map(|ident| ident.unraw().to_string())
                    .unwrap_or_else(|| index.to_string());
                (name, self.resolve_type(file, &field.ty, &ctx))
            })
            .collect();
        self.field_types.insert(id, fields);
    }

    fn define_impl(&mut self, file: usize, item: &syn::ItemImpl) {
        let generics = self.with_generics(file, &TypeContext::default(), &item.generics);
        let Some(id) = self.resolve_type(file, &item.self_ty, &generics).named() else {
            return;
        };
        let self_ty = TypeRef::Named(id);
        let ctx = TypeContext {
            self_ty: Some(self_ty.clone()),
            ..generics
        };

        for impl_item in &item.items {
            let syn::ImplItem::Fn(f) = impl_item else {
                continue;
            };
            match method_sig(&f.sig) {
                Some(method) => self.types.add_method(id, method),
                None => {
                    if let syn::ReturnType::Type(_, ret) = &f.sig.output {
                        let fn_ctx = self.with_generics(file, &ctx, &f.sig.generics);
                        let ret = self.resolve_type(file, ret, &fn_ctx);
                        self.constructors.insert((id, f.sig.ident.to_string()), ret);
                    }
                }
            }
        }

        // Provided methods of the implemented trait.
        let Some((_, trait_path, _)) = &item.trait_ else {
            return;
        };
        let Some(trait_id) = trait_path
            .segments
            .last()
            .and_then(|segment| self.lookup_name(file, &segment.ident.to_string()))
        else {
            return;
        };
        let inherited = self.types.get(trait_id).map(|t| t.methods.clone()).unwrap_or_default();
        for method in inherited {
            if self.types.lookup_method(&self_ty, &method.name).is_none() {
                self.types.add_method(id, method);
            }
        }
    }
}

/// The single element of `iter`, if it has exactly one.
fn unique<I: Iterator>(mut iter: I) -> Option<I::Item> {
    let first = iter.next()?;
    iter.next().is_none().then_some(first)
}

/// Module of a source file: its stem, the directory name for `mod.rs`,
/// the crate root for `lib.rs` and `main.rs`.
fn file_module(path: &Path) -> Vec<String> {
    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
    let name = match stem {
        "lib" | "main" => return Vec::new(),
        "mod" => path
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|dir| dir.to_str())
            .unwrap_or_default(),
        other => other,
    };
    vec![name.to_string()]
}

/// Whether a declaration in `module` is what an import path with parent
/// `parent` points at. Leading `crate`/`self`/`super` segments are ignored,
/// so the parent is compared by its trailing module names.
fn module_matches(module: &[String], parent: &[String]) -> bool {
    let parent: Vec<_> = parent
        .iter()
        .filter(|segment| !matches!(segment.as_str(), "crate" | "self" | "super"))
        .collect();
    if module.is_empty() {
        return parent.is_empty();
    }
    parent.len() >= module.len() && parent[parent.len() - module.len()..].iter().zip(module).all(|(a, b)| *a == b)
}

fn collect_imports(tree: &syn::UseTree, prefix: &mut Vec<String>, imports: &mut Imports) {
    match tree {
        syn::UseTree::Path(p) => {
            prefix.push(p.ident.unraw().to_string());
            collect_imports(&p.tree, prefix, imports);
            prefix.pop();
        }
        syn::UseTree::Name(n) => {
            let name = n.ident.unraw().to_string();
            let mut path = prefix.clone();
            path.push(name.clone());
            imports.names.insert(name, path);
        }
        syn::UseTree::Rename(r) => {
            let mut path = prefix.clone();
            path.push(r.ident.unraw().to_string());
            imports.names.insert(r.rename.unraw().to_string(), path);
        }
        syn::UseTree::Glob(_) => imports.globs.push(prefix.clone()),
        syn::UseTree::Group(g) => {
            for item in &g.items {
                collect_imports(item, prefix, imports);
            }
        }
    }
}

/// Visit items, descending into inline modules.
pub(crate) fn for_each_item<'a, F>(items: &'a [syn::Item], f: &mut F)
where
    F: FnMut(&'a syn::Item),
{
    for item in items {
        if let syn::Item::Mod(module) = item {
            if let Some((_, content)) = &module.content {
                for_each_item(content, f);
            }
        }
        f(item);
    }
}

/// Method shape of a function with a receiver; `None` for associated functions.
fn method_sig(sig: &syn::Signature) -> Option<MethodSig> {
    let receiver = sig.receiver()?;
    Some(MethodSig::new(
        sig.ident.to_string(),
        sig.inputs.len().saturating_sub(1),
        is_indirection(&receiver.ty),
    ))
}

fn is_indirection(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Reference(_) | syn::Type::Ptr(_) => true,
        syn::Type::Path(p) => p
            .path
            .segments
            .last()
            .is_some_and(|segment| POINTER_WRAPPERS.contains(&segment.ident.to_string().as_str())),
        _ => false,
    }
}

fn first_type_argument(arguments: &syn::PathArguments) -> Option<&syn::Type> {
    let syn::PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}
