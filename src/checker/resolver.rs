//! Protection resolver
//!
//! Turns every field carrying a "protected by" directive into a
//! [`ProtectedBinding`], or into a diagnostic explaining why it cannot be
//! enforced. Checks run in order and stop at the first failure of a field
//! so that one mistake does not cascade into several reports:
//! 1. The field lives inside a struct
//! 2. The protected field is not exported
//! 3. The lock field exists in the same struct
//! 4. The lock field is not exported
//! 5. The lock field's type provides the lock operations

use crate::config::Config;
use crate::error::{Finding, ResolutionError};
use crate::model::{CompilationUnit, FieldDecl, FieldIndex, Pos, TypeId, TypeRef, TypeTable, Visibility};
use crate::parser::directive::{mentions_protection, parse_lock_name, LockName};
use crate::report::Diagnostic;
use std::collections::HashMap;
use tracing::debug;

/// Identity of a protected field: its record and its position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingKey {
    pub record: TypeId,
    pub field: FieldIndex,
}

/// A validated pairing of a protected field with its lock field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedBinding {
    pub key: BindingKey,
    pub record_name: String,
    pub field_name: String,
    pub lock: FieldIndex,
    pub lock_name: String,
}

/// All bindings of a program, keyed by record and field.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: HashMap<BindingKey, ProtectedBinding>,
    by_name: HashMap<TypeId, HashMap<String, BindingKey>>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, binding: ProtectedBinding) {
        self.by_name
            .entry(binding.key.record)
            .or_default()
            .insert(binding.field_name.clone(), binding.key);
        self.bindings.insert(binding.key, binding);
    }

    pub fn get(&self, key: &BindingKey) -> Option<&ProtectedBinding> {
        self.bindings.get(key)
    }

    /// The binding for field `field` of record `record`, if that field is protected.
    pub fn lookup(&self, record: TypeId, field: &str) -> Option<&ProtectedBinding> {
        let key = self.by_name.get(&record)?.get(field)?;
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Extend<ProtectedBinding> for BindingSet {
    fn extend<I: IntoIterator<Item = ProtectedBinding>>(&mut self, iter: I) {
        for binding in iter {
            self.insert(binding);
        }
    }
}

impl FromIterator<ProtectedBinding> for BindingSet {
    fn from_iter<I: IntoIterator<Item = ProtectedBinding>>(iter: I) -> Self {
        let mut set = BindingSet::new();
        set.extend(iter);
        set
    }
}

/// Resolve every directive declared in one compilation unit.
pub fn resolve_unit(
    unit: &CompilationUnit,
    types: &TypeTable,
    config: &Config,
) -> (Vec<ProtectedBinding>, Vec<Diagnostic>) {
    let mut bindings = Vec::new();
    let mut diagnostics = Vec::new();

    for field in unit.all_fields() {
        // Embedded and blank fields are never protectable.
        if !field.is_protectable() {
            continue;
        }
        let Some(docs) = field.docs.as_deref().filter(|d| mentions_protection(d)) else {
            continue;
        };

        let lock_name = match parse_lock_name(docs, config) {
            Ok(name) => name,
            Err(e) => {
                diagnostics.push(Diagnostic::new(&unit.path, field.pos, &Finding::from(e)));
                continue;
            }
        };

        match resolve_field(unit, field, &lock_name, types, config) {
            Ok(binding) => {
                debug!(
                    record = %binding.record_name,
                    field = %binding.field_name,
                    lock = %binding.lock_name,
                    "resolved protected field"
                );
                bindings.push(binding);
            }
            Err((pos, e)) => {
                diagnostics.push(Diagnostic::new(&unit.path, pos, &Finding::from(e)));
            }
        }
    }

    (bindings, diagnostics)
}

/// Validate one directive. Errors carry the position to report them at.
fn resolve_field(
    unit: &CompilationUnit,
    field: &FieldDecl,
    lock_name: &LockName,
    types: &TypeTable,
    config: &Config,
) -> Result<ProtectedBinding, (Pos, ResolutionError)> {
    let field_name = field.name.clone().unwrap_or_default();

    let located = unit.enclosing_record(&field.span).and_then(|record| {
        record
            .fields
            .iter()
            .position(|f| std::ptr::eq(f, field))
            .map(|index| (record, FieldIndex(index)))
    });
    let Some((record, index)) = located else {
        return Err((field.pos, ResolutionError::NoEnclosingRecord { field: field_name }));
    };

    if field.visibility == Visibility::Exported {
        return Err((
            field.pos,
            ResolutionError::ExportedProtectedField {
                record: record.name.clone(),
                field: field_name,
            },
        ));
    }

    let found = lock_name
        .candidates()
        .find_map(|candidate| record.field_by_name(candidate).map(|(index, lock)| (candidate, index, lock)));
    let Some((lock_name, lock_index, lock)) = found else {
        return Err((
            field.pos,
            ResolutionError::LockFieldNotFound {
                record: record.name.clone(),
                lock: lock_name.identifier.clone(),
            },
        ));
    };

    if lock.visibility == Visibility::Exported {
        return Err((
            lock.pos,
            ResolutionError::ExportedLockField {
                record: record.name.clone(),
                lock: lock_name.to_string(),
            },
        ));
    }

    if !has_lock_capability(types, &lock.ty, config) {
        return Err((
            lock.pos,
            ResolutionError::NotALocker {
                lock: lock_name.to_string(),
                acquire: config.acquire.clone(),
                release: config.release.clone(),
            },
        ));
    }

    Ok(ProtectedBinding {
        key: BindingKey {
            record: record.id,
            field: index,
        },
        record_name: record.name.clone(),
        field_name,
        lock: lock_index,
        lock_name: lock_name.to_string(),
    })
}

/// Whether `ty`, or a pointer to it, exposes zero-argument acquire and release.
pub fn has_lock_capability(types: &TypeTable, ty: &TypeRef, config: &Config) -> bool {
    let candidates = [ty.clone(), TypeRef::pointer_to(ty.clone())];
    candidates.iter().any(|candidate| {
        let methods = types.method_set(candidate);
        let provides = |name: &str| methods.iter().any(|m| m.name == name && m.params == 0);
        provides(&config.acquire) && provides(&config.release)
    })
}
