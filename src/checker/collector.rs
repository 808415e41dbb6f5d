//! Usage collector
//!
//! Finds every `instance.field` access whose field is protected. An access
//! qualifies when the receiver's type, after stripping pointers, is the
//! record that declares the protected field and the receiver resolves to
//! an object identity.
//!
//! Receivers without an identity of their own (`outer.inner.field`,
//! `make().field`, ...) are not tracked.

use super::resolver::{BindingKey, BindingSet};
use crate::error::{CollectionError, Finding};
use crate::model::visit::{walk_expr, Visit};
use crate::model::{CompilationUnit, DeferId, Expr, ExprKind, ObjectId, Pos};
use crate::report::Diagnostic;

/// One access to a protected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub binding: BindingKey,
    /// Index of the compilation unit the access appears in.
    pub unit: usize,
    /// Index of the enclosing function in that unit.
    pub function: usize,
    pub instance: ObjectId,
    /// Receiver name as written, for messages.
    pub instance_name: String,
    pub pos: Pos,
    pub defer: Option<DeferId>,
}

/// Collect every protected-field access of one compilation unit.
pub fn collect_unit(unit_index: usize, unit: &CompilationUnit, bindings: &BindingSet) -> (Vec<Usage>, Vec<Diagnostic>) {
    let mut collector = UsageCollector {
        unit_index,
        unit,
        bindings,
        usages: Vec::new(),
        diagnostics: Vec::new(),
    };

    for function in &unit.functions {
        collector.visit_block(&function.body);
    }
    for global in &unit.globals {
        if let Some(init) = &global.init {
            collector.visit_expr(init);
        }
    }

    (collector.usages, collector.diagnostics)
}

struct UsageCollector<'a> {
    unit_index: usize,
    unit: &'a CompilationUnit,
    bindings: &'a BindingSet,
    usages: Vec<Usage>,
    diagnostics: Vec<Diagnostic>,
}

impl UsageCollector<'_> {
    fn record_access(&mut self, expr: &Expr, base: &Expr, field: &str) {
        let Some(record) = base.ty.named() else {
            return;
        };
        let Some(binding) = self.bindings.lookup(record, field) else {
            return;
        };
        let Some(instance) = base.object() else {
            return;
        };
        let instance_name = base.ident_name().unwrap_or_default().to_string();

        let Some(function) = self.unit.enclosing_function(&expr.span) else {
            let finding = Finding::from(CollectionError::NoEnclosingFunction {
                field: field.to_string(),
                instance: instance_name,
            });
            self.diagnostics.push(Diagnostic::new(&self.unit.path, expr.pos(), &finding));
            return;
        };

        self.usages.push(Usage {
            binding: binding.key,
            unit: self.unit_index,
            function,
            instance,
            instance_name,
            pos: expr.pos(),
            defer: expr.defer,
        });
    }
}

impl<'ast> Visit<'ast> for UsageCollector<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let ExprKind::Field { base, name } = &expr.kind {
            self.record_access(expr, base, name);
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::resolver::resolve_unit;
    use crate::config::Config;
    use crate::frontend::parse_source;

    fn collect(src: &str) -> (Vec<Usage>, Vec<String>) {
        let program = parse_source("lib.rs", src).unwrap();
        let unit = &program.units[0];
        let (bindings, _) = resolve_unit(unit, &program.types, &Config::new());
        let bindings: BindingSet = bindings.into_iter().collect();
        let (usages, diagnostics) = collect_unit(0, unit, &bindings);
        (usages, diagnostics.into_iter().map(|d| d.message).collect())
    }

    const PRELUDE: &str = r#"
        struct RawLock;
        impl RawLock {
            fn lock(&self) {}
            fn unlock(&self) {}
        }
        struct R {
            /// protected by mu
            i: i32,
            j: i32,
            mu: RawLock,
        }
        struct Other {
            i: i32,
        }
    "#;

    #[test]
    fn test_only_protected_fields_of_the_record_are_collected() {
        let src = format!(
            "{}\nfn f(r: &mut R, o: &mut Other) {{\n    r.i = 1;\n    r.j = 2;\n    o.i = 3;\n}}",
            PRELUDE
        );
        let (usages, messages) = collect(&src);
        assert!(messages.is_empty());
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].instance_name, "r");
        assert_eq!(usages[0].binding.field, crate::model::FieldIndex(0));
        assert_eq!(usages[0].defer, None);
    }

    #[test]
    fn test_usage_records_function_and_defer() {
        let src = format!(
            "{}\nfn a() {{}}\nfn b(r: &mut R) {{\n    defer! {{ r.i = 1; }}\n}}",
            PRELUDE
        );
        let (usages, _) = collect(&src);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].function, 1);
        assert!(usages[0].defer.is_some());
    }

    #[test]
    fn test_dereferenced_receiver_keeps_identity() {
        let src = format!("{}\nfn f(r: &mut R) {{\n    (*r).i = 1;\n    r.i = 2;\n}}", PRELUDE);
        let (usages, messages) = collect(&src);
        assert!(messages.is_empty());
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].instance, usages[1].instance);
        assert_eq!(usages[0].instance_name, "r");
    }

    #[test]
    fn test_receiver_without_identity_is_skipped() {
        let src = format!(
            "{}\nfn make() -> R {{ todo!() }}\nfn f() {{\n    make().i;\n}}",
            PRELUDE
        );
        let (usages, messages) = collect(&src);
        assert!(usages.is_empty());
        assert!(messages.is_empty());
    }

    #[test]
    fn test_package_level_access() {
        let src = format!(
            "{}\nstatic SHARED: R = R {{ i: 0, j: 0, mu: RawLock }};\nconst COPY: i32 = SHARED.i;",
            PRELUDE
        );
        let (usages, messages) = collect(&src);
        assert!(usages.is_empty());
        assert_eq!(
            messages,
            vec!["protected field i of SHARED is accessed outside of a function".to_string()]
        );
    }
}
