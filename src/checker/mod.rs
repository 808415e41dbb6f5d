//! Checker pipeline
//!
//! This module contains:
//! - `resolver`: Directive → validated `ProtectedBinding`
//! - `collector`: Every access to a protected field → `Usage`
//! - `verifier`: Per-usage lock-discipline check
//!
//! Stages run data-parallel over compilation units (resolver, collector)
//! and usages (verifier). Each worker fills its own buffer and the buffers
//! are merged and sorted at the end, so the report does not depend on the
//! worker count or on file order.

pub mod collector;
pub mod resolver;
pub mod verifier;

pub use collector::{collect_unit, Usage};
pub use resolver::{has_lock_capability, resolve_unit, BindingKey, BindingSet, ProtectedBinding};
pub use verifier::verify_usage;

use crate::config::Config;
use crate::error::Finding;
use crate::model::Program;
use crate::report::{Diagnostic, Report, Stats};
use tracing::{debug, info};

/// Run the whole pipeline over a program.
pub fn check(program: &Program, config: &Config) -> Report {
    let mut diagnostics = Vec::new();

    // Resolve directives, one unit per task.
    let resolved = par_map(&program.units, config.jobs, |_, unit| {
        debug!(unit = %unit.path.display(), "resolving protection directives");
        resolve_unit(unit, &program.types, config)
    });
    let mut bindings = BindingSet::new();
    for (unit_bindings, unit_diagnostics) in resolved {
        bindings.extend(unit_bindings);
        diagnostics.extend(unit_diagnostics);
    }

    // Collect accesses to protected fields.
    let collected = if bindings.is_empty() {
        debug!("no protected fields, skipping access collection");
        Vec::new()
    } else {
        par_map(&program.units, config.jobs, |index, unit| collect_unit(index, unit, &bindings))
    };
    let mut usages = Vec::new();
    for (unit_usages, unit_diagnostics) in collected {
        usages.extend(unit_usages);
        diagnostics.extend(unit_diagnostics);
    }

    // Verify each usage independently.
    let verified = par_map(&usages, config.jobs, |_, usage| {
        let unit = &program.units[usage.unit];
        let binding = bindings.get(&usage.binding)?;
        let function = unit.functions.get(usage.function)?;
        verify_usage(usage, binding, &function.body, config)
            .err()
            .map(|e| Diagnostic::new(&unit.path, usage.pos, &Finding::from(e)))
    });
    diagnostics.extend(verified.into_iter().flatten());

    diagnostics.sort();

    let stats = Stats {
        units: program.units.len(),
        bindings: bindings.len(),
        usages: usages.len(),
    };
    info!(
        units = stats.units,
        bindings = stats.bindings,
        usages = stats.usages,
        diagnostics = diagnostics.len(),
        "protection check finished"
    );

    Report { diagnostics, stats }
}

/// Map `f` over `items` on up to `jobs` scoped threads, preserving order.
fn par_map<T, R, F>(items: &[T], jobs: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    if jobs <= 1 || items.len() <= 1 {
        return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
    }

    let chunk_size = items.len().div_ceil(jobs);
    std::thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(i, item)| f(chunk_index * chunk_size + i, item))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_source;

    const PRELUDE: &str = r#"
        struct RawLock;
        impl RawLock {
            pub fn lock(&self) {}
            pub fn unlock(&self) {}
        }

        struct R {
            /// i is protected by mu.
            i: i32,
            mu: RawLock,
        }

        fn use_value(_: i32) {}
    "#;

    fn run_with(body: &str, config: &Config) -> Vec<String> {
        let src = format!("{}\n{}", PRELUDE, body);
        let program = parse_source("lib.rs", &src).unwrap();
        check(&program, config)
            .diagnostics
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn run(body: &str) -> Vec<String> {
        run_with(body, &Config::new())
    }

    #[test]
    fn test_unguarded_read() {
        let messages = run("fn f(r: &R) { use_value(r.i); }");
        assert_eq!(messages, vec!["not protected access to shared field i, use r.mu.lock()".to_string()]);
    }

    #[test]
    fn test_guarded_with_deferred_unlock() {
        let messages = run(
            r#"
            fn f(r: &R) {
                r.mu.lock();
                defer! { r.mu.unlock(); }
                use_value(r.i);
            }
            "#,
        );
        assert!(messages.is_empty(), "{:?}", messages);
    }

    #[test]
    fn test_independent_instances() {
        let messages = run(
            r#"
            fn f() {
                let mut p1 = R { i: 0, mu: RawLock };
                let mut p2 = R { i: 0, mu: RawLock };
                p1.mu.lock();
                p2.i = 1;
            }
            "#,
        );
        assert_eq!(messages, vec!["not protected access to shared field i, use p2.mu.lock()".to_string()]);
    }

    #[test]
    fn test_premature_unlock() {
        let messages = run(
            r#"
            fn f(r: &mut R) {
                r.mu.lock();
                r.mu.unlock();
                r.i = 1;
            }
            "#,
        );
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_access_in_defer_locked_in_same_defer() {
        let messages = run(
            r#"
            fn f(r: &mut R) {
                defer! {
                    r.mu.lock();
                    r.i = 1;
                }
            }
            "#,
        );
        assert!(messages.is_empty(), "{:?}", messages);
    }

    #[test]
    fn test_access_in_defer_with_deferred_unlock() {
        let messages = run(
            r#"
            fn f(r: &mut R) {
                r.mu.lock();
                defer! { r.i = 1; }
                defer! { r.mu.unlock(); }
            }
            "#,
        );
        assert!(messages.is_empty(), "{:?}", messages);
    }

    #[test]
    fn test_dereferenced_instance() {
        let messages = run(
            r#"
            fn unguarded(r: &mut R) {
                (*r).i = 1;
            }
            fn guarded(r: &mut R) {
                (*r).mu.lock();
                r.i = 2;
                use_value((*r).i);
            }
            "#,
        );
        assert_eq!(messages, vec!["not protected access to shared field i, use r.mu.lock()".to_string()]);
    }

    #[test]
    fn test_every_usage_reported() {
        let messages = run(
            r#"
            fn f(r: &mut R) {
                r.i = 1;
                use_value(r.i);
            }
            "#,
        );
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_usages_at_same_position_are_all_reported() {
        let src = format!("{}\nfn f(r: &mut R) {{ r.i = 1; }}", PRELUDE);
        let mut program = parse_source("lib.rs", &src).unwrap();
        let function = program.units[0]
            .functions
            .iter_mut()
            .find(|f| f.name == "f")
            .unwrap();
        let access = function.body.stmts[0].clone();
        function.body.stmts.push(access);

        let report = check(&program, &Config::new());
        assert_eq!(report.stats.usages, 2);
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0], report.diagnostics[1]);
    }

    #[test]
    fn test_idempotent_and_parallel_runs_agree() {
        let body = r#"
            fn a(r: &mut R) { r.i = 1; }
            fn b(r: &mut R) { r.mu.lock(); r.i = 2; }
            fn c(r: &mut R) { r.mu.lock(); r.mu.unlock(); r.i = 3; }
            fn d(r: &mut R) { r.i = 4; r.mu.lock(); }
        "#;
        let first = run(body);
        let second = run(body);
        let parallel = run_with(body, &Config::new().with_jobs(4));
        assert_eq!(first, second);
        assert_eq!(first, parallel);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_resolution_failure_does_not_stop_checking() {
        let src = r#"
            struct RawLock;
            impl RawLock {
                fn lock(&self) {}
                fn unlock(&self) {}
            }
            struct Broken {
                /// protected by nothing
                x: i32,
                mu: RawLock,
            }
            struct Good {
                /// protected by mu
                y: i32,
                mu: RawLock,
            }
            fn f(b: &mut Broken, g: &mut Good) {
                b.x = 1;
                g.y = 2;
            }
        "#;
        let program = parse_source("lib.rs", src).unwrap();
        let report = check(&program, &Config::new());
        let rules: Vec<_> = report.diagnostics.iter().map(|d| d.rule).collect();
        assert_eq!(rules, vec!["lock-field-not-found", "unprotected-access"]);
        assert_eq!(report.stats.bindings, 1);
        assert_eq!(report.stats.usages, 1);
    }

    #[test]
    fn test_par_map_preserves_order() {
        let items: Vec<usize> = (0..37).collect();
        let doubled = par_map(&items, 5, |i, x| {
            assert_eq!(i, *x);
            x * 2
        });
        assert_eq!(doubled, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }
}
