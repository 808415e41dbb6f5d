//! Lock-discipline verifier
//!
//! For one usage, searches the enclosing function body (nested blocks and
//! closures included) for lock calls on the same instance and decides
//! whether the access is guarded.
//!
//! Ordering is textual: there is no control-flow graph. A lock taken in
//! one branch of an `if` still counts for an access after the `if`.
//!
//! Deferred blocks run when the function returns, so their position says
//! nothing about ordering relative to the rest of the body:
//! - an acquire inside a deferred block only counts for accesses in that
//!   same block
//! - a release only cancels the acquire when it sits in the same deferred
//!   block as the access (or both are outside any deferred block)

use super::collector::Usage;
use super::resolver::ProtectedBinding;
use crate::config::Config;
use crate::error::DisciplineError;
use crate::model::visit::{walk_expr, Visit};
use crate::model::{Block, DeferId, Expr, ExprKind, ObjectId, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockOp {
    Acquire,
    Release,
}

/// A lock or unlock call on the instance under test.
#[derive(Debug, Clone, Copy)]
struct LockCall {
    op: LockOp,
    pos: Pos,
    defer: Option<DeferId>,
}

/// Check that `usage` is preceded by an acquire of its lock and that the
/// lock was not released again before the access.
pub fn verify_usage(
    usage: &Usage,
    binding: &ProtectedBinding,
    body: &Block,
    config: &Config,
) -> Result<(), DisciplineError> {
    let calls = find_lock_calls(body, usage.instance, &binding.lock_name, config);

    let acquire = calls
        .iter()
        .filter(|c| c.op == LockOp::Acquire)
        .filter(|c| c.defer.is_none() || c.defer == usage.defer)
        .filter(|c| c.pos > body.open && c.pos < usage.pos)
        .max_by_key(|c| c.pos);

    let guarded = match acquire {
        None => false,
        Some(acquire) => !calls.iter().any(|c| {
            c.op == LockOp::Release
                && c.defer == usage.defer
                && c.pos > acquire.pos
                && c.pos < usage.pos
        }),
    };

    if guarded {
        Ok(())
    } else {
        Err(DisciplineError::UnprotectedAccess {
            field: binding.field_name.clone(),
            instance: usage.instance_name.clone(),
            lock: binding.lock_name.clone(),
            acquire: config.acquire.clone(),
        })
    }
}

fn find_lock_calls(body: &Block, instance: ObjectId, lock: &str, config: &Config) -> Vec<LockCall> {
    let mut finder = LockCallFinder {
        instance,
        lock,
        config,
        calls: Vec::new(),
    };
    finder.visit_block(body);
    finder.calls
}

struct LockCallFinder<'a> {
    instance: ObjectId,
    lock: &'a str,
    config: &'a Config,
    calls: Vec<LockCall>,
}

impl LockCallFinder<'_> {
    /// `instance.lock.method()` with the method resolved to a zero-argument operation.
    fn classify(&self, expr: &Expr) -> Option<LockOp> {
        let ExprKind::MethodCall {
            receiver,
            method,
            args,
            target,
        } = &expr.kind
        else {
            return None;
        };
        if !args.is_empty() {
            return None;
        }
        let target = target.as_ref().filter(|t| t.params == 0 && &t.name == method)?;

        let ExprKind::Field { base, name } = &receiver.kind else {
            return None;
        };
        if name != self.lock || base.object() != Some(self.instance) {
            return None;
        }

        if target.name == self.config.acquire {
            Some(LockOp::Acquire)
        } else if target.name == self.config.release {
            Some(LockOp::Release)
        } else {
            None
        }
    }
}

impl<'ast> Visit<'ast> for LockCallFinder<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Some(op) = self.classify(expr) {
            self.calls.push(LockCall {
                op,
                pos: expr.pos(),
                defer: expr.defer,
            });
        }
        walk_expr(self, expr);
    }
}
