//! Findings produced by the checker
//!
//! None of these abort a run. Each one is tied to a single field or a
//! single usage and ends up as one diagnostic in the report.

use thiserror::Error;

/// A malformed, ambiguous or absent protection directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("found 0 \"protected by \" in comment {comment:?}, expected exact one")]
    NotFound { comment: String },

    #[error("found {count} \"protected by \" in comment {comment:?}, expected exact one")]
    Ambiguous { count: usize, comment: String },

    #[error("failed to parse lock name from comment {comment:?}")]
    Empty { comment: String },
}

impl DirectiveError {
    /// Short reason tag: `not found`, `ambiguous` or `empty`.
    pub fn reason(&self) -> &'static str {
        match self {
            DirectiveError::NotFound { .. } => "not found",
            DirectiveError::Ambiguous { .. } => "ambiguous",
            DirectiveError::Empty { .. } => "empty",
        }
    }
}

/// A directive that parsed but cannot be bound to a valid lock field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("protected field {field} is not declared in a struct")]
    NoEnclosingRecord { field: String },

    #[error("exported protected field {record}.{field}")]
    ExportedProtectedField { record: String, field: String },

    #[error("lock {lock} not found in struct {record}")]
    LockFieldNotFound { record: String, lock: String },

    #[error("exported mutex {record}.{lock}")]
    ExportedLockField { record: String, lock: String },

    #[error("lock {lock} doesn't implement Locker ({acquire}/{release})")]
    NotALocker {
        lock: String,
        acquire: String,
        release: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("protected field {field} of {instance} is accessed outside of a function")]
    NoEnclosingFunction { field: String, instance: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisciplineError {
    #[error("not protected access to shared field {field}, use {instance}.{lock}.{acquire}()")]
    UnprotectedAccess {
        field: String,
        instance: String,
        lock: String,
        acquire: String,
    },
}

/// Any finding of any stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Finding {
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Discipline(#[from] DisciplineError),
}

impl Finding {
    /// Stable rule identifier, used for filtering and machine-readable output.
    pub fn rule(&self) -> &'static str {
        match self {
            Finding::Directive(_) => "directive",
            Finding::Resolution(e) => match e {
                ResolutionError::NoEnclosingRecord { .. } => "no-enclosing-record",
                ResolutionError::ExportedProtectedField { .. } => "exported-protected-field",
                ResolutionError::LockFieldNotFound { .. } => "lock-field-not-found",
                ResolutionError::ExportedLockField { .. } => "exported-lock-field",
                ResolutionError::NotALocker { .. } => "not-a-locker",
            },
            Finding::Collection(_) => "no-enclosing-function",
            Finding::Discipline(_) => "unprotected-access",
        }
    }
}

/// Every rule identifier, with a one-line description.
pub const RULES: &[(&str, &str)] = &[
    (
        "directive",
        "A field comment mentions \"protected by\" but does not contain exactly one \"protected by <lock>\" directive with a lock name.",
    ),
    (
        "no-enclosing-record",
        "A protection directive is attached to a field that is not declared inside a struct.",
    ),
    (
        "exported-protected-field",
        "A protected field is public, so code outside the package can access it without taking the lock.",
    ),
    (
        "lock-field-not-found",
        "The lock named by a directive is not a field of the same struct.",
    ),
    (
        "exported-lock-field",
        "The lock field is public, so code outside the package can release it behind the checker's back.",
    ),
    (
        "not-a-locker",
        "The lock field's type does not provide both zero-argument acquire and release methods.",
    ),
    (
        "no-enclosing-function",
        "A protected field is accessed outside of any function body, where no lock can be held.",
    ),
    (
        "unprotected-access",
        "A protected field is read or written without a preceding acquire of its lock on the same instance, or after the lock was released again.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_messages() {
        let err = DirectiveError::Ambiguous {
            count: 2,
            comment: "protected by field1, protected by field2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "found 2 \"protected by \" in comment \"protected by field1, protected by field2\", expected exact one"
        );
        assert_eq!(err.reason(), "ambiguous");
    }

    #[test]
    fn test_every_rule_is_documented() {
        let findings: Vec<Finding> = vec![
            DirectiveError::Empty { comment: String::new() }.into(),
            ResolutionError::NoEnclosingRecord { field: "f".into() }.into(),
            ResolutionError::NotALocker {
                lock: "l".into(),
                acquire: "lock".into(),
                release: "unlock".into(),
            }
            .into(),
            CollectionError::NoEnclosingFunction {
                field: "f".into(),
                instance: "s".into(),
            }
            .into(),
        ];
        for finding in findings {
            assert!(RULES.iter().any(|(rule, _)| *rule == finding.rule()));
        }
    }

    #[test]
    fn test_unprotected_access_message() {
        let err = DisciplineError::UnprotectedAccess {
            field: "i".into(),
            instance: "s".into(),
            lock: "mu".into(),
            acquire: "lock".into(),
        };
        assert_eq!(err.to_string(), "not protected access to shared field i, use s.mu.lock()");
    }
}
