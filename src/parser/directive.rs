//! "protected by" directive parsing
//!
//! A field documented with `/// i is protected by mu.` declares that every
//! access to it must hold the lock stored in the sibling field `mu`.
//!
//! Rules:
//! - The marker `protected by ` is matched case-insensitively, trailing
//!   space included (`protected by:` is not a directive)
//! - The marker must occur exactly once
//! - The lock name is the first run of letters and digits after the
//!   marker; quotes, punctuation and the rest of the sentence are ignored
//! - Rust field names may contain `_`, so the whole identifier around that
//!   run is kept as well and tried first when looking up the lock field

use crate::config::{Config, TEST_ANNOTATION_MARKER};
use crate::error::DirectiveError;

/// The directive marker, trailing space included.
pub const MARKER: &str = "protected by ";

/// Whether a comment talks about protection at all.
///
/// Only such comments are parsed as directives; a typo like
/// `protected by: mu` is still picked up here and then rejected by
/// [`parse_lock_name`], while unrelated documentation is ignored.
pub fn mentions_protection(comment: &str) -> bool {
    comment.to_ascii_lowercase().contains(MARKER.trim_end())
}

/// Lock named by a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockName {
    /// First run of letters and digits after the marker.
    pub word: String,
    /// The identifier containing `word`, underscores included.
    pub identifier: String,
}

impl LockName {
    /// Field names to look the lock up by, most specific first.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        let fallback = (self.word != self.identifier).then_some(self.word.as_str());
        std::iter::once(self.identifier.as_str()).chain(fallback)
    }
}

/// Extract the lock field name from a field's documentation text.
pub fn parse_lock_name(comment: &str, config: &Config) -> Result<LockName, DirectiveError> {
    let comment = if config.test_mode {
        strip_test_annotation(comment)
    } else {
        comment
    };

    // ASCII lowering keeps byte offsets aligned with the original text.
    let lowered = comment.to_ascii_lowercase();
    let count = lowered.matches(MARKER).count();
    match count {
        0 => {
            return Err(DirectiveError::NotFound {
                comment: comment.to_string(),
            })
        }
        1 => {}
        _ => {
            return Err(DirectiveError::Ambiguous {
                count,
                comment: comment.to_string(),
            })
        }
    }

    let Some(idx) = lowered.find(MARKER) else {
        return Err(DirectiveError::NotFound {
            comment: comment.to_string(),
        });
    };

    let rest = &comment[idx + MARKER.len()..];
    // Tokens before the first word can only be runs of underscores.
    let identifier = rest
        .split(|c: char| !is_ident_char(c))
        .find(|token| token.chars().any(char::is_alphanumeric))
        .ok_or_else(|| DirectiveError::Empty {
            comment: comment.to_string(),
        })?;
    let word = identifier
        .split(|c: char| !c.is_alphanumeric())
        .find(|token| !token.is_empty())
        .unwrap_or(identifier);

    Ok(LockName {
        word: word.to_string(),
        identifier: identifier.to_string(),
    })
}

/// Cut a self-test expectation (`// want ...`) off the end of a comment.
pub fn strip_test_annotation(comment: &str) -> &str {
    match comment.find(TEST_ANNOTATION_MARKER) {
        Some(idx) => &comment[..idx],
        None => comment,
    }
}

/// Characters that can appear in a field name.
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
