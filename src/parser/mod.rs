//! Parser module for protection directives
//!
//! This module contains:
//! - `directive`: Extracts the lock field name from a field's documentation

pub mod directive;

pub use directive::{mentions_protection, parse_lock_name, strip_test_annotation, LockName, MARKER};
