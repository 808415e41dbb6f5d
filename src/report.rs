//! Diagnostics handed to the reporting sink

use crate::error::Finding;
use crate::model::Pos;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// One positioned message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    #[serde(flatten)]
    pub pos: Pos,
    pub rule: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<PathBuf>, pos: Pos, finding: &Finding) -> Self {
        Diagnostic {
            file: file.into(),
            pos,
            rule: finding.rule(),
            message: finding.to_string(),
        }
    }

    fn sort_key(&self) -> (&PathBuf, Pos, &str, &str) {
        (&self.file, self.pos, self.rule, &self.message)
    }
}

impl Ord for Diagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Diagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.pos, self.message)
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    #[serde(rename = "files")]
    pub units: usize,
    #[serde(rename = "protected_fields")]
    pub bindings: usize,
    #[serde(rename = "accesses")]
    pub usages: usize,
}

/// Outcome of a complete run: the diagnostics in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: Stats,
}

impl Report {
    /// A run is clean iff it produced no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Keep only diagnostics of the given rules (all when `rules` is empty).
    pub fn retain_rules(&mut self, rules: &[String]) {
        if rules.is_empty() {
            return;
        }
        self.diagnostics.retain(|d| rules.iter().any(|r| r == d.rule));
    }
}
