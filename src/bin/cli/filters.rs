//! Filtering of inputs and results
//!
//! Path excludes are regexes matched against the whole path; rule filters
//! must name known rules.

use anyhow::{bail, Context};
use protected_by::error::RULES;
use regex::Regex;
use std::path::Path;

/// Set of exclusion patterns. Empty matches nothing.
#[derive(Debug, Default)]
pub struct PathFilter {
    patterns: Vec<Regex>,
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> anyhow::Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid --exclude pattern {:?}", p)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(PathFilter { patterns })
    }

    /// Check if any pattern matches the path
    pub fn matches(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.patterns.iter().any(|p| p.is_match(&path))
    }
}

/// Reject rule names the checker never emits.
pub fn validate_rules(rules: &[String]) -> anyhow::Result<Vec<String>> {
    for rule in rules {
        if !RULES.iter().any(|(name, _)| name == rule) {
            bail!("unknown rule {:?}; see `protectedby explain <RULE>`", rule);
        }
    }
    Ok(rules.to_vec())
}
