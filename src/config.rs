//! Checker configuration
//!
//! Passed explicitly to every stage instead of living in process-wide state.

use serde::{Deserialize, Serialize};

/// Marker that starts an expected-diagnostic annotation in self-tests.
pub const TEST_ANNOTATION_MARKER: &str = "// want";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the lock's zero-argument acquire operation.
    pub acquire: String,
    /// Name of the lock's zero-argument release operation.
    pub release: String,
    /// Cut directive text at [`TEST_ANNOTATION_MARKER`] before parsing it.
    pub test_mode: bool,
    /// Number of worker threads for the data-parallel stages.
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            acquire: "lock".to_string(),
            release: "unlock".to_string(),
            test_mode: false,
            jobs: 1,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    #[must_use]
    pub fn with_lock_methods(mut self, acquire: impl Into<String>, release: impl Into<String>) -> Self {
        self.acquire = acquire.into();
        self.release = release.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"acquire": "acquire"}"#).unwrap();
        assert_eq!(config.acquire, "acquire");
        assert_eq!(config.release, "unlock");
        assert_eq!(config.jobs, 1);
        assert!(!config.test_mode);
    }

    #[test]
    fn test_jobs_never_zero() {
        assert_eq!(Config::new().with_jobs(0).jobs, 1);
    }
}
