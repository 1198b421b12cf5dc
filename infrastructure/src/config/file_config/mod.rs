//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly. Every section is
//! `#[serde(default)]`, so a file only names what it changes. Conversion into
//! the application's types happens in [`FileConfig::into_conductor_config`].

mod cache;
mod history;
mod orchestrator;
mod resolver;
mod tools;
mod truncation;

pub use cache::FileCacheConfig;
pub use history::FileHistoryConfig;
pub use orchestrator::{FileOrchestratorConfig, FileRetryConfig};
pub use resolver::{FileRelationshipOverride, FileResolverConfig};
pub use tools::FileToolsConfig;
pub use truncation::FileTruncationConfig;

use conductor_application::config::ConductorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A problem found by [`FileConfig::validate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{0} must be greater than 0")]
    MustBePositive(&'static str),

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        expected: &'static str,
    },

    #[error("{field}: unknown value '{value}' (valid: {valid_values})")]
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: String,
    },

    #[error("resolver.overrides[{index}].{field} cannot be empty")]
    EmptyOverrideField { index: usize, field: &'static str },

    #[error("{0}")]
    Inconsistent(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub orchestrator: FileOrchestratorConfig,
    pub cache: FileCacheConfig,
    pub truncation: FileTruncationConfig,
    pub resolver: FileResolverConfig,
    pub history: FileHistoryConfig,
    pub tools: FileToolsConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning every issue found.
    ///
    /// Conversion still succeeds for an invalid file (bad values fall back to
    /// defaults); callers decide whether issues are fatal.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        self.orchestrator.validate(&mut issues);
        self.cache.validate(&mut issues);
        self.truncation.validate(&mut issues);
        self.resolver.validate(&mut issues);
        issues
    }

    pub fn into_conductor_config(&self) -> ConductorConfig {
        ConductorConfig::new(
            self.orchestrator.to_orchestrator_config(),
            self.cache.to_cache_config(),
            self.truncation.to_truncation_config(),
            self.resolver.to_resolver_config(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::ExecutionStrategy;
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[orchestrator]
max_parallelism = 3
call_timeout_secs = 10
strategy = "parallel"

[orchestrator.retry]
max_attempts = 5
initial_backoff_ms = 50

[cache]
chunk_threshold_bytes = 1024
max_entries = 100

[truncation]
max_items = 20

[resolver]
substring_match = 0.5

[[resolver.overrides]]
consumer = "getInvoice"
parameter = "customerRef"
provider = "getCustomers"
output = "customerId"

[history]
enabled = true
path = "/tmp/history.jsonl"

[tools]
catalogs = ["tools.json"]
fixtures = "fixtures.json"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());

        let converted = config.into_conductor_config();
        let orchestrator = converted.orchestrator();
        assert_eq!(orchestrator.max_parallelism, 3);
        assert_eq!(orchestrator.call_timeout, Duration::from_secs(10));
        assert_eq!(orchestrator.default_strategy, ExecutionStrategy::Parallel);
        assert_eq!(orchestrator.retry.max_attempts, 5);
        assert_eq!(orchestrator.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(converted.cache().chunk_threshold_bytes, 1024);
        assert_eq!(converted.cache().max_entries, 100);
        assert_eq!(converted.truncation().max_items, 20);
        assert_eq!(converted.resolver().scoring.substring_match, 0.5);
        assert_eq!(converted.resolver().overrides.len(), 1);
        assert_eq!(config.tools.catalogs.len(), 1);
        assert!(config.history.resolved_path().is_some());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(config.validate().is_empty());
        assert_eq!(config.into_conductor_config(), ConductorConfig::default());
    }

    #[test]
    fn test_validate_collects_across_sections() {
        let toml_str = r#"
[orchestrator]
max_parallelism = 0

[cache]
chunk_threshold_bytes = 0

[resolver]
token_match = 1.5
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();

        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&ConfigValidationError::MustBePositive(
            "orchestrator.max_parallelism"
        )));
        assert!(
            issues
                .iter()
                .any(|i| i.to_string().contains("resolver.token_match"))
        );
    }
}
