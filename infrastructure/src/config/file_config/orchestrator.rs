//! Orchestrator configuration from TOML (`[orchestrator]` section)

use super::ConfigValidationError;
use conductor_application::config::{OrchestratorConfig, RetryPolicy};
use conductor_domain::ExecutionStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator configuration from TOML.
///
/// # Example
///
/// ```toml
/// [orchestrator]
/// max_parallelism = 8
/// call_timeout_secs = 20
/// strategy = "adaptive"
///
/// [orchestrator.retry]
/// max_attempts = 4
/// initial_backoff_ms = 100
/// multiplier = 2.0
/// max_backoff_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Concurrent calls within one execution group
    pub max_parallelism: usize,
    /// Deadline for a single attempt
    pub call_timeout_secs: u64,
    /// Strategy used when a plan names none ("sequential", "parallel", "adaptive")
    pub strategy: String,
    pub retry: FileRetryConfig,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            max_parallelism: defaults.max_parallelism,
            call_timeout_secs: defaults.call_timeout.as_secs(),
            strategy: defaults.default_strategy.as_str().to_string(),
            retry: FileRetryConfig::default(),
        }
    }
}

impl FileOrchestratorConfig {
    /// Parse the strategy, falling back to the default when unknown
    pub fn parse_strategy(&self) -> (ExecutionStrategy, Option<ConfigValidationError>) {
        match self.strategy.parse::<ExecutionStrategy>() {
            Ok(strategy) => (strategy, None),
            Err(_) => (
                ExecutionStrategy::default(),
                Some(ConfigValidationError::InvalidEnumValue {
                    field: "orchestrator.strategy".to_string(),
                    value: self.strategy.clone(),
                    valid_values: "sequential, parallel, adaptive".to_string(),
                }),
            ),
        }
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigValidationError>) {
        if self.max_parallelism == 0 {
            issues.push(ConfigValidationError::MustBePositive(
                "orchestrator.max_parallelism",
            ));
        }
        if self.call_timeout_secs == 0 {
            issues.push(ConfigValidationError::MustBePositive(
                "orchestrator.call_timeout_secs",
            ));
        }
        issues.extend(self.parse_strategy().1);
        self.retry.validate(issues);
    }

    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        let timeout = match self.call_timeout_secs {
            0 => defaults.call_timeout,
            secs => Duration::from_secs(secs),
        };
        defaults
            .with_max_parallelism(self.max_parallelism)
            .with_call_timeout(timeout)
            .with_default_strategy(self.parse_strategy().0)
            .with_retry(self.retry.to_retry_policy())
    }
}

/// `[orchestrator.retry]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

impl FileRetryConfig {
    fn validate(&self, issues: &mut Vec<ConfigValidationError>) {
        if self.max_attempts == 0 {
            issues.push(ConfigValidationError::MustBePositive(
                "orchestrator.retry.max_attempts",
            ));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            issues.push(ConfigValidationError::OutOfRange {
                field: "orchestrator.retry.multiplier".to_string(),
                value: self.multiplier,
                expected: "at least 1.0",
            });
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            issues.push(ConfigValidationError::Inconsistent(
                "orchestrator.retry.max_backoff_ms is below initial_backoff_ms".to_string(),
            ));
        }
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .with_multiplier(self.multiplier)
            .with_max_backoff(Duration::from_millis(self.max_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_application_defaults() {
        let config = FileOrchestratorConfig::default();
        assert_eq!(config.to_orchestrator_config(), OrchestratorConfig::default());
        assert_eq!(config.max_parallelism, 5);
        assert_eq!(config.call_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 200);
    }

    #[test]
    fn test_partial_section() {
        let config: FileOrchestratorConfig = toml::from_str(
            r#"
max_parallelism = 2
strategy = "seq"

[retry]
max_attempts = 1
"#,
        )
        .unwrap();

        let converted = config.to_orchestrator_config();
        assert_eq!(converted.max_parallelism, 2);
        assert_eq!(converted.default_strategy, ExecutionStrategy::Sequential);
        assert_eq!(converted.retry.max_attempts, 1);
        assert_eq!(converted.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_strategy_falls_back() {
        let config = FileOrchestratorConfig {
            strategy: "yolo".into(),
            ..Default::default()
        };
        let (strategy, issue) = config.parse_strategy();
        assert_eq!(strategy, ExecutionStrategy::default());
        assert!(matches!(
            issue,
            Some(ConfigValidationError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zeroes_and_bad_backoff() {
        let config = FileOrchestratorConfig {
            max_parallelism: 0,
            call_timeout_secs: 0,
            retry: FileRetryConfig {
                max_attempts: 0,
                multiplier: 0.5,
                initial_backoff_ms: 500,
                max_backoff_ms: 100,
            },
            ..Default::default()
        };

        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert_eq!(issues.len(), 5);
    }
}
