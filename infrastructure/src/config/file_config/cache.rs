//! Cache configuration from TOML (`[cache]` section)

use super::ConfigValidationError;
use conductor_application::config::CacheConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ten years
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Cache configuration from TOML.
///
/// # Example
///
/// ```toml
/// [cache]
/// enabled = true
/// chunk_threshold_bytes = 512000
/// ttl_secs = 3600
/// sweep_interval_secs = 60
/// max_entries = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    pub enabled: bool,
    /// Payloads above this size are stored in chunks of this size
    pub chunk_threshold_bytes: usize,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    /// Store capacity in entries, 0 for unbounded
    pub max_entries: usize,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            enabled: defaults.enabled,
            chunk_threshold_bytes: defaults.chunk_threshold_bytes,
            ttl_secs: defaults.default_ttl.as_secs(),
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            max_entries: defaults.max_entries,
        }
    }
}

impl FileCacheConfig {
    pub(super) fn validate(&self, issues: &mut Vec<ConfigValidationError>) {
        if self.chunk_threshold_bytes == 0 {
            issues.push(ConfigValidationError::MustBePositive(
                "cache.chunk_threshold_bytes",
            ));
        }
        if self.ttl_secs == 0 {
            issues.push(ConfigValidationError::MustBePositive("cache.ttl_secs"));
        } else if self.ttl_secs > MAX_TTL_SECS {
            issues.push(ConfigValidationError::OutOfRange {
                field: "cache.ttl_secs".to_string(),
                value: self.ttl_secs as f64,
                expected: "at most 315360000 (ten years)",
            });
        }
        if self.sweep_interval_secs == 0 {
            issues.push(ConfigValidationError::MustBePositive(
                "cache.sweep_interval_secs",
            ));
        }
    }

    pub fn to_cache_config(&self) -> CacheConfig {
        let defaults = CacheConfig::default();
        let secs_or = |secs: u64, fallback: Duration| match secs {
            0 => fallback,
            secs => Duration::from_secs(secs),
        };

        let config = CacheConfig::default()
            .with_chunk_threshold(self.chunk_threshold_bytes)
            .with_default_ttl(secs_or(
                self.ttl_secs.min(MAX_TTL_SECS),
                defaults.default_ttl,
            ))
            .with_sweep_interval(secs_or(self.sweep_interval_secs, defaults.sweep_interval))
            .with_max_entries(self.max_entries);
        if self.enabled { config } else { config.disabled() }
    }
}
