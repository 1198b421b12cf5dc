//! Cache parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Serialized payloads above this size are chunked; also the chunk size
    pub chunk_threshold_bytes: usize,
    pub default_ttl: Duration,
    /// How often the background sweeper reclaims expired keys
    pub sweep_interval: Duration,
    /// Store capacity in entries (payload, metadata and chunks together); 0 means unbounded
    pub max_entries: usize,
    /// When false, results are neither read from nor written to the cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: 512_000,
            default_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            max_entries: 0,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn with_chunk_threshold(mut self, bytes: usize) -> Self {
        self.chunk_threshold_bytes = bytes.max(1);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = CacheConfig::default();
        assert_eq!(config.chunk_threshold_bytes, 512_000);
        assert_eq!(config.default_ttl, Duration::from_secs(3600));
        assert_eq!(config.max_entries, 0);
        assert!(config.enabled);
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        assert_eq!(CacheConfig::default().with_chunk_threshold(0).chunk_threshold_bytes, 1);
    }
}
