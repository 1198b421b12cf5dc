//! Orchestrator parameters: concurrency, timeouts and retries.

use conductor_domain::{DomainError, ExecutionStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for transient failures.
///
/// Backoff before retry *n* (1-based) is
/// `initial_backoff * multiplier^(n-1)`, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Whether a failed attempt number `attempt` (1-based) should be repeated
    pub fn should_retry(&self, attempt: u32, error: &DomainError, idempotent: bool) -> bool {
        idempotent && error.is_transient() && attempt < self.max_attempts
    }
}

/// Execution parameters for plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrent calls within a group
    pub max_parallelism: usize,
    /// Deadline for a single attempt
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    /// Strategy used when the caller does not pick one
    pub default_strategy: ExecutionStrategy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 5,
            call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            default_strategy: ExecutionStrategy::default(),
        }
    }
}

impl OrchestratorConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }
}
