//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`OrchestratorConfig`] / [`RetryPolicy`]: parallelism, timeouts, retries
//! - [`CacheConfig`]: chunking threshold, TTL, sweeping, capacity
//! - [`TruncationConfig`]: list length returned to the planner
//! - [`ResolverConfig`]: heuristic scoring and declared relationships
//! - [`ConductorConfig`]: container for all of the above

pub mod cache;
pub mod conductor_config;
pub mod orchestrator;
pub mod resolver;
pub mod truncation;

pub use cache::CacheConfig;
pub use conductor_config::ConductorConfig;
pub use orchestrator::{OrchestratorConfig, RetryPolicy};
pub use resolver::ResolverConfig;
pub use truncation::TruncationConfig;
