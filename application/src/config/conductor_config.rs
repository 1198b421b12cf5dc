//! Conductor configuration container.
//!
//! [`ConductorConfig`] groups the split configuration types so the CLI can
//! hand each use case only the slice it needs:
//!
//! | Type | Registry | SubmitPlan | CacheManager | FetchCached |
//! |------|----------|------------|--------------|-------------|
//! | `OrchestratorConfig` | No | Yes | No | No |
//! | `CacheConfig` | No | Yes | Yes | Yes |
//! | `TruncationConfig` | No | Yes | No | Yes |
//! | `ResolverConfig` | Yes | No | No | No |

use super::{CacheConfig, OrchestratorConfig, ResolverConfig, TruncationConfig};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConductorConfig {
    orchestrator: OrchestratorConfig,
    cache: CacheConfig,
    truncation: TruncationConfig,
    resolver: ResolverConfig,
}

impl ConductorConfig {
    pub fn new(
        orchestrator: OrchestratorConfig,
        cache: CacheConfig,
        truncation: TruncationConfig,
        resolver: ResolverConfig,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            truncation,
            resolver,
        }
    }

    // ==================== Accessors ====================

    pub fn orchestrator(&self) -> &OrchestratorConfig {
        &self.orchestrator
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn truncation(&self) -> &TruncationConfig {
        &self.truncation
    }

    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    // ==================== Builder Methods ====================

    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationConfig) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}
