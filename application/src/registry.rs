//! Tool Registry
//!
//! The [`ToolRegistry`] holds the current [`ToolCatalog`] together with the
//! dependency edges derived from it, as one immutable [`RegistrySnapshot`].
//!
//! # Atomic swap
//!
//! Readers take an `Arc` to the current snapshot and keep using it for as
//! long as they need. Every change (registering one tool, replacing the
//! catalog, reloading from providers) builds a complete new snapshot and
//! swaps it in under a write lock, so nobody ever observes a half-updated
//! table or edges that disagree with the catalog.
//!
//! # Provider aggregation
//!
//! [`ToolRegistry::reload`] queries providers in descending priority. When
//! two providers offer the same tool the higher-priority one wins; a
//! provider that lists the same name twice fails the reload with
//! `DuplicateTool` and leaves the previous snapshot in place.

use crate::config::ResolverConfig;
use conductor_domain::{
    DependencyEdge, DependencyIndex, DomainError, ToolCatalog, ToolDescriptor, ToolProvider,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Provider '{provider}' listed tool '{tool}' more than once")]
    DuplicateInProvider { provider: String, tool: String },
}

/// Catalog plus everything derived from it
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    catalog: ToolCatalog,
    index: DependencyIndex,
    version: u64,
}

impl RegistrySnapshot {
    fn build(catalog: ToolCatalog, config: &ResolverConfig, version: u64) -> Self {
        let index = DependencyIndex::build(&catalog, &config.scoring, &config.overrides);
        Self {
            catalog,
            index,
            version,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Incremented on every swap
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Outcome of [`ToolRegistry::reload`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    /// Tool name → provider id that supplied it
    pub tools: HashMap<String, String>,
    /// Providers skipped because they were unavailable or failed discovery
    pub skipped_providers: Vec<String>,
    /// Tools ignored because a higher-priority provider supplied them
    pub shadowed: Vec<String>,
}

pub struct ToolRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    config: ResolverConfig,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::build(
                ToolCatalog::new(),
                &config,
                0,
            ))),
            config,
        }
    }

    pub fn with_catalog(catalog: ToolCatalog, config: ResolverConfig) -> Self {
        let registry = Self::new(config);
        registry.replace(catalog);
        registry
    }

    /// Current snapshot; stays valid across later swaps
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a whole new catalog
    pub fn replace(&self, catalog: ToolCatalog) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let version = guard.version + 1;
        let snapshot = RegistrySnapshot::build(catalog, &self.config, version);
        info!(
            tools = snapshot.catalog.len(),
            edges = snapshot.index.len(),
            version,
            "Registry swapped"
        );
        *guard = Arc::new(snapshot);
    }

    /// Add one tool; fails with `DuplicateTool` if the name is taken
    pub fn register(&self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut catalog = guard.catalog.clone();
        catalog.register(descriptor)?;
        let version = guard.version + 1;
        *guard = Arc::new(RegistrySnapshot::build(catalog, &self.config, version));
        Ok(())
    }

    /// Rebuild the catalog from providers and swap it in
    pub async fn reload(
        &self,
        providers: &[Arc<dyn ToolProvider>],
    ) -> Result<ReloadReport, RegistryError> {
        let mut ordered: Vec<&Arc<dyn ToolProvider>> = providers.iter().collect();
        ordered.sort_by_key(|p| std::cmp::Reverse(p.priority()));

        let mut catalog = ToolCatalog::new();
        let mut report = ReloadReport::default();

        for provider in ordered {
            if !provider.is_available().await {
                debug!(provider = provider.id(), "Provider not available, skipping");
                report.skipped_providers.push(provider.id().to_string());
                continue;
            }

            let tools = match provider.discover_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    warn!(
                        provider = provider.id(),
                        error = %e,
                        "Failed to discover tools from provider"
                    );
                    report.skipped_providers.push(provider.id().to_string());
                    continue;
                }
            };

            let mut seen = HashSet::new();
            for tool in tools {
                if !seen.insert(tool.name.clone()) {
                    return Err(RegistryError::DuplicateInProvider {
                        provider: provider.id().to_string(),
                        tool: tool.name,
                    });
                }
                if catalog.contains(&tool.name) {
                    trace!(
                        tool = %tool.name,
                        provider = provider.id(),
                        "Tool already registered by higher priority provider"
                    );
                    report.shadowed.push(tool.name);
                    continue;
                }
                debug!(tool = %tool.name, provider = provider.id(), "Registered tool");
                report
                    .tools
                    .insert(tool.name.clone(), provider.id().to_string());
                catalog.register(tool)?;
            }
        }

        self.replace(catalog);
        Ok(report)
    }

    pub fn lookup(&self, name: &str) -> Result<ToolDescriptor, DomainError> {
        self.snapshot().catalog.lookup(name).cloned()
    }

    pub fn all(&self) -> Vec<ToolDescriptor> {
        self.snapshot().catalog.all().cloned().collect()
    }

    /// Every derived dependency edge of the current catalog
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.snapshot().index.edges().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().catalog.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
