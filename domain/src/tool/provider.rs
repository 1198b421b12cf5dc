//! Tool provider abstraction
//!
//! A [`ToolProvider`] is an external source of [`ToolDescriptor`]s: a JSON
//! catalog on disk, descriptors generated from API documents elsewhere in
//! the system, or a fixed in-memory list. Providers only *describe* tools;
//! invoking them goes through the application layer's invoker port.
//!
//! # Priority System
//!
//! The registry aggregates every available provider. When two providers
//! offer a tool with the same name, the one with higher priority wins and
//! the other entry is ignored:
//!
//! ```text
//!            ToolRegistry::reload(providers)
//!                       │
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!   ┌──────────┐  ┌──────────┐  ┌──────────┐
//!   │ override │  │ catalog  │  │ static   │
//!   │ priority │  │ priority │  │ priority │
//!   │   100    │  │    0     │  │  -100    │
//!   └──────────┘  └──────────┘  └──────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use super::entities::ToolDescriptor;

/// Error type for tool provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider is not available (e.g., catalog file missing)
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    /// Failed to discover tools from the provider
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Source of tool descriptors
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique identifier for this provider (e.g. "catalog:tools.json")
    fn id(&self) -> &str;

    /// Display name for user-facing output
    fn display_name(&self) -> &str;

    /// Priority for name conflicts (higher = preferred)
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the provider can currently be queried
    async fn is_available(&self) -> bool;

    /// Describe the tools this provider offers
    async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError>;

    /// Check if this provider has a specific tool
    async fn has_tool(&self, tool_name: &str) -> bool {
        match self.discover_tools().await {
            Ok(tools) => tools.iter().any(|t| t.name == tool_name),
            Err(_) => false,
        }
    }
}

/// Provider over a fixed list of descriptors.
///
/// Useful for embedding a handful of tools next to a catalog, and in tests.
#[derive(Debug, Clone)]
pub struct StaticToolProvider {
    id: String,
    priority: i32,
    tools: Vec<ToolDescriptor>,
}

impl StaticToolProvider {
    pub fn new(id: impl Into<String>, tools: Vec<ToolDescriptor>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            tools,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl ToolProvider for StaticToolProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Static tools"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        Ok(self.tools.clone())
    }
}
