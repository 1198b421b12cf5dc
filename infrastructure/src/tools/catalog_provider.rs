//! JSON catalog provider: tool descriptors from a file on disk.
//!
//! The file holds either a bare array of descriptors or an object with a
//! `tools` array:
//!
//! ```json
//! {
//!   "tools": [
//!     {
//!       "name": "getMails",
//!       "description": "List mails of an account",
//!       "parameters": [{ "name": "accountId", "type": "string", "required": true, "location": "path" }],
//!       "declaredOutputs": ["mailId", "subject"],
//!       "idempotent": true
//!     }
//!   ]
//! }
//! ```
//!
//! The file is read on every discovery, so `ToolRegistry::reload` picks up
//! edits without restarting.

use async_trait::async_trait;
use conductor_domain::tool::{
    entities::ToolDescriptor,
    provider::{ProviderError, ToolProvider},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default priority for catalog files
pub const CATALOG_PRIORITY: i32 = 0;

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<ToolDescriptor>),
    Wrapped { tools: Vec<ToolDescriptor> },
}

impl CatalogDocument {
    fn into_tools(self) -> Vec<ToolDescriptor> {
        match self {
            CatalogDocument::List(tools) | CatalogDocument::Wrapped { tools } => tools,
        }
    }
}

/// Provider reading descriptors from a JSON catalog file.
#[derive(Debug, Clone)]
pub struct JsonCatalogProvider {
    id: String,
    path: PathBuf,
    priority: i32,
}

impl JsonCatalogProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: format!("catalog:{}", path.display()),
            path,
            priority: CATALOG_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse catalog text. Exposed for callers that hold the JSON in memory.
    pub fn parse(content: &str) -> Result<Vec<ToolDescriptor>, ProviderError> {
        let document: CatalogDocument = serde_json::from_str(content)
            .map_err(|e| ProviderError::ConfigurationError(format!("invalid catalog: {}", e)))?;

        let tools = document.into_tools();
        if let Some(unnamed) = tools.iter().position(|t| t.name.trim().is_empty()) {
            return Err(ProviderError::ConfigurationError(format!(
                "catalog entry {} has an empty name",
                unnamed
            )));
        }
        Ok(tools)
    }
}

#[async_trait]
impl ToolProvider for JsonCatalogProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "JSON catalog"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProviderError::DiscoveryFailed(format!("{}: {}", self.path.display(), e))
        })?;

        let tools = Self::parse(&content)?;
        debug!(
            path = %self.path.display(),
            count = tools.len(),
            "Loaded tool catalog"
        );
        Ok(tools)
    }
}
