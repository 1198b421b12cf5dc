//! Fetch Cached use case
//!
//! Retrieves a cached payload, or a description of it, by the opaque key
//! a previous plan reported. Nothing is re-executed.

use crate::use_cases::cache_manager::{CacheError, CacheManager};
use conductor_domain::{Summary, TruncatedResult, Truncator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What to return for a key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// The stored value, truncated
    Value,
    /// Only the summary
    Summary,
    /// The value if it was stored inline, the summary otherwise
    #[default]
    Auto,
}

impl FetchMode {
    pub fn as_str(&self) -> &str {
        match self {
            FetchMode::Value => "value",
            FetchMode::Summary => "summary",
            FetchMode::Auto => "auto",
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "value" | "full" => Ok(FetchMode::Value),
            "summary" => Ok(FetchMode::Summary),
            "auto" => Ok(FetchMode::Auto),
            _ => Err(format!(
                "Invalid fetch mode: {}. Valid options: value, summary, auto",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fetched {
    Value(TruncatedResult),
    Summary(Summary),
}

pub struct FetchCachedUseCase {
    cache: Arc<CacheManager>,
    truncator: Truncator,
}

impl FetchCachedUseCase {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self {
            cache,
            truncator: Truncator::default(),
        }
    }

    pub fn with_truncator(mut self, truncator: Truncator) -> Self {
        self.truncator = truncator;
        self
    }

    /// `IncompleteCacheEntry` surfaces as [`CacheError::Incomplete`]; a
    /// damaged entry is never returned in part.
    pub async fn fetch(&self, key: &str, mode: FetchMode) -> Result<Fetched, CacheError> {
        let mode = match mode {
            FetchMode::Auto => {
                let meta = self.cache.meta(key).await;
                match meta {
                    Ok(meta) if meta.layout.is_chunked() => FetchMode::Summary,
                    Ok(_) => FetchMode::Value,
                    // Entries without metadata are small inline values
                    Err(CacheError::Miss(_)) => FetchMode::Value,
                    Err(e) => return Err(e),
                }
            }
            other => other,
        };
        debug!(key, mode = %mode, "Fetching cached entry");

        match mode {
            FetchMode::Summary => Ok(Fetched::Summary(self.cache.summarize(key).await?)),
            _ => {
                let value = self.cache.get(key).await?;
                Ok(Fetched::Value(self.truncator.truncate(value)))
            }
        }
    }
}
