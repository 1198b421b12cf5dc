//! Cache store port
//!
//! Byte-level key/value storage with per-key TTL. The [`CacheManager`]
//! builds chunking, metadata and summaries on top of it.
//!
//! Expired keys must behave as absent on read. Reclaiming their storage is
//! left to [`CacheStore::sweep_expired`], which a background task calls
//! periodically.
//!
//! [`CacheManager`]: crate::use_cases::cache_manager::CacheManager

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store is full: {0}")]
    Capacity(String),
}

/// Counters reported by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Live keys (meta, inline values and chunks alike)
    pub keys: usize,
    /// Bytes held by live keys
    pub bytes: usize,
    /// Keys removed by capacity eviction since creation
    pub evictions: u64,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a value that expires after `ttl`
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Every live key, in no particular order
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Drop every expired key; returns how many were removed
    async fn sweep_expired(&self) -> Result<usize, StoreError>;

    async fn stats(&self) -> StoreStats;
}
