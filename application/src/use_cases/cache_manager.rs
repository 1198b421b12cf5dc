//! Cache Manager
//!
//! Stores tool results in a [`CacheStore`], chunking payloads whose
//! serialized size exceeds the configured threshold.
//!
//! # Layout
//!
//! | Key | Contents |
//! |-----|----------|
//! | `key:meta` | [`EntryMeta`]: layout, size, TTL and [`Summary`] |
//! | `key` | serialized payload (inline entries) |
//! | `key:chunk:i` | part `i` of the serialized payload (chunked entries) |
//!
//! Every part carries the same TTL. Expiry is checked against the injected
//! [`Clock`] on read, so an entry past its TTL is a miss even if the store
//! has not reclaimed it yet.
//!
//! Writes and reads of one key are serialized through a striped set of
//! async mutexes; distinct keys proceed concurrently.

use crate::config::CacheConfig;
use crate::ports::cache_store::{CacheStore, StoreError, StoreStats};
use crate::ports::clock::Clock;
use conductor_domain::cache::{meta_key, split_chunks};
use conductor_domain::{DomainError, EntryLayout, EntryMeta, Summary, result_key};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

const LOCK_STRIPES: usize = 64;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache miss: {0}")]
    Miss(String),

    /// Carries `DomainError::IncompleteCacheEntry`
    #[error(transparent)]
    Incomplete(DomainError),

    #[error("Cache entry '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss(_))
    }

    fn incomplete(key: &str, missing_part: usize, total_parts: usize) -> Self {
        CacheError::Incomplete(DomainError::IncompleteCacheEntry {
            key: key.to_string(),
            missing_part,
            total_parts,
        })
    }
}

/// Cache-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries with live metadata
    pub entries: usize,
    /// Raw store counters (includes metadata and chunk keys)
    pub keys: usize,
    pub bytes: usize,
    pub evictions: u64,
}

pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    locks: Vec<Mutex<()>>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            store,
            clock,
            config,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock_for(&self, key: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.locks[(hasher.finish() as usize) % self.locks.len()]
    }

    /// Store `value` under `key`; `None` uses the configured default TTL.
    ///
    /// Overwriting an entry removes parts of the previous layout that the new
    /// layout does not reuse.
    pub async fn put(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<String, CacheError> {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let size = bytes.len();
        let threshold = self.config.chunk_threshold_bytes.max(1);

        let _guard = self.lock_for(key).lock().await;
        let previous = self.read_raw_meta(key).await.ok().flatten();
        // Taken before the parts are written so the metadata never outlives them
        let created_at = self.clock.now();

        let layout = if size <= threshold {
            self.store.put(key, bytes, ttl).await?;
            EntryLayout::Inline
        } else {
            let layout = EntryLayout::chunked(key, size, threshold);
            if let EntryLayout::Chunked { chunks, .. } = &layout {
                for (chunk_key, part) in chunks.iter().zip(split_chunks(&bytes, threshold)) {
                    self.store.put(chunk_key, part.to_vec(), ttl).await?;
                }
            }
            layout
        };

        let meta = EntryMeta {
            key: key.to_string(),
            size_bytes: size,
            created_at,
            ttl_ms: EntryMeta::ttl_millis(ttl),
            summary: Summary::of(value, size),
            layout,
        };

        if let Some(previous) = previous {
            let keep: HashSet<String> = meta.payload_keys().into_iter().collect();
            for stale in previous.payload_keys() {
                if !keep.contains(&stale) {
                    trace!(key = %stale, "Removing stale cache part");
                    self.store.delete(&stale).await?;
                }
            }
        }

        let meta_bytes =
            serde_json::to_vec(&meta).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.put(&meta_key(key), meta_bytes, ttl).await?;

        debug!(
            key,
            size_bytes = size,
            parts = meta.layout.total_parts(),
            "Cached value"
        );
        Ok(key.to_string())
    }

    /// Cache a tool result under its deterministic key
    pub async fn put_result(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
        value: &Value,
    ) -> Result<String, CacheError> {
        self.put(&result_key(tool_name, arguments), value, None).await
    }

    /// Read the whole value back.
    ///
    /// A chunked entry with any part missing fails with
    /// `IncompleteCacheEntry`; partial data is never returned.
    pub async fn get(&self, key: &str) -> Result<Value, CacheError> {
        let _guard = self.lock_for(key).lock().await;

        let Some(meta) = self.read_meta(key).await? else {
            // Entry written without metadata
            return match self.store.get(key).await? {
                Some(bytes) => decode(key, &bytes),
                None => Err(CacheError::Miss(key.to_string())),
            };
        };

        let bytes = match &meta.layout {
            EntryLayout::Inline => self
                .store
                .get(key)
                .await?
                .ok_or_else(|| CacheError::incomplete(key, 0, 1))?,
            EntryLayout::Chunked {
                chunks,
                total_parts,
                original_size,
                ..
            } => {
                let reads = chunks.iter().map(|chunk_key| self.store.get(chunk_key));
                let parts = futures::future::join_all(reads).await;

                let mut bytes = Vec::with_capacity(*original_size);
                for (i, part) in parts.into_iter().enumerate() {
                    match part? {
                        Some(part) => bytes.extend_from_slice(&part),
                        None => {
                            warn!(key, missing_part = i, total_parts, "Cache entry incomplete");
                            return Err(CacheError::incomplete(key, i, *total_parts));
                        }
                    }
                }
                if bytes.len() != *original_size {
                    return Err(CacheError::Corrupt {
                        key: key.to_string(),
                        reason: format!(
                            "reassembled {} bytes, expected {}",
                            bytes.len(),
                            original_size
                        ),
                    });
                }
                bytes
            }
        };

        decode(key, &bytes)
    }

    pub async fn get_result(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<Value, CacheError> {
        self.get(&result_key(tool_name, arguments)).await
    }

    /// Describe an entry without reading its payload
    pub async fn summarize(&self, key: &str) -> Result<Summary, CacheError> {
        if let Some(meta) = self.read_meta(key).await? {
            return Ok(meta.summary);
        }
        let value = self.get(key).await?;
        let size = serde_json::to_vec(&value).map(|b| b.len()).unwrap_or(0);
        Ok(Summary::of(&value, size))
    }

    /// Metadata of a live entry
    pub async fn meta(&self, key: &str) -> Result<EntryMeta, CacheError> {
        self.read_meta(key)
            .await?
            .ok_or_else(|| CacheError::Miss(key.to_string()))
    }

    /// Remove an entry with all of its parts; returns whether it existed
    pub async fn evict(&self, key: &str) -> Result<bool, CacheError> {
        let _guard = self.lock_for(key).lock().await;

        let mut existed = false;
        if let Ok(Some(meta)) = self.read_raw_meta(key).await {
            for part in meta.payload_keys() {
                existed |= self.store.delete(&part).await?;
            }
        }
        existed |= self.store.delete(&meta_key(key)).await?;
        existed |= self.store.delete(key).await?;

        if existed {
            debug!(key, "Evicted cache entry");
        }
        Ok(existed)
    }

    /// Reclaim expired keys from the store
    pub async fn sweep(&self) -> Result<usize, CacheError> {
        Ok(self.store.sweep_expired().await?)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let StoreStats {
            keys,
            bytes,
            evictions,
        } = self.store.stats().await;
        let entries = self
            .store
            .keys()
            .await?
            .iter()
            .filter(|k| k.ends_with(":meta"))
            .count();
        Ok(CacheStats {
            entries,
            keys,
            bytes,
            evictions,
        })
    }

    /// Metadata if present and not expired
    async fn read_meta(&self, key: &str) -> Result<Option<EntryMeta>, CacheError> {
        let Some(meta) = self.read_raw_meta(key).await? else {
            return Ok(None);
        };
        if meta.is_expired(self.clock.now()) {
            trace!(key, "Cache entry expired");
            return Err(CacheError::Miss(key.to_string()));
        }
        Ok(Some(meta))
    }
}

impl CacheManager {
    /// Metadata regardless of expiry
    async fn read_raw_meta(&self, key: &str) -> Result<Option<EntryMeta>, CacheError> {
        let Some(bytes) = self.store.get(&meta_key(key)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: format!("unreadable metadata: {}", e),
            })
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Value, CacheError> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use async_trait::async_trait;
    use conductor_domain::SummaryKind;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Store that ignores TTLs; expiry is exercised through the manager's clock
    #[derive(Default)]
    pub(crate) struct MapStore {
        pub(crate) entries: StdMutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl CacheStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.entries.lock().unwrap().keys().cloned().collect())
        }

        async fn sweep_expired(&self) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn stats(&self) -> StoreStats {
            let entries = self.entries.lock().unwrap();
            StoreStats {
                keys: entries.len(),
                bytes: entries.values().map(Vec::len).sum(),
                evictions: 0,
            }
        }
    }

    fn manager(threshold: usize) -> (CacheManager, Arc<MapStore>, Arc<ManualClock>) {
        let store = Arc::new(MapStore::default());
        let clock = Arc::new(ManualClock::default());
        let manager = CacheManager::new(
            store.clone(),
            clock.clone(),
            CacheConfig::default().with_chunk_threshold(threshold),
        );
        (manager, store, clock)
    }

    /// A list whose serialized form is a little over `bytes`
    fn big_list(bytes: usize) -> Value {
        let item = "x".repeat(1000);
        Value::Array((0..bytes / 1003 + 1).map(|_| json!(item)).collect())
    }

    #[tokio::test]
    async fn test_round_trip_inline_and_chunked() {
        let (cache, store, _) = manager(512_000);

        for value in [json!([]), json!({}), json!({"a": 1}), big_list(2_000_000)] {
            cache.put("k", &value, None).await.unwrap();
            assert_eq!(cache.get("k").await.unwrap(), value);
        }
        // The last write was chunked; its inline predecessor is gone
        assert!(!store.entries.lock().unwrap().contains_key("k"));
    }

    #[tokio::test]
    async fn test_two_megabytes_in_four_chunks() {
        let (cache, store, _) = manager(512_000);
        let value = big_list(1_999_000);
        let size = serde_json::to_vec(&value).unwrap().len();
        assert!(size > 1_536_000 && size <= 2_048_000);

        cache.put("big", &value, None).await.unwrap();
        let meta = cache.meta("big").await.unwrap();
        assert_eq!(meta.layout.total_parts(), 4);
        {
            let entries = store.entries.lock().unwrap();
            assert!(entries.contains_key("big:chunk:3"));
            assert!(!entries.contains_key("big:chunk:4"));
            assert!(!entries.contains_key("big"));
        }

        store.entries.lock().unwrap().remove("big:chunk:3");
        match cache.get("big").await {
            Err(CacheError::Incomplete(DomainError::IncompleteCacheEntry {
                missing_part,
                total_parts,
                ..
            })) => {
                assert_eq!(missing_part, 3);
                assert_eq!(total_parts, 4);
            }
            other => panic!("expected incomplete entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overwrite_removes_stale_chunks() {
        let (cache, store, _) = manager(1000);
        cache.put("k", &big_list(5000), None).await.unwrap();
        assert!(store.entries.lock().unwrap().contains_key("k:chunk:4"));

        cache.put("k", &big_list(1500), None).await.unwrap();
        let entries = store.entries.lock().unwrap();
        assert!(entries.contains_key("k:chunk:1"));
        assert!(!entries.contains_key("k:chunk:4"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (cache, _, clock) = manager(512_000);
        cache
            .put("k", &json!([1, 2, 3]), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("k").await.is_ok());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("k").await.unwrap_err().is_miss());
        assert!(cache.summarize("k").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_sub_second_ttl_is_honored() {
        let (cache, _, clock) = manager(512_000);
        cache
            .put("k", &json!([1]), Some(Duration::from_millis(900)))
            .await
            .unwrap();
        assert_eq!(cache.meta("k").await.unwrap().ttl_ms, 900);
        assert_eq!(cache.get("k").await.unwrap(), json!([1]));

        clock.advance(Duration::from_millis(899));
        assert!(cache.get("k").await.is_ok());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("k").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let (cache, _, clock) = manager(512_000);
        cache
            .put(
                "k",
                &json!({"a": 1}),
                Some(Duration::from_secs(10_000_000_000_000)),
            )
            .await
            .unwrap();

        clock.advance(Duration::from_secs(100 * 365 * 24 * 3600));
        assert_eq!(cache.get("k").await.unwrap(), json!({"a": 1}));
        assert!(cache.summarize("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_summarize_reads_no_chunks() {
        let (cache, store, _) = manager(1000);
        let value = json!((0..500).map(|i| json!({"id": i})).collect::<Vec<_>>());
        cache.put("k", &value, None).await.unwrap();

        // Summaries live in metadata, so losing chunks does not matter
        store
            .entries
            .lock()
            .unwrap()
            .retain(|k, _| !k.contains(":chunk:"));
        let summary = cache.summarize("k").await.unwrap();
        assert_eq!(summary.kind, SummaryKind::List);
        assert_eq!(summary.length, Some(500));
        assert_eq!(summary.sample.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_miss_and_evict() {
        let (cache, store, _) = manager(1000);
        assert!(cache.get("absent").await.unwrap_err().is_miss());

        cache.put("k", &big_list(3000), None).await.unwrap();
        assert_eq!(cache.stats().await.unwrap().entries, 1);

        assert!(cache.evict("k").await.unwrap());
        assert!(store.entries.lock().unwrap().is_empty());
        assert!(!cache.evict("k").await.unwrap());
        assert!(cache.get("k").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_result_keys_ignore_argument_order() {
        let (cache, _, _) = manager(512_000);
        let a: HashMap<String, Value> =
            [("x".to_string(), json!(1)), ("y".to_string(), json!(2))].into();
        let b: HashMap<String, Value> =
            [("y".to_string(), json!(2)), ("x".to_string(), json!(1))].into();

        let key = cache.put_result("getMails", &a, &json!(["m"])).await.unwrap();
        assert!(key.starts_with("tool:getMails:"));
        assert_eq!(cache.get_result("getMails", &b).await.unwrap(), json!(["m"]));
    }

    #[tokio::test]
    async fn test_concurrent_writers_same_key() {
        let (cache, _, _) = manager(100);
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let value = json!(vec![i; 50]);
                cache.put("shared", &value, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whichever writer won, the entry is whole
        let value = cache.get("shared").await.unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 50);
        assert!(items.iter().all(|v| v == &items[0]));
    }
}
