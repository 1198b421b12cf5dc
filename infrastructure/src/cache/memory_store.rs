//! In-memory [`CacheStore`]
//!
//! Keys expire by the injected [`Clock`]; an expired key reads as absent
//! and is reclaimed by [`CacheStore::sweep_expired`].
//!
//! Capacity counts cache entries, not raw keys: an entry's payload, its
//! `:meta` record and its `:chunk:<i>` parts share one slot of capacity and
//! are evicted together, least recently written entry first. The entry being
//! written is never evicted by its own parts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conductor_application::ports::cache_store::{CacheStore, StoreError, StoreStats};
use conductor_application::ports::clock::{Clock, SystemClock};
use conductor_domain::cache::entry_key;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

struct Slot {
    bytes: Vec<u8>,
    expires_at: DateTime<Utc>,
    /// Write order, for capacity eviction
    seq: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    next_seq: u64,
    evictions: u64,
}

impl State {
    /// Drop whole entries, oldest last write first, until at most `max` remain
    fn evict_entries_over(&mut self, max: usize, writing: &str) {
        let mut newest: HashMap<&str, u64> = HashMap::new();
        for (key, slot) in &self.slots {
            let seq = newest.entry(entry_key(key)).or_insert(slot.seq);
            *seq = (*seq).max(slot.seq);
        }
        if newest.len() <= max {
            return;
        }

        let mut by_age: Vec<(&str, u64)> = newest
            .into_iter()
            .filter(|(entry, _)| *entry != writing)
            .collect();
        by_age.sort_by_key(|(_, seq)| *seq);
        let excess = (by_age.len() + 1).saturating_sub(max);
        let doomed: Vec<String> = by_age
            .into_iter()
            .take(excess)
            .map(|(entry, _)| entry.to_string())
            .collect();

        for entry in doomed {
            let before = self.slots.len();
            self.slots.retain(|key, _| entry_key(key) != entry);
            trace!(entry = %entry, parts = before - self.slots.len(), "Evicting oldest entry");
            self.evictions += 1;
        }
    }
}

pub struct InMemoryCacheStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    /// Entries, 0 means unbounded
    max_entries: usize,
}

impl InMemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
            max_entries: 0,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = self.clock.now();
        let state = self.state();
        Ok(state
            .slots
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.bytes.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.slots.insert(
            key.to_string(),
            Slot {
                bytes: value,
                expires_at,
                seq,
            },
        );

        if self.max_entries > 0 {
            state.evict_entries_over(self.max_entries, entry_key(key));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.state().slots.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .state()
            .slots
            .iter()
            .filter(|(_, slot)| slot.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut state = self.state();
        let before = state.slots.len();
        state.slots.retain(|_, slot| slot.expires_at > now);
        let removed = before - state.slots.len();
        if removed > 0 {
            debug!(removed, "Swept expired cache keys");
        }
        Ok(removed)
    }

    async fn stats(&self) -> StoreStats {
        let now = self.clock.now();
        let state = self.state();
        let live = state.slots.values().filter(|slot| slot.expires_at > now);
        let (keys, bytes) = live.fold((0, 0), |(k, b), slot| (k + 1, b + slot.bytes.len()));
        StoreStats {
            keys,
            bytes,
            evictions: state.evictions,
        }
    }
}
