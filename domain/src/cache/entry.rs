//! Cache entry metadata and chunk layout

use super::key::chunk_key;
use super::summary::Summary;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// How the serialized payload is laid out in the store.
///
/// Inline and chunked storage are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum EntryLayout {
    /// Stored under the entry key itself
    Inline,
    /// Stored under `key:chunk:0..total_parts`
    Chunked {
        chunks: Vec<String>,
        total_parts: usize,
        original_size: usize,
        chunk_size: usize,
    },
}

impl EntryLayout {
    pub fn chunked(key: &str, original_size: usize, chunk_size: usize) -> Self {
        let total_parts = chunk_count(original_size, chunk_size);
        Self::Chunked {
            chunks: (0..total_parts).map(|i| chunk_key(key, i)).collect(),
            total_parts,
            original_size,
            chunk_size,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, EntryLayout::Chunked { .. })
    }

    pub fn total_parts(&self) -> usize {
        match self {
            EntryLayout::Inline => 1,
            EntryLayout::Chunked { total_parts, .. } => *total_parts,
        }
    }
}

/// Metadata stored under `key:meta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub key: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub ttl_ms: u64,
    pub summary: Summary,
    #[serde(flatten)]
    pub layout: EntryLayout,
}

impl EntryMeta {
    /// Whole milliseconds covering `ttl`, rounded up
    pub fn ttl_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
    }

    /// Saturates at the latest representable instant
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Storage keys holding the payload, in order
    pub fn payload_keys(&self) -> Vec<String> {
        match &self.layout {
            EntryLayout::Inline => vec![self.key.clone()],
            EntryLayout::Chunked { chunks, .. } => chunks.clone(),
        }
    }
}

/// Number of parts needed for `size` bytes; an empty payload still has one part
pub fn chunk_count(size: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 1;
    }
    size.div_ceil(chunk_size).max(1)
}

/// Split serialized bytes into fixed-size parts (the last may be shorter)
pub fn split_chunks(bytes: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if bytes.is_empty() || chunk_size == 0 {
        return vec![bytes];
    }
    bytes.chunks(chunk_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::summary::Summary;
    use serde_json::json;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(2_000_000, 512_000), 4);
        assert_eq!(chunk_count(512_000, 512_000), 1);
        assert_eq!(chunk_count(512_001, 512_000), 2);
        assert_eq!(chunk_count(0, 512_000), 1);
    }

    #[test]
    fn test_split_chunks_reassembles() {
        let bytes: Vec<u8> = (0..10u8).collect();
        let parts = split_chunks(&bytes, 4);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], &[8, 9]);
        assert_eq!(parts.concat(), bytes);
    }

    #[test]
    fn test_chunked_layout_keys() {
        let layout = EntryLayout::chunked("k", 10, 4);
        match &layout {
            EntryLayout::Chunked {
                chunks,
                total_parts,
                ..
            } => {
                assert_eq!(*total_parts, 3);
                assert_eq!(chunks, &vec!["k:chunk:0", "k:chunk:1", "k:chunk:2"]);
            }
            EntryLayout::Inline => panic!("expected chunked layout"),
        }
    }

    #[test]
    fn test_expiry() {
        let created_at = Utc::now();
        let meta = EntryMeta {
            key: "k".into(),
            size_bytes: 2,
            created_at,
            ttl_ms: 60_000,
            summary: Summary::of(&json!([]), 2),
            layout: EntryLayout::Inline,
        };

        assert!(!meta.is_expired(created_at + TimeDelta::seconds(59)));
        assert!(meta.is_expired(created_at + TimeDelta::seconds(60)));
        assert_eq!(meta.payload_keys(), vec!["k"]);
    }

    #[test]
    fn test_sub_second_ttl_is_kept() {
        assert_eq!(EntryMeta::ttl_millis(Duration::from_millis(900)), 900);
        assert_eq!(EntryMeta::ttl_millis(Duration::from_micros(1)), 1);
        assert_eq!(EntryMeta::ttl_millis(Duration::ZERO), 0);

        let created_at = Utc::now();
        let meta = EntryMeta {
            key: "k".into(),
            size_bytes: 2,
            created_at,
            ttl_ms: 900,
            summary: Summary::of(&json!([]), 2),
            layout: EntryLayout::Inline,
        };
        assert!(!meta.is_expired(created_at));
        assert!(!meta.is_expired(created_at + TimeDelta::milliseconds(899)));
        assert!(meta.is_expired(created_at + TimeDelta::milliseconds(900)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let created_at = Utc::now();
        let meta = EntryMeta {
            key: "k".into(),
            size_bytes: 2,
            created_at,
            ttl_ms: EntryMeta::ttl_millis(Duration::from_secs(10_000_000_000_000)),
            summary: Summary::of(&json!([]), 2),
            layout: EntryLayout::Inline,
        };
        assert_eq!(meta.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!meta.is_expired(created_at));

        let max = EntryMeta {
            ttl_ms: u64::MAX,
            ..meta
        };
        assert_eq!(max.expires_at(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_meta_serializes_flat_layout() {
        let meta = EntryMeta {
            key: "k".into(),
            size_bytes: 10,
            created_at: Utc::now(),
            ttl_ms: 60_000,
            summary: Summary::of(&json!([1, 2]), 10),
            layout: EntryLayout::chunked("k", 10, 4),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["layout"], "chunked");
        assert_eq!(json["total_parts"], 3);

        let back: EntryMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
