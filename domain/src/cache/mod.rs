//! Cache domain module
//!
//! Pure pieces of the result cache: deterministic keys, entry metadata with
//! inline or chunked layout, and payload summaries. Storage and TTL
//! enforcement live behind the application layer's `CacheStore` port.

pub mod entry;
pub mod key;
pub mod summary;

pub use entry::{EntryLayout, EntryMeta, chunk_count, split_chunks};
pub use key::{canonical_json, chunk_key, entry_key, meta_key, result_key};
pub use summary::{NumericStats, Summary, SummaryKind};
