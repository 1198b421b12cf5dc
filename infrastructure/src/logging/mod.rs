//! Logging infrastructure: persisted execution history.
//!
//! Provides [`JsonlHistorySink`], a JSONL file writer that implements
//! the [`HistorySink`](conductor_application::HistorySink) port.

mod jsonl_history;

pub use jsonl_history::JsonlHistorySink;
