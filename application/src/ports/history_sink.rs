//! Port for persisting execution history.
//!
//! Defines the [`HistorySink`] trait for recording every attempt, cache hit
//! and skip of a plan to a structured log (e.g. JSONL), for later analysis.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures machine-readable
//! records.

use conductor_domain::{ExecutionRecord, ExecutionStrategy, HistorySummary};
use serde_json::{Value, json};

/// A structured history event.
///
/// Each event has a type string and a JSON payload; sinks add the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    /// Event type identifier ("call_attempt", "plan_completed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl HistoryEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn attempt(record: &ExecutionRecord) -> Self {
        Self::new(
            "call_attempt",
            serde_json::to_value(record).unwrap_or(Value::Null),
        )
    }

    pub fn plan_completed(
        strategy: ExecutionStrategy,
        summary: &HistorySummary,
        aborted: bool,
    ) -> Self {
        Self::new(
            "plan_completed",
            json!({
                "strategy": strategy.as_str(),
                "aborted": aborted,
                "summary": summary,
            }),
        )
    }
}

/// Port for recording history events.
///
/// `record` is synchronous and non-fallible so persistence problems never
/// disturb plan execution; implementations log and drop on failure.
pub trait HistorySink: Send + Sync {
    fn record(&self, event: HistoryEvent);
}

/// No-op implementation for tests and when history persistence is disabled.
pub struct NoHistorySink;

impl HistorySink for NoHistorySink {
    fn record(&self, _event: HistoryEvent) {}
}
