//! Execution history
//!
//! One [`ExecutionRecord`] per attempt (or per cache hit / skip), kept for
//! later analysis. Timestamps live here rather than in plan results, so two
//! identical plans produce identical results but distinct histories.

use super::execution_plan::SkipReason;
use crate::tool::call::CallId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happened during one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Succeeded,
    CacheHit,
    Failed {
        code: String,
        message: String,
        transient: bool,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl RecordOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            RecordOutcome::Succeeded => "succeeded",
            RecordOutcome::CacheHit => "cache_hit",
            RecordOutcome::Failed { .. } => "failed",
            RecordOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Succeeded | RecordOutcome::CacheHit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub call_id: CallId,
    pub tool_name: String,
    /// 1-based; 0 for records that involved no invocation
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

impl ExecutionRecord {
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Aggregate view over a history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Distinct calls with at least one record
    pub total_calls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cache_hits: usize,
    /// Invocations, including retries
    pub attempts: usize,
    pub retries: usize,
    /// succeeded / total_calls, 0.0 when empty
    pub success_rate: f64,
    pub total_duration_ms: u64,
    /// Mean duration of invocation attempts
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHistory {
    records: Vec<ExecutionRecord>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ExecutionRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Attempts of one call, in recording order
    pub fn for_call<'a>(
        &'a self,
        id: &CallId,
    ) -> impl Iterator<Item = &'a ExecutionRecord> + use<'a> {
        let id = id.clone();
        self.records.iter().filter(move |r| r.call_id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Final outcome per call is its last record
    pub fn summary(&self) -> HistorySummary {
        let mut last: HashMap<&CallId, &RecordOutcome> = HashMap::new();
        let mut attempts_per_call: HashMap<&CallId, usize> = HashMap::new();
        let mut attempt_durations = Vec::new();
        let mut cache_hits = 0;

        for record in &self.records {
            last.insert(&record.call_id, &record.outcome);
            match record.outcome {
                RecordOutcome::Succeeded | RecordOutcome::Failed { .. } => {
                    *attempts_per_call.entry(&record.call_id).or_default() += 1;
                    attempt_durations.push(record.duration_ms());
                }
                RecordOutcome::CacheHit => cache_hits += 1,
                RecordOutcome::Skipped { .. } => {}
            }
        }

        let mut summary = HistorySummary {
            total_calls: last.len(),
            cache_hits,
            ..Default::default()
        };
        for outcome in last.values() {
            match outcome {
                RecordOutcome::Succeeded | RecordOutcome::CacheHit => summary.succeeded += 1,
                RecordOutcome::Failed { .. } => summary.failed += 1,
                RecordOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }

        summary.attempts = attempt_durations.len();
        summary.retries = attempts_per_call.values().map(|n| n.saturating_sub(1)).sum();
        summary.total_duration_ms = attempt_durations.iter().sum();
        if !attempt_durations.is_empty() {
            summary.average_duration_ms =
                summary.total_duration_ms as f64 / attempt_durations.len() as f64;
        }
        if summary.total_calls > 0 {
            summary.success_rate = summary.succeeded as f64 / summary.total_calls as f64;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, attempt: u32, ms: i64, outcome: RecordOutcome) -> ExecutionRecord {
        let started_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        ExecutionRecord {
            call_id: CallId::new(id),
            tool_name: "getPayments".into(),
            attempt,
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(ms),
            outcome,
        }
    }

    fn timeout() -> RecordOutcome {
        RecordOutcome::Failed {
            code: "TIMEOUT".into(),
            message: "timed out".into(),
            transient: true,
        }
    }

    #[test]
    fn test_retries_then_success() {
        let mut history = ExecutionHistory::new();
        history.push(record("c1", 1, 100, timeout()));
        history.push(record("c1", 2, 100, timeout()));
        history.push(record("c1", 3, 40, RecordOutcome::Succeeded));

        let summary = history.summary();
        assert_eq!(summary.total_calls, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.total_duration_ms, 240);
        assert_eq!(summary.average_duration_ms, 80.0);
        assert_eq!(summary.success_rate, 1.0);
        assert_eq!(history.for_call(&CallId::new("c1")).count(), 3);
    }

    #[test]
    fn test_for_call_outlives_its_id_argument() {
        let mut history = ExecutionHistory::new();
        history.push(record("c1", 1, 10, timeout()));
        history.push(record("c2", 1, 10, RecordOutcome::Succeeded));
        history.push(record("c1", 2, 10, RecordOutcome::Succeeded));

        let attempts: Vec<&ExecutionRecord> = history.for_call(&CallId::new("c1")).collect();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].attempt, 1);
        assert_eq!(attempts[1].outcome, RecordOutcome::Succeeded);
    }

    #[test]
    fn test_mixed_outcomes() {
        let mut history = ExecutionHistory::new();
        history.push(record("a", 0, 0, RecordOutcome::CacheHit));
        history.push(record("b", 1, 10, timeout()));
        history.push(record(
            "c",
            0,
            0,
            RecordOutcome::Skipped {
                reason: SkipReason::Cancelled,
            },
        ));
        history.push(record("d", 1, 30, RecordOutcome::Succeeded));

        let summary = history.summary();
        assert_eq!(summary.total_calls, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.success_rate, 0.5);
    }

    #[test]
    fn test_empty_summary() {
        let summary = ExecutionHistory::new().summary();
        assert_eq!(summary, HistorySummary::default());
    }

    #[test]
    fn test_record_serializes_outcome_tag() {
        let json = serde_json::to_value(record("a", 1, 5, timeout())).unwrap();
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["code"], "TIMEOUT");
        assert_eq!(json["call_id"], "a");
    }
}
