//! What a submitted plan hands back to the planner.

use conductor_domain::{
    Binding, CallId, CallStatus, DomainError, ExecutionHistory, ExecutionStrategy,
    HistorySummary, SkipReason, TruncatedResult, TruncationInfo,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Final state of one call.
///
/// Deliberately free of timing and attempt data (that lives in the
/// history), so the same plan against a warm cache reports identically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallReport {
    pub id: CallId,
    pub tool_name: String,
    pub status: CallStatus,
    /// Added by the resolver to supply another call's input
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    /// Result after truncation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<TruncationInfo>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub truncated_fields: BTreeMap<String, TruncationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Where the full result can be fetched later
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DomainError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub omitted: BTreeSet<String>,
}

impl CallReport {
    pub(crate) fn with_result(mut self, result: TruncatedResult, cache_key: Option<String>) -> Self {
        self.value = Some(result.value);
        self.truncation = result.info;
        self.truncated_fields = result.fields;
        self.note = result.note;
        self.cache_key = cache_key;
        self
    }

    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some_and(|i| i.truncated) || !self.truncated_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub strategy: ExecutionStrategy,
    /// Call ids per execution group, in execution order
    pub groups: Vec<Vec<CallId>>,
    /// Every call of the plan, caller's calls first, then synthesized ones
    pub calls: Vec<CallReport>,
    /// Set when a critical failure or cancellation stopped the plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<SkipReason>,
    #[serde(skip)]
    pub history: ExecutionHistory,
}

impl PlanResult {
    pub fn get(&self, id: &str) -> Option<&CallReport> {
        self.calls.iter().find(|c| c.id.as_str() == id)
    }

    /// First call of the given tool
    pub fn by_tool(&self, tool: &str) -> Option<&CallReport> {
        self.calls.iter().find(|c| c.tool_name == tool)
    }

    pub fn count(&self, status: CallStatus) -> usize {
        self.calls.iter().filter(|c| c.status == status).count()
    }

    /// Every call succeeded
    pub fn is_success(&self) -> bool {
        self.calls.iter().all(|c| c.status == CallStatus::Succeeded)
    }

    pub fn summary(&self) -> HistorySummary {
        self.history.summary()
    }
}
