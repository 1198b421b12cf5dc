//! Tool call lifecycle.
//!
//! A [`ToolCall`] is one requested invocation inside a plan. Its
//! [`CallStatus`] only moves forward:
//!
//! ```text
//! Pending ──> AwaitingDependency ──> Ready ──> Running ──> Succeeded
//!    │               │                 │          └──────> Failed
//!    │               │                 └─────────────────> Skipped
//!    │               └───────────────────────────────────> Skipped
//!    ├──> Ready
//!    └──> Failed / Skipped   (resolution failure, aborted plan)
//! ```
//!
//! Invalid transitions are rejected and leave the status untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Name fragments that make a tool critical when the caller does not say
const CRITICAL_NAME_PATTERNS: &[&str] = &["login", "authenticate", "setup", "initialize"];

/// Unique identifier for a call within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for CallId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

/// Lifecycle status of a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Pending,
    AwaitingDependency,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::AwaitingDependency => "awaiting_dependency",
            CallStatus::Ready => "ready",
            CallStatus::Running => "running",
            CallStatus::Succeeded => "succeeded",
            CallStatus::Failed => "failed",
            CallStatus::Skipped => "skipped",
        }
    }

    /// Whether this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Succeeded | CallStatus::Failed | CallStatus::Skipped
        )
    }

    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Pending, AwaitingDependency | Ready | Failed | Skipped)
                | (AwaitingDependency, Ready | Failed | Skipped)
                | (Ready, Running | Failed | Skipped)
                | (Running, Succeeded | Failed)
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A call to a tool with (possibly incomplete) arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier, unique within one plan
    pub id: CallId,
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments supplied by the caller; missing ones may be resolved
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
    /// Abort the whole plan if this call fails. `None` falls back to the
    /// tool-name heuristic (login / authenticate / setup / initialize).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    /// Parameters whose provider may fail without skipping this call
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub optional_dependencies: BTreeSet<String>,
    /// Optional reasoning for why this tool is being called
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip)]
    status: CallStatus,
}

impl ToolCall {
    pub fn new(id: impl Into<CallId>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
            critical: None,
            optional_dependencies: BTreeSet::new(),
            reasoning: None,
            status: CallStatus::Pending,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    pub fn with_optional_dependency(mut self, parameter: impl Into<String>) -> Self {
        self.optional_dependencies.insert(parameter.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    /// Move to `next` if the transition is valid. Returns whether it applied.
    pub fn transition(&mut self, next: CallStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    pub fn is_critical(&self) -> bool {
        self.critical.unwrap_or_else(|| {
            let lower = self.tool_name.to_lowercase();
            CRITICAL_NAME_PATTERNS.iter().any(|p| lower.contains(p))
        })
    }

    pub fn is_optional_dependency(&self, parameter: &str) -> bool {
        self.optional_dependencies.contains(parameter)
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}
