//! Domain error types
//!
//! Every failure handed back to the planner is one of these variants. Each
//! variant names the originating tool (where there is one) and the parameter
//! or dependency at fault, so a caller can act on it without reading logs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainError {
    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Cannot resolve parameter '{parameter}' for tool '{tool}': {suggestion}")]
    DependencyUnresolved {
        tool: String,
        parameter: String,
        suggestion: String,
    },

    #[error("Cyclic dependency involving '{tool}': {}", .cycle.join(" -> "))]
    CyclicDependency { tool: String, cycle: Vec<String> },

    #[error("Tool '{tool}' failed [{code}]: {message}")]
    ToolExecution {
        tool: String,
        code: String,
        message: String,
        transient: bool,
    },

    #[error("Tool '{tool}' timed out after {after_ms}ms")]
    Timeout { tool: String, after_ms: u64 },

    #[error("Cache entry '{key}' is incomplete: part {missing_part} of {total_parts} is missing")]
    IncompleteCacheEntry {
        key: String,
        missing_part: usize,
        total_parts: usize,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Whether a retry of the same call could succeed.
    ///
    /// Timeouts and transient tool failures (5xx-equivalent) are retryable;
    /// validation, dependency and cache errors never are.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Timeout { .. } => true,
            DomainError::ToolExecution { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Whether this error came out of dependency resolution
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            DomainError::DependencyUnresolved { .. } | DomainError::CyclicDependency { .. }
        )
    }

    /// Name of the tool the error originated from, if any
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            DomainError::DuplicateTool { name } => Some(name),
            DomainError::DependencyUnresolved { tool, .. }
            | DomainError::CyclicDependency { tool, .. }
            | DomainError::ToolExecution { tool, .. }
            | DomainError::Timeout { tool, .. } => Some(tool),
            _ => None,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::DuplicateTool { .. } => "DUPLICATE_TOOL",
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::DependencyUnresolved { .. } => "DEPENDENCY_UNRESOLVED",
            DomainError::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            DomainError::ToolExecution { .. } => "TOOL_EXECUTION",
            DomainError::Timeout { .. } => "TIMEOUT",
            DomainError::IncompleteCacheEntry { .. } => "INCOMPLETE_CACHE_ENTRY",
            DomainError::Cancelled => "CANCELLED",
        }
    }
}
