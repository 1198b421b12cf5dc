//! Tool domain value objects: what a tool invocation hands back.
//!
//! Every invocation produces a [`ToolResult`] carrying either a JSON value
//! or a [`ToolError`]. Error codes drive the **retry policy**:
//!
//! | Code | Transient? | Typical origin |
//! |------|-----------|----------------|
//! | `UNAVAILABLE` | Yes | 5xx response, connection failure |
//! | `RATE_LIMITED` | Yes | 429 response |
//! | `TIMEOUT` | Yes | Call exceeded its deadline |
//! | `INVALID_ARGUMENT` | No | 400/422, schema validation |
//! | `NOT_FOUND` | No | 404, unknown tool |
//! | `PERMISSION_DENIED` | No | 401/403 |
//! | `EXECUTION_FAILED` | No | Anything else |

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Error reported by a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "UNAVAILABLE")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP-equivalent status, when the backend reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    // Common error constructors
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Self::new(
            "PERMISSION_DENIED",
            format!("Permission denied: {}", resource.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("UNAVAILABLE", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }

    /// Classify an HTTP-style status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            429 => "RATE_LIMITED",
            500..=599 => "UNAVAILABLE",
            401 | 403 => "PERMISSION_DENIED",
            404 => "NOT_FOUND",
            400..=499 => "INVALID_ARGUMENT",
            _ => "EXECUTION_FAILED",
        };
        Self::new(code, message).with_status(status)
    }

    /// Whether repeating the call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code.as_str(),
            "UNAVAILABLE" | "RATE_LIMITED" | "TIMEOUT"
        )
    }

    /// Lift into the domain taxonomy, attributing it to `tool`
    pub fn into_domain(self, tool: impl Into<String>) -> DomainError {
        let message = match self.details {
            Some(details) => format!("{} ({})", self.message, details),
            None => self.message,
        };
        let transient = matches!(
            self.code.as_str(),
            "UNAVAILABLE" | "RATE_LIMITED" | "TIMEOUT"
        );
        DomainError::ToolExecution {
            tool: tool.into(),
            code: self.code,
            message,
            transient,
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool invocation, carrying a value or error information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Returned payload (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Metadata about the execution
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Structured metadata about a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of bytes returned by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Backend status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            value: Some(value),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            value: None,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Add duration metadata
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    /// Add status metadata
    pub fn with_status(mut self, status: u16) -> Self {
        self.metadata.status = Some(status);
        self
    }

    /// Check if execution was successful
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get the error
    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Collapse into a `Result`. A success without a value yields `null`;
    /// a failure without an error yields `EXECUTION_FAILED`.
    pub fn into_result(self) -> Result<serde_json::Value, ToolError> {
        if self.success {
            Ok(self.value.unwrap_or(serde_json::Value::Null))
        } else {
            Err(self
                .error
                .unwrap_or_else(|| ToolError::execution_failed("tool reported failure without detail")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("/accounts/9").with_details("no such account");

        assert_eq!(err.code, "NOT_FOUND");
        assert!(err.message.contains("/accounts/9"));
        assert!(err.details.is_some());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_status_classification() {
        assert!(ToolError::from_status(503, "down").is_transient());
        assert!(ToolError::from_status(500, "boom").is_transient());
        assert!(ToolError::from_status(429, "slow down").is_transient());
        assert_eq!(ToolError::from_status(422, "bad").code, "INVALID_ARGUMENT");
        assert_eq!(ToolError::from_status(403, "no").code, "PERMISSION_DENIED");
        assert!(!ToolError::from_status(404, "gone").is_transient());
        assert_eq!(ToolError::from_status(404, "gone").status, Some(404));
    }

    #[test]
    fn test_into_domain_keeps_transience() {
        let err = ToolError::unavailable("upstream 502").into_domain("getPayments");
        assert!(err.is_transient());
        assert_eq!(err.tool_name(), Some("getPayments"));

        let err = ToolError::invalid_argument("limit must be positive").into_domain("getPayments");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("getAccounts", json!([{"id": 1}])).with_duration(12);

        assert!(result.is_success());
        assert!(result.error().is_none());
        assert_eq!(result.metadata.duration_ms, Some(12));
        assert_eq!(result.into_result().unwrap(), json!([{"id": 1}]));
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("deleteAccount", ToolError::permission_denied("acc-1"));

        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "PERMISSION_DENIED");
        assert_eq!(result.into_result().unwrap_err().code, "PERMISSION_DENIED");
    }
}
