//! Tool Invoker port
//!
//! Defines the interface for performing the actual remote call behind a tool.

use async_trait::async_trait;
use conductor_domain::tool::{entities::ToolDescriptor, value_objects::ToolResult};
use serde_json::Value;
use std::collections::HashMap;

/// Port for tool invocation
///
/// Given a descriptor and final arguments, performs the remote call and
/// reports `{status, value | error}` as a [`ToolResult`]. Implementations
/// may authenticate on their own. Failures are reported in the result, never
/// by panicking; the orchestrator classifies them through
/// [`ToolError::is_transient`](conductor_domain::ToolError::is_transient).
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ToolInvokerPort: Send + Sync {
    /// Invoke a tool asynchronously
    async fn invoke(&self, tool: &ToolDescriptor, arguments: &HashMap<String, Value>)
    -> ToolResult;
}
