//! Fixture invoker: canned responses instead of remote calls.
//!
//! Used for offline runs (`conductor run --fixtures`) and tests. The
//! fixture file maps tool names to responses:
//!
//! ```json
//! {
//!   "getAccounts": [{ "accountId": "a1" }],
//!   "getMails": { "$error": { "code": "UNAVAILABLE", "message": "mail backend down" } },
//!   "getPayments": { "$sequence": [
//!     { "$error": { "code": "RATE_LIMITED", "message": "slow down" } },
//!     { "items": [{ "paymentId": "p1" }] }
//!   ]}
//! }
//! ```
//!
//! Any other JSON value is returned as the result. A `$sequence` is served
//! in order, one entry per invocation, and its last entry repeats.

use async_trait::async_trait;
use conductor_application::ports::tool_invoker::ToolInvokerPort;
use conductor_domain::tool::{
    entities::ToolDescriptor,
    value_objects::{ToolError, ToolResult},
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

const ERROR_KEY: &str = "$error";
const SEQUENCE_KEY: &str = "$sequence";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixtures {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixtures: {0}")]
    Invalid(String),
}

/// One canned reply
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureResponse {
    Value(Value),
    Error(ToolError),
}

impl FixtureResponse {
    fn parse(tool: &str, raw: Value) -> Result<Self, FixtureError> {
        match raw {
            Value::Object(mut map) if map.len() == 1 && map.contains_key(ERROR_KEY) => {
                let error = map.remove(ERROR_KEY).unwrap_or(Value::Null);
                serde_json::from_value(error)
                    .map(FixtureResponse::Error)
                    .map_err(|e| FixtureError::Invalid(format!("{}: bad $error: {}", tool, e)))
            }
            other => Ok(FixtureResponse::Value(other)),
        }
    }

    fn into_result(self, tool: &str) -> ToolResult {
        match self {
            FixtureResponse::Value(value) => ToolResult::success(tool, value),
            FixtureResponse::Error(error) => ToolResult::failure(tool, error),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: Vec<FixtureResponse>,
    served: usize,
}

impl Script {
    fn next(&mut self) -> Option<FixtureResponse> {
        let index = self.served.min(self.responses.len().checked_sub(1)?);
        self.served += 1;
        self.responses.get(index).cloned()
    }
}

/// [`ToolInvokerPort`] answering from a fixture table.
#[derive(Debug, Default)]
pub struct FixtureInvoker {
    scripts: Mutex<HashMap<String, Script>>,
    latency: Option<Duration>,
}

impl FixtureInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(document: Value) -> Result<Self, FixtureError> {
        let Value::Object(entries) = document else {
            return Err(FixtureError::Invalid(
                "fixtures must be an object keyed by tool name".into(),
            ));
        };

        let mut invoker = Self::new();
        for (tool, raw) in entries {
            let responses = match raw {
                Value::Object(mut map) if map.len() == 1 && map.contains_key(SEQUENCE_KEY) => {
                    match map.remove(SEQUENCE_KEY) {
                        Some(Value::Array(items)) if !items.is_empty() => items
                            .into_iter()
                            .map(|item| FixtureResponse::parse(&tool, item))
                            .collect::<Result<Vec<_>, _>>()?,
                        _ => {
                            return Err(FixtureError::Invalid(format!(
                                "{}: $sequence must be a non-empty array",
                                tool
                            )));
                        }
                    }
                }
                other => vec![FixtureResponse::parse(&tool, other)?],
            };
            invoker.insert(tool, responses);
        }
        Ok(invoker)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let document = serde_json::from_str(&content)
            .map_err(|e| FixtureError::Invalid(format!("{}: {}", path.display(), e)))?;
        Self::from_json(document)
    }

    pub fn with_response(self, tool: impl Into<String>, value: Value) -> Self {
        self.with_sequence(tool, vec![FixtureResponse::Value(value)])
    }

    pub fn with_failure(self, tool: impl Into<String>, error: ToolError) -> Self {
        self.with_sequence(tool, vec![FixtureResponse::Error(error)])
    }

    pub fn with_sequence(mut self, tool: impl Into<String>, responses: Vec<FixtureResponse>) -> Self {
        self.insert(tool.into(), responses);
        self
    }

    /// Delay every reply, to make parallelism observable
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// How many times `tool` has been invoked
    pub fn invocations(&self, tool: &str) -> usize {
        self.scripts()
            .get(tool)
            .map(|script| script.served)
            .unwrap_or(0)
    }

    pub fn tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scripts().keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(&mut self, tool: String, responses: Vec<FixtureResponse>) {
        self.scripts
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                tool,
                Script {
                    responses,
                    served: 0,
                },
            );
    }

    fn scripts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Script>> {
        self.scripts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ToolInvokerPort for FixtureInvoker {
    async fn invoke(&self, tool: &ToolDescriptor, arguments: &HashMap<String, Value>) -> ToolResult {
        trace!(tool = %tool.name, ?arguments, "Fixture invocation");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self.scripts().get_mut(&tool.name).and_then(Script::next);
        match response {
            Some(response) => response.into_result(&tool.name),
            None => {
                debug!(tool = %tool.name, "No fixture for tool");
                ToolResult::failure(
                    &tool.name,
                    ToolError::not_found(format!("fixture for {}", tool.name)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> HashMap<String, Value> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_values_errors_and_sequences() {
        let invoker = FixtureInvoker::from_json(json!({
            "getAccounts": [{"accountId": "a1"}],
            "getMails": {"$error": {"code": "UNAVAILABLE", "message": "down", "status": 503}},
            "getPayments": {"$sequence": [
                {"$error": {"code": "RATE_LIMITED", "message": "slow down"}},
                {"items": []}
            ]}
        }))
        .unwrap();

        let accounts = invoker
            .invoke(&ToolDescriptor::new("getAccounts"), &args())
            .await;
        assert!(accounts.success);
        assert_eq!(accounts.value, Some(json!([{"accountId": "a1"}])));

        let mails = invoker.invoke(&ToolDescriptor::new("getMails"), &args()).await;
        let error = mails.error.unwrap();
        assert!(error.is_transient());
        assert_eq!(error.status, Some(503));

        let payments = ToolDescriptor::new("getPayments");
        assert!(!invoker.invoke(&payments, &args()).await.success);
        for _ in 0..2 {
            let result = invoker.invoke(&payments, &args()).await;
            assert_eq!(result.value, Some(json!({"items": []})));
        }
        assert_eq!(invoker.invocations("getPayments"), 3);
        assert_eq!(invoker.tools(), vec!["getAccounts", "getMails", "getPayments"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let invoker = FixtureInvoker::new();
        let result = invoker.invoke(&ToolDescriptor::new("nope"), &args()).await;
        assert_eq!(result.error.unwrap().code, "NOT_FOUND");
        assert_eq!(invoker.invocations("nope"), 0);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(FixtureInvoker::from_json(json!([1, 2])).is_err());
        assert!(FixtureInvoker::from_json(json!({"t": {"$sequence": []}})).is_err());
        assert!(FixtureInvoker::from_json(json!({"t": {"$error": "boom"}})).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures.json");
        std::fs::write(&path, r#"{"getAccounts": []}"#).unwrap();

        assert_eq!(FixtureInvoker::from_file(&path).unwrap().tools(), vec!["getAccounts"]);
        assert!(matches!(
            FixtureInvoker::from_file(dir.path().join("missing.json")),
            Err(FixtureError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_builders() {
        let invoker = FixtureInvoker::new()
            .with_response("getAccounts", json!([]))
            .with_failure("getMails", ToolError::invalid_argument("bad"));

        assert!(
            invoker
                .invoke(&ToolDescriptor::new("getAccounts"), &args())
                .await
                .success
        );
        let mails = invoker.invoke(&ToolDescriptor::new("getMails"), &args()).await;
        assert!(!mails.error.unwrap().is_transient());
    }
}
