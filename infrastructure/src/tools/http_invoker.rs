//! HTTP invoker: forwards each call to a tool gateway.
//!
//! `POST {base_url}/tools/{name}` with the arguments as a JSON object. A 2xx
//! body is the result value (an empty body reads as `null`). Any other
//! status is classified with [`ToolError::from_status`]: 5xx and 429 are
//! transient, other 4xx are not. Transport failures are transient.

use async_trait::async_trait;
use conductor_application::ports::tool_invoker::ToolInvokerPort;
use conductor_domain::tool::{
    entities::ToolDescriptor,
    value_objects::{ToolError, ToolResult},
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("conductor/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed back into a [`ToolError`]
const MAX_ERROR_BODY: usize = 2048;

pub struct HttpToolInvoker {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpToolInvoker {
    /// The client timeout backs up the orchestrator's own per-call deadline.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn endpoint(&self, tool: &str) -> String {
        format!("{}/tools/{}", self.base_url, tool)
    }

    fn transport_error(tool: &str, error: &reqwest::Error) -> ToolError {
        if error.is_timeout() {
            ToolError::timeout(tool)
        } else {
            ToolError::unavailable(format!("request failed: {}", error))
        }
    }
}

#[async_trait]
impl ToolInvokerPort for HttpToolInvoker {
    async fn invoke(&self, tool: &ToolDescriptor, arguments: &HashMap<String, Value>) -> ToolResult {
        let start = Instant::now();
        let url = self.endpoint(&tool.name);
        debug!(tool = %tool.name, url = %url, "Invoking tool over HTTP");

        let mut request = self.client.post(&url).json(arguments);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "Tool request failed");
                return ToolResult::failure(&tool.name, Self::transport_error(&tool.name, &e));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return ToolResult::failure(&tool.name, Self::transport_error(&tool.name, &e));
            }
        };
        let elapsed = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let message = match text.char_indices().nth(MAX_ERROR_BODY) {
                Some((cut, _)) => format!("{}...", &text[..cut]),
                None if text.is_empty() => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                None => text.into_owned(),
            };
            return ToolResult::failure(&tool.name, ToolError::from_status(status.as_u16(), message))
                .with_duration(elapsed);
        }

        let value = if body.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&body) {
                Ok(value) => value,
                Err(e) => {
                    return ToolResult::failure(
                        &tool.name,
                        ToolError::execution_failed(format!("response is not JSON: {}", e)),
                    )
                    .with_duration(elapsed);
                }
            }
        };

        let mut result = ToolResult::success(&tool.name, value).with_duration(elapsed);
        result.metadata.bytes = Some(body.len());
        result.metadata.status = Some(status.as_u16());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let invoker =
            HttpToolInvoker::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            invoker.endpoint("getMails"),
            "http://localhost:8080/tools/getMails"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Port 9 (discard) is not expected to accept HTTP connections
        let invoker = HttpToolInvoker::new("http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap()
            .with_bearer_token("secret");
        let result = invoker
            .invoke(&ToolDescriptor::new("getMails"), &HashMap::new())
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().is_transient());
    }
}
