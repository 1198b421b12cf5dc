//! Tool domain traits
//!
//! Contains pure validation of calls against descriptors.
//! The async invoker port is defined in the application layer (ports).

use super::call::ToolCall;
use super::entities::ToolDescriptor;
use super::value_objects::ToolError;
use std::collections::HashMap;

/// Validator for tool calls
///
/// Runs after dependency values have been bound, right before invocation,
/// without any I/O.
pub trait ToolValidator: Send + Sync {
    /// Validate the final arguments of a call against its descriptor
    fn validate(
        &self,
        descriptor: &ToolDescriptor,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ToolError>;

    fn validate_call(&self, call: &ToolCall, descriptor: &ToolDescriptor) -> Result<(), ToolError> {
        self.validate(descriptor, &call.arguments)
    }
}

/// Default implementation of ToolValidator
///
/// Required parameters must be present and non-null. Unknown arguments are
/// rejected only in strict mode.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator {
    strict: bool,
}

impl DefaultToolValidator {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        descriptor: &ToolDescriptor,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ToolError> {
        for param in descriptor.required_parameters() {
            match arguments.get(&param.name) {
                None => {
                    return Err(ToolError::invalid_argument(format!(
                        "Missing required parameter '{}' for tool '{}'",
                        param.name, descriptor.name
                    )));
                }
                Some(serde_json::Value::Null) => {
                    return Err(ToolError::invalid_argument(format!(
                        "Required parameter '{}' for tool '{}' is null",
                        param.name, descriptor.name
                    )));
                }
                Some(_) => {}
            }
        }

        if self.strict {
            for arg_name in arguments.keys() {
                if descriptor.parameter(arg_name).is_none() {
                    return Err(ToolError::invalid_argument(format!(
                        "Unknown parameter '{}' for tool '{}'",
                        arg_name, descriptor.name
                    )));
                }
            }
        }

        Ok(())
    }
}
