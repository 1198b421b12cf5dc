//! Tool domain entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Where a parameter travels in the underlying request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Body => "body",
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type hint (e.g., "string", "integer", "object")
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
    /// Where the parameter is sent
    #[serde(default)]
    pub location: ParameterLocation,
    /// Parameter description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: default_param_type(),
            required,
            location: ParameterLocation::default(),
            description: String::new(),
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn with_location(mut self, location: ParameterLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Descriptor of a remote operation the planner can call.
///
/// Immutable once registered. `declared_outputs` lists the field names the
/// tool is known to return; the dependency resolver matches missing
/// parameters of other tools against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "getAccounts")
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameter specifications, in declaration order
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    /// Field names this tool is known to produce
    #[serde(default, alias = "declaredOutputs")]
    pub declared_outputs: BTreeSet<String>,
    /// Safe to repeat: retried on transient failure and served from cache
    #[serde(default = "default_true")]
    pub idempotent: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            declared_outputs: BTreeSet::new(),
            idempotent: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_output(mut self, field: impl Into<String>) -> Self {
        self.declared_outputs.insert(field.into());
        self
    }

    pub fn with_outputs(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.declared_outputs
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Required parameters absent from `arguments`, in declaration order
    pub fn missing_required<'a>(
        &'a self,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Vec<&'a ToolParameter> {
        self.required_parameters()
            .filter(|p| !arguments.contains_key(&p.name))
            .collect()
    }

    pub fn produces(&self, field: &str) -> bool {
        self.declared_outputs.contains(field)
    }
}

/// Immutable table of registered tools.
///
/// Keyed by name in sorted order so iteration (and everything derived from
/// it, like dependency edges) is deterministic. Hot reload never mutates a
/// catalog in place; a new one is built and swapped in by the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Build a catalog, failing on the first duplicate name
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
    ) -> Result<Self, DomainError> {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            catalog.register(descriptor)?;
        }
        Ok(catalog)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), DomainError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(DomainError::DuplicateTool {
                name: descriptor.name,
            });
        }
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Register a tool (builder pattern)
    pub fn with(mut self, descriptor: ToolDescriptor) -> Result<Self, DomainError> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, DomainError> {
        self.tools
            .get(name)
            .ok_or_else(|| DomainError::not_found(format!("tool '{}'", name)))
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
