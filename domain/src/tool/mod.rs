//! Tool domain module
//!
//! Defines what a tool *is* to the orchestration core: a named, schema-described
//! remote operation, and the lifecycle of one requested invocation of it.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (catalog)      │    │ (invocation) │    │ (outcome)    │
//! └───────┬────────┘    └──────────────┘    └──────────────┘
//!         │
//!         ├─ parameters:       accountId (required, path)
//!         └─ declared outputs: id, name
//! ```
//!
//! # Key Types
//!
//! - [`ToolCatalog`]: Immutable name → descriptor table
//! - [`ToolDescriptor`]: Parameters, declared outputs, idempotency
//! - [`ToolCall`]: An invocation request plus its [`CallStatus`]
//! - [`ToolResult`] / [`ToolError`]: Outcome reported by the invoker
//! - [`ToolValidator`]: Pure argument validation
//! - [`ToolProvider`]: Source of descriptors (catalog files, generated specs)
//!
//! # Architecture
//!
//! - **Domain** (this module): Pure definitions, no I/O
//! - **Application** (`ToolInvokerPort`): Port trait for invocation
//! - **Infrastructure**: Fixture-backed and HTTP-backed invokers, JSON catalog provider

pub mod call;
pub mod entities;
pub mod provider;
pub mod traits;
pub mod value_objects;

pub use call::{CallId, CallStatus, ToolCall};
pub use entities::{ParameterLocation, ToolCatalog, ToolDescriptor, ToolParameter};
pub use provider::{ProviderError, StaticToolProvider, ToolProvider};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolResult, ToolResultMetadata};
