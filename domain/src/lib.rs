//! Domain layer for conductor
//!
//! This crate contains the core types and synchronous logic of the
//! orchestration engine. It has no dependencies on an async runtime,
//! storage or transport.
//!
//! # Core Concepts
//!
//! ## Tools and calls
//!
//! A **tool** is a named, schema-described remote operation
//! ([`ToolDescriptor`]). A [`ToolCall`] asks for one invocation of it, possibly
//! with arguments missing.
//!
//! ## Dependencies
//!
//! Missing arguments are filled from other tools' declared outputs. The
//! [`DependencyResolver`] picks a provider per parameter and detects cycles;
//! the [`ExecutionPlan`] layers the result into groups that run in order.
//!
//! ## Results
//!
//! Results are cached under deterministic keys ([`result_key`]), described by
//! a [`Summary`], and bounded by a [`Truncator`] before reaching the planner.

pub mod cache;
pub mod core;
pub mod dependency;
pub mod plan;
pub mod tool;
pub mod truncation;

// Re-export commonly used types
pub use cache::{EntryLayout, EntryMeta, Summary, SummaryKind, result_key};
pub use core::error::DomainError;
pub use dependency::{
    Binding, DependencyEdge, DependencyIndex, DependencyResolver, HeuristicScoring, MatchRule,
    RelationshipOverride, Resolution, ResolvedCall,
};
pub use plan::{
    ExecutionHistory, ExecutionPlan, ExecutionRecord, ExecutionStrategy, HistorySummary,
    PlannedCall, RecordOutcome, SkipReason,
};
pub use tool::{
    CallId, CallStatus, DefaultToolValidator, ParameterLocation, ProviderError,
    StaticToolProvider, ToolCall, ToolCatalog, ToolDescriptor, ToolError, ToolParameter,
    ToolProvider, ToolResult, ToolValidator,
};
pub use truncation::{TruncatedResult, TruncationInfo, Truncator};
