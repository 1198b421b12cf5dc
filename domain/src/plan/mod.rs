//! Plan domain module
//!
//! - [`ExecutionPlan`]: resolved calls layered into ordered groups, plus
//!   failure propagation
//! - [`ExecutionStrategy`]: concurrency within a group
//! - [`ExecutionHistory`]: per-attempt records and their summary

pub mod execution_plan;
pub mod history;
pub mod strategy;

pub use execution_plan::{ExecutionPlan, PlannedCall, SkipReason};
pub use history::{ExecutionHistory, ExecutionRecord, HistorySummary, RecordOutcome};
pub use strategy::ExecutionStrategy;
