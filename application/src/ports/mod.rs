//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod cache_store;
pub mod clock;
pub mod history_sink;
pub mod progress;
pub mod tool_invoker;
