//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod cache_manager;
pub mod fetch_cached;
pub(crate) mod shared;
pub mod submit_plan;
