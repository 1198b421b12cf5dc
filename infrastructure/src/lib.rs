//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer:
//!
//! - [`cache`]: in-memory [`CacheStore`](conductor_application::CacheStore)
//!   and the background expiry sweeper
//! - [`tools`]: JSON catalog provider, fixture and HTTP invokers
//! - [`logging`]: JSONL execution history
//! - [`config`]: TOML/env configuration loading

pub mod cache;
pub mod config;
pub mod logging;
pub mod tools;

// Re-export commonly used types
pub use cache::{CacheSweeper, InMemoryCacheStore};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::JsonlHistorySink;
#[cfg(feature = "http-invoker")]
pub use tools::HttpToolInvoker;
pub use tools::{FixtureInvoker, JsonCatalogProvider};
