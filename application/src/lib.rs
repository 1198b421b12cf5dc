//! Application layer for conductor
//!
//! This crate contains use cases, port definitions, application configuration
//! and the tool registry. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::{
    CacheConfig, ConductorConfig, OrchestratorConfig, ResolverConfig, RetryPolicy,
    TruncationConfig,
};
pub use ports::{
    cache_store::{CacheStore, StoreError, StoreStats},
    clock::{Clock, ManualClock, SystemClock},
    history_sink::{HistoryEvent, HistorySink, NoHistorySink},
    progress::{ExecutionProgressNotifier, NoProgress},
    tool_invoker::ToolInvokerPort,
};
pub use registry::{RegistryError, RegistrySnapshot, ReloadReport, ToolRegistry};
pub use use_cases::cache_manager::{CacheError, CacheManager, CacheStats};
pub use use_cases::fetch_cached::{FetchCachedUseCase, FetchMode, Fetched};
pub use use_cases::submit_plan::{
    CallReport, PlanResult, SubmitPlanError, SubmitPlanInput, SubmitPlanUseCase,
};
