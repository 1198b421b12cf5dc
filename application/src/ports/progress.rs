//! Progress notification port
//!
//! Defines the interface for reporting progress while a plan executes.

use conductor_domain::{CallId, CallStatus, DomainError};
use std::time::Duration;

/// Callback for progress updates during plan execution
///
/// Implementations live in the outer layers and can display progress in
/// various ways (console, web UI, etc.). Every method has a no-op default.
pub trait ExecutionProgressNotifier: Send + Sync {
    /// Called once the plan is built
    fn on_plan_start(&self, _total_calls: usize, _total_groups: usize) {}

    /// Called when an execution group starts
    fn on_group_start(&self, _group: usize, _calls: &[CallId]) {}

    /// Called when a call is about to be invoked (or served from cache)
    fn on_call_start(&self, _call: &CallId, _tool: &str) {}

    /// Called before sleeping ahead of a retry
    fn on_call_retry(
        &self,
        _call: &CallId,
        _tool: &str,
        _attempt: u32,
        _error: &DomainError,
        _backoff: Duration,
    ) {
    }

    /// Called when a call reaches a terminal status
    fn on_call_complete(&self, _call: &CallId, _tool: &str, _status: CallStatus, _from_cache: bool) {}

    /// Called when the whole plan has finished
    fn on_plan_complete(&self, _succeeded: usize, _failed: usize, _skipped: usize) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ExecutionProgressNotifier for NoProgress {}
