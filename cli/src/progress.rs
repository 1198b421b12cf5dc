//! Progress reporting for plan execution

use colored::Colorize;
use conductor_application::ports::progress::ExecutionProgressNotifier;
use conductor_domain::{CallId, CallStatus, DomainError};
use std::time::Duration;

/// Line-oriented progress on stderr, so stdout stays parseable
pub struct ConsoleProgress;

impl ExecutionProgressNotifier for ConsoleProgress {
    fn on_plan_start(&self, total_calls: usize, total_groups: usize) {
        eprintln!(
            "{} {} ({} calls in {} groups)",
            "->".cyan(),
            "Executing plan".bold(),
            total_calls,
            total_groups
        );
    }

    fn on_group_start(&self, group: usize, calls: &[CallId]) {
        let ids: Vec<&str> = calls.iter().map(CallId::as_str).collect();
        eprintln!(
            "  {} {}",
            format!("group {}", group).cyan().bold(),
            ids.join(", ").dimmed()
        );
    }

    fn on_call_retry(
        &self,
        call: &CallId,
        tool: &str,
        attempt: u32,
        error: &DomainError,
        backoff: Duration,
    ) {
        eprintln!(
            "    {} {} ({}) attempt {} failed: {}; retrying in {}ms",
            "~".yellow(),
            call,
            tool,
            attempt,
            error,
            backoff.as_millis()
        );
    }

    fn on_call_complete(&self, call: &CallId, tool: &str, status: CallStatus, from_cache: bool) {
        let marker = match status {
            CallStatus::Succeeded => "v".green(),
            CallStatus::Failed => "x".red(),
            _ => "-".yellow(),
        };
        let cached = if from_cache { " [cache]".dimmed().to_string() } else { String::new() };
        eprintln!("    {} {} ({}){}", marker, call, tool, cached);
    }

    fn on_plan_complete(&self, succeeded: usize, failed: usize, skipped: usize) {
        eprintln!(
            "{} {} succeeded, {} failed, {} skipped",
            "=>".cyan(),
            succeeded.to_string().green(),
            failed.to_string().red(),
            skipped.to_string().yellow()
        );
        eprintln!();
    }
}
