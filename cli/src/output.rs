//! Console output for plans, results, tools and cache summaries

use colored::Colorize;
use conductor_application::{CallReport, Fetched, PlanResult};
use conductor_domain::{
    Binding, CallId, CallStatus, DependencyEdge, DomainError, ExecutionPlan, SkipReason,
    ToolDescriptor,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// Longest rendered value in text output before it is cut
const MAX_TEXT_VALUE: usize = 2000;

/// Serializable view of a dry-run plan
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub groups: Vec<Vec<CallId>>,
    pub calls: Vec<PlannedCallView>,
}

#[derive(Debug, Serialize)]
pub struct PlannedCallView {
    pub id: CallId,
    pub tool_name: String,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub omitted: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DomainError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl PlanView {
    pub fn of(plan: &ExecutionPlan) -> Self {
        Self {
            groups: plan.groups(),
            calls: plan
                .calls()
                .iter()
                .map(|planned| PlannedCallView {
                    id: planned.id().clone(),
                    tool_name: planned.call.tool_name.clone(),
                    status: planned.status(),
                    synthesized: planned.synthesized,
                    group: planned.group,
                    bindings: planned.bindings.clone(),
                    omitted: planned.omitted.clone(),
                    error: planned.failure().cloned(),
                    skip_reason: planned.skip_reason().cloned(),
                })
                .collect(),
        }
    }
}

/// Formats results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format as JSON
    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format an executed plan
    pub fn format_result(result: &PlanResult) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!(
            "Plan Result ({})",
            result.strategy
        )));

        for call in &result.calls {
            output.push_str(&Self::call_report(call));
        }

        if let Some(reason) = &result.aborted {
            output.push_str(&format!("\n{} {}\n", "Aborted:".red().bold(), reason));
        }

        let summary = result.summary();
        output.push_str(&format!(
            "\n{} {} calls, {} succeeded, {} failed, {} skipped, {} cache hits, {} retries ({:.0}% success, {}ms)\n",
            "Summary:".cyan().bold(),
            result.calls.len(),
            result.count(CallStatus::Succeeded),
            result.count(CallStatus::Failed),
            result.count(CallStatus::Skipped),
            summary.cache_hits,
            summary.retries,
            summary.success_rate * 100.0,
            summary.total_duration_ms
        ));
        output
    }

    fn call_report(call: &CallReport) -> String {
        let mut output = String::new();
        let title = format!(
            "── {} ({}){} ──",
            call.id,
            call.tool_name,
            if call.synthesized { " [auto]" } else { "" }
        );
        let title = match call.status {
            CallStatus::Succeeded => title.green().bold(),
            CallStatus::Failed => title.red().bold(),
            _ => title.yellow().bold(),
        };
        output.push_str(&format!("\n{}\n", title));

        for binding in &call.bindings {
            output.push_str(&format!(
                "  {} {} <- {}.{} ({})\n",
                "bind".dimmed(),
                binding.parameter,
                binding.provider,
                binding.output_field,
                binding.rule
            ));
        }
        if !call.omitted.is_empty() {
            let omitted: Vec<&str> = call.omitted.iter().map(String::as_str).collect();
            output.push_str(&format!("  {} {}\n", "omitted".dimmed(), omitted.join(", ")));
        }

        match call.status {
            CallStatus::Succeeded => {
                if let Some(value) = &call.value {
                    output.push_str(&Self::value_preview(value));
                }
                if let Some(note) = &call.note {
                    output.push_str(&format!("  {} {}\n", "note".yellow(), note));
                }
                if call.is_truncated()
                    && let Some(key) = &call.cache_key
                {
                    output.push_str(&format!("  {} {}\n", "full result".dimmed(), key));
                }
            }
            CallStatus::Failed => {
                if let Some(error) = &call.error {
                    let kind = if error.is_transient() { "error (transient)" } else { "error" };
                    output.push_str(&format!("  {} {}\n", kind.red(), error));
                }
            }
            _ => {
                if let Some(reason) = &call.skip_reason {
                    output.push_str(&format!("  {} {}\n", "skipped".yellow(), reason));
                }
            }
        }
        output
    }

    fn value_preview(value: &serde_json::Value) -> String {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
        let rendered = match rendered.char_indices().nth(MAX_TEXT_VALUE) {
            Some((cut, _)) => format!("{}\n...", &rendered[..cut]),
            None => rendered,
        };
        rendered
            .lines()
            .map(|line| format!("  {}\n", line))
            .collect()
    }

    /// Format a dry-run plan
    pub fn format_plan(plan: &PlanView) -> String {
        let mut output = Self::header("Execution Plan");

        for (index, group) in plan.groups.iter().enumerate() {
            output.push_str(&format!("\n{}\n", format!("Group {}", index).cyan().bold()));
            for id in group {
                let Some(call) = plan.calls.iter().find(|c| &c.id == id) else {
                    continue;
                };
                output.push_str(&format!(
                    "  {} {}{}\n",
                    call.id.to_string().bold(),
                    call.tool_name,
                    if call.synthesized { " [auto]".dimmed().to_string() } else { String::new() }
                ));
                for binding in &call.bindings {
                    output.push_str(&format!(
                        "      {} <- {}.{} ({}{})\n",
                        binding.parameter,
                        binding.provider,
                        binding.output_field,
                        binding.rule,
                        if binding.optional { ", optional" } else { "" }
                    ));
                }
            }
        }

        let unresolved: Vec<&PlannedCallView> =
            plan.calls.iter().filter(|c| c.group.is_none()).collect();
        if !unresolved.is_empty() {
            output.push_str(&format!("\n{}\n", "Will not run".red().bold()));
            for call in unresolved {
                let reason = match (&call.error, &call.skip_reason) {
                    (Some(error), _) => error.to_string(),
                    (None, Some(reason)) => reason.to_string(),
                    (None, None) => call.status.to_string(),
                };
                output.push_str(&format!("  {} {}: {}\n", call.id, call.tool_name, reason));
            }
        }
        output
    }

    /// Format the tool catalog
    pub fn format_tools(tools: &[ToolDescriptor], edges: Option<&[DependencyEdge]>) -> String {
        let mut output = Self::header(&format!("Tools ({})", tools.len()));

        for tool in tools {
            let flags = if tool.idempotent { "" } else { " [non-idempotent]" };
            output.push_str(&format!("\n{}{}\n", tool.name.bold(), flags.yellow()));
            if !tool.description.is_empty() {
                output.push_str(&format!("  {}\n", tool.description));
            }
            for param in &tool.parameters {
                output.push_str(&format!(
                    "  {} {}: {} ({}){}\n",
                    if param.required { "*" } else { " " },
                    param.name,
                    param.param_type,
                    param.location,
                    if param.description.is_empty() {
                        String::new()
                    } else {
                        format!(" - {}", param.description)
                    }
                ));
            }
            if !tool.declared_outputs.is_empty() {
                let outputs: Vec<&str> = tool.declared_outputs.iter().map(String::as_str).collect();
                output.push_str(&format!("  {} {}\n", "->".dimmed(), outputs.join(", ")));
            }
        }

        if let Some(edges) = edges {
            output.push_str(&format!("\n{}\n", "Dependencies".cyan().bold()));
            if edges.is_empty() {
                output.push_str("  (none)\n");
            }
            for edge in edges {
                output.push_str(&format!(
                    "  {}.{} <- {}.{} ({})\n",
                    edge.consumer_tool,
                    edge.consumer_parameter,
                    edge.provider_tool,
                    edge.provider_output,
                    edge.rule
                ));
            }
        }
        output
    }

    /// Format cache entries fetched after a run
    pub fn format_fetched(entries: &[(String, Fetched)]) -> String {
        let mut output = Self::header("Cached Results");
        for (key, fetched) in entries {
            output.push_str(&format!("\n{}\n", key.bold()));
            match fetched {
                Fetched::Summary(summary) => {
                    output.push_str(&format!(
                        "  {} {}, {} bytes\n",
                        summary.kind,
                        summary
                            .length
                            .map(|n| format!("{} entries", n))
                            .unwrap_or_else(|| "scalar".to_string()),
                        summary.size_bytes
                    ));
                    for (field, kind) in &summary.schema {
                        output.push_str(&format!("  {}: {}\n", field, kind));
                    }
                    for (field, stats) in &summary.numeric_stats {
                        output.push_str(&format!(
                            "  {} min={} max={} avg={:.2}\n",
                            field, stats.min, stats.max, stats.avg
                        ));
                    }
                }
                Fetched::Value(result) => output.push_str(&Self::value_preview(&result.value)),
            }
        }
        output
    }

    fn header(title: &str) -> String {
        format!("{}\n", format!("=== {} ===", title).cyan().bold())
    }
}
