//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use conductor_domain::{ExecutionStrategy, ToolCall};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Dependency-aware tool orchestration with result caching")]
#[command(long_about = r#"
Conductor executes multi-step tool plans. Parameters a call is missing are
filled from other tools' declared outputs; provider calls are added and
ordered automatically, independent calls run concurrently, and large results
are cached and truncated before they are reported.

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables (e.g. CONDUCTOR_ORCHESTRATOR__MAX_PARALLELISM=8)
2. --config <path>     Explicit config file
3. ./conductor.toml    Project-level config
4. ~/.config/conductor/config.toml   Global config

Example:
  conductor tools --catalog tools.json --edges
  conductor resolve --catalog tools.json plan.json
  conductor run --catalog tools.json --fixtures fixtures.json plan.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files and environment
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependencies and execute a plan
    Run(RunArgs),

    /// Show how a plan would be resolved and grouped, without executing it
    Resolve(ResolveArgs),

    /// List registered tools
    Tools(ToolsArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Where tool descriptors come from
#[derive(Args, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// JSON tool catalog (repeatable; earlier files win name conflicts)
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalogs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plan file: an array of calls, or `{"strategy": ..., "calls": [...]}`
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Answer calls from a fixture file instead of invoking remote tools
    #[arg(long, value_name = "PATH")]
    pub fixtures: Option<PathBuf>,

    /// Tool gateway base URL (requires the `http-invoker` feature)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Execution strategy (overrides the plan file and configuration)
    #[arg(short, long, value_name = "STRATEGY")]
    pub strategy: Option<ExecutionStrategy>,

    /// Maximum concurrent calls within a group
    #[arg(long, value_name = "N")]
    pub max_parallelism: Option<usize>,

    /// Also print cache summaries of truncated results
    #[arg(long)]
    pub summaries: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Plan file: an array of calls, or `{"strategy": ..., "calls": [...]}`
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Also list derived dependency edges
    #[arg(long)]
    pub edges: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show configuration file locations instead
    #[arg(long)]
    pub sources: bool,
}

/// Contents of a plan file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PlanFile {
    Calls(Vec<ToolCall>),
    Plan {
        calls: Vec<ToolCall>,
        #[serde(default)]
        strategy: Option<ExecutionStrategy>,
    },
}

impl PlanFile {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid plan {}", path.display()))
    }

    pub fn into_parts(self) -> (Vec<ToolCall>, Option<ExecutionStrategy>) {
        match self {
            PlanFile::Calls(calls) => (calls, None),
            PlanFile::Plan { calls, strategy } => (calls, strategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "conductor",
            "-vv",
            "run",
            "plan.json",
            "--catalog",
            "a.json",
            "--catalog",
            "b.json",
            "--fixtures",
            "fixtures.json",
            "--strategy",
            "sequential",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.catalog.catalogs.len(), 2);
                assert_eq!(args.strategy, Some(ExecutionStrategy::Sequential));
                assert!(args.fixtures.is_some());
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_file_shapes() {
        let bare: PlanFile =
            serde_json::from_str(r#"[{"id": "m", "tool_name": "getMails"}]"#).unwrap();
        let (calls, strategy) = bare.into_parts();
        assert_eq!(calls.len(), 1);
        assert_eq!(strategy, None);

        let wrapped: PlanFile = serde_json::from_str(
            r#"{"strategy": "parallel", "calls": [{"id": "m", "tool_name": "getMails", "arguments": {"folder": "inbox"}}]}"#,
        )
        .unwrap();
        let (calls, strategy) = wrapped.into_parts();
        assert_eq!(strategy, Some(ExecutionStrategy::Parallel));
        assert_eq!(calls[0].get_string("folder"), Some("inbox"));
    }
}
