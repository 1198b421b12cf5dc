//! CLI entrypoint for conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod output;
mod progress;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{Cli, Command, ConfigArgs, OutputFormat, PlanFile, ResolveArgs, RunArgs, ToolsArgs};
use colored::Colorize;
use conductor_application::{
    CacheManager, Clock, ConductorConfig, FetchCachedUseCase, FetchMode, SubmitPlanInput,
    SubmitPlanUseCase, SystemClock, ToolInvokerPort, ToolRegistry,
};
use conductor_domain::ToolProvider;
use conductor_infrastructure::config::FileToolsConfig;
use conductor_infrastructure::tools::CATALOG_PRIORITY;
use conductor_infrastructure::{
    CacheSweeper, ConfigLoader, FileConfig, FixtureInvoker, InMemoryCacheStore, JsonCatalogProvider,
    JsonlHistorySink,
};
use output::{ConsoleFormatter, PlanView};
use progress::ConsoleProgress;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; RUST_LOG wins when -v is absent
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting conductor");

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    if let Command::Config(args) = &cli.command {
        return show_config(&cli, args, &file_config);
    }

    let issues = file_config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("{} {}", "config error:".red().bold(), issue);
        }
        bail!("Invalid configuration ({} issues)", issues.len());
    }

    match &cli.command {
        Command::Run(args) => run(&cli, args, &file_config).await,
        Command::Resolve(args) => resolve(&cli, args, &file_config).await,
        Command::Tools(args) => tools(&cli, args, &file_config).await,
        Command::Config(_) => Ok(ExitCode::SUCCESS),
    }
}

async fn run(cli: &Cli, args: &RunArgs, file_config: &FileConfig) -> Result<ExitCode> {
    let (calls, file_strategy) = PlanFile::read(&args.plan)?.into_parts();

    let mut config = file_config.into_conductor_config();
    if let Some(max) = args.max_parallelism {
        let orchestrator = config.orchestrator().clone().with_max_parallelism(max);
        config = config.with_orchestrator(orchestrator);
    }

    // === Dependency Injection ===
    let registry = load_registry(&args.catalog.catalogs, file_config, &config).await?;
    let invoker = build_invoker(args, &file_config.tools, config.orchestrator().call_timeout)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(
        InMemoryCacheStore::new(Arc::clone(&clock)).with_max_entries(config.cache().max_entries),
    );
    let cache = Arc::new(CacheManager::new(
        store.clone(),
        Arc::clone(&clock),
        config.cache().clone(),
    ));

    let token = CancellationToken::new();
    let sweeper = CacheSweeper::new(store, config.cache().sweep_interval).spawn(token.child_token());

    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, skipping calls that have not started");
            interrupt.cancel();
        }
    });

    let mut use_case = SubmitPlanUseCase::new(registry, invoker, Arc::clone(&cache), clock)
        .with_config(&config)
        .with_cancellation(token.child_token());

    if let Some(path) = file_config.history.resolved_path() {
        match JsonlHistorySink::new(&path) {
            Some(sink) => {
                info!(path = %path.display(), "Recording execution history");
                use_case = use_case.with_history_sink(Arc::new(sink));
            }
            None => warn!(path = %path.display(), "Execution history disabled"),
        }
    }

    let mut input = SubmitPlanInput::new(calls);
    if let Some(strategy) = args.strategy.or(file_strategy) {
        input = input.with_strategy(strategy);
    }

    let result = if args.quiet {
        use_case.execute(input).await?
    } else {
        use_case
            .execute_with_progress(input, Arc::new(ConsoleProgress))
            .await?
    };

    let mut fetched = Vec::new();
    if args.summaries {
        let fetch = FetchCachedUseCase::new(cache).with_truncator(config.truncation().truncator());
        for call in result.calls.iter().filter(|c| c.is_truncated()) {
            let Some(key) = &call.cache_key else {
                continue;
            };
            match fetch.fetch(key, FetchMode::Summary).await {
                Ok(entry) => fetched.push((key.clone(), entry)),
                Err(e) => warn!(key = %key, error = %e, "Cached result unavailable"),
            }
        }
    }

    let rendered = match cli.output {
        OutputFormat::Json if args.summaries => {
            let summaries: serde_json::Map<String, serde_json::Value> = fetched
                .iter()
                .map(|(key, entry)| {
                    (
                        key.clone(),
                        serde_json::to_value(entry).unwrap_or(serde_json::Value::Null),
                    )
                })
                .collect();
            ConsoleFormatter::format_json(&serde_json::json!({
                "result": result,
                "summaries": summaries,
            }))
        }
        OutputFormat::Json => ConsoleFormatter::format_json(&result),
        OutputFormat::Text if fetched.is_empty() => ConsoleFormatter::format_result(&result),
        OutputFormat::Text => format!(
            "{}\n{}",
            ConsoleFormatter::format_result(&result),
            ConsoleFormatter::format_fetched(&fetched)
        ),
    };
    println!("{}", rendered);

    token.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Cache sweeper ended abnormally");
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn resolve(cli: &Cli, args: &ResolveArgs, file_config: &FileConfig) -> Result<ExitCode> {
    let (calls, _) = PlanFile::read(&args.plan)?.into_parts();
    let config = file_config.into_conductor_config();
    let registry = load_registry(&args.catalog.catalogs, file_config, &config).await?;

    // Dry run: the invoker is never called
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(CacheManager::new(
        Arc::new(InMemoryCacheStore::new(Arc::clone(&clock))),
        Arc::clone(&clock),
        config.cache().clone(),
    ));
    let use_case = SubmitPlanUseCase::new(registry, Arc::new(FixtureInvoker::new()), cache, clock)
        .with_config(&config);

    let view = PlanView::of(&use_case.plan(calls)?);
    let rendered = match cli.output {
        OutputFormat::Json => ConsoleFormatter::format_json(&view),
        OutputFormat::Text => ConsoleFormatter::format_plan(&view),
    };
    println!("{}", rendered);

    Ok(if view.calls.iter().all(|c| c.group.is_some()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn tools(cli: &Cli, args: &ToolsArgs, file_config: &FileConfig) -> Result<ExitCode> {
    let config = file_config.into_conductor_config();
    let registry = load_registry(&args.catalog.catalogs, file_config, &config).await?;

    let tools = registry.all();
    let edges = registry.edges();
    let rendered = match cli.output {
        OutputFormat::Json if args.edges => {
            ConsoleFormatter::format_json(&serde_json::json!({ "tools": tools, "edges": edges }))
        }
        OutputFormat::Json => ConsoleFormatter::format_json(&tools),
        OutputFormat::Text => {
            ConsoleFormatter::format_tools(&tools, args.edges.then_some(edges.as_slice()))
        }
    };
    println!("{}", rendered);
    Ok(ExitCode::SUCCESS)
}

fn show_config(cli: &Cli, args: &ConfigArgs, file_config: &FileConfig) -> Result<ExitCode> {
    if args.sources {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let rendered = match cli.output {
        OutputFormat::Json => ConsoleFormatter::format_json(file_config),
        OutputFormat::Text => {
            toml::to_string_pretty(file_config).context("Failed to render configuration")?
        }
    };
    println!("{}", rendered);

    let issues = file_config.validate();
    for issue in &issues {
        eprintln!("{} {}", "config error:".red().bold(), issue);
    }
    Ok(if issues.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Build the registry from catalog files; command-line catalogs replace configured ones
async fn load_registry(
    cli_catalogs: &[PathBuf],
    file_config: &FileConfig,
    config: &ConductorConfig,
) -> Result<Arc<ToolRegistry>> {
    let catalogs: &[PathBuf] = if cli_catalogs.is_empty() {
        &file_config.tools.catalogs
    } else {
        cli_catalogs
    };
    if catalogs.is_empty() {
        bail!("No tool catalog given. Pass --catalog <PATH> or set tools.catalogs");
    }

    let providers: Vec<Arc<dyn ToolProvider>> = catalogs
        .iter()
        .enumerate()
        .map(|(i, path)| {
            Arc::new(JsonCatalogProvider::new(path).with_priority(CATALOG_PRIORITY - i as i32))
                as Arc<dyn ToolProvider>
        })
        .collect();

    let registry = Arc::new(ToolRegistry::new(config.resolver().clone()));
    let report = registry.reload(&providers).await?;
    for provider in &report.skipped_providers {
        warn!(provider = %provider, "Catalog could not be loaded");
    }
    if report.skipped_providers.len() == providers.len() {
        bail!("None of the tool catalogs could be loaded");
    }
    info!(
        tools = registry.len(),
        shadowed = report.shadowed.len(),
        "Tool registry loaded"
    );
    Ok(registry)
}

fn build_invoker(
    args: &RunArgs,
    tools: &FileToolsConfig,
    timeout: Duration,
) -> Result<Arc<dyn ToolInvokerPort>> {
    if let Some(path) = args.fixtures.as_ref().or(tools.fixtures.as_ref()) {
        let invoker = FixtureInvoker::from_file(path)?;
        info!(path = %path.display(), tools = invoker.tools().len(), "Using fixture responses");
        return Ok(Arc::new(invoker));
    }
    if let Some(base_url) = args.base_url.as_ref().or(tools.base_url.as_ref()) {
        return http_invoker(base_url, tools, timeout);
    }
    bail!("No tool invoker configured. Pass --fixtures <PATH> or --base-url <URL>")
}

#[cfg(feature = "http-invoker")]
fn http_invoker(
    base_url: &str,
    tools: &FileToolsConfig,
    timeout: Duration,
) -> Result<Arc<dyn ToolInvokerPort>> {
    let mut invoker = conductor_infrastructure::HttpToolInvoker::new(base_url, timeout)
        .context("Failed to build HTTP client")?;
    if let Some(token) = tools.bearer_token() {
        invoker = invoker.with_bearer_token(token);
    }
    info!(base_url, "Invoking tools over HTTP");
    Ok(Arc::new(invoker))
}

#[cfg(not(feature = "http-invoker"))]
fn http_invoker(
    base_url: &str,
    _tools: &FileToolsConfig,
    _timeout: Duration,
) -> Result<Arc<dyn ToolInvokerPort>> {
    bail!(
        "--base-url {} needs conductor built with the `http-invoker` feature",
        base_url
    )
}
