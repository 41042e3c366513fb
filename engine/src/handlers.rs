//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - serve: Watch the mailbox and answer privileged requests
//! - sweep: One-off retention cleanup
//! - status: Mailbox and credential overview
//! - tools: List the available tools
//! - call: Invoke a tool method directly

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use sdk::errors::BridgeErrorExt;
use sdk::ipc::{self, IpcPaths};
use sdk::{CoreContext, ToolInput};

use crate::config::Config;
use crate::ipc::{spawn_sweeper, sweep, SweepReport, TaskWatcher, TelegramResponder};
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the watcher with every host-side responder
pub fn build_watcher(config: &Config) -> TaskWatcher {
    let token = config.telegram_token();
    if token.is_none() {
        warn!(
            "{} is not set; Telegram requests will be answered with a configuration error",
            config.telegram.token_env
        );
    }

    let telegram = TelegramResponder::from_token(token, &config.telegram.api_base);
    TaskWatcher::new(config.ipc_paths(), config.poll_interval()).with_responder(Arc::new(telegram))
}

/// Serve the mailbox until Ctrl-C
pub async fn handle_serve(config: &Config) -> Result<()> {
    let paths = config.ipc_paths();
    paths
        .ensure_dirs()
        .await
        .with_context(|| format!("Failed to prepare mailbox at {}", paths.root().display()))?;

    let watcher = build_watcher(config);
    let shutdown = Arc::new(AtomicBool::new(false));

    let sweeper = spawn_sweeper(
        paths.clone(),
        config.retention(),
        config.sweep_interval(),
        Arc::clone(&shutdown),
    );

    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    info!("Serving mailbox at {}", paths.root().display());
    watcher.run(Arc::clone(&shutdown)).await;

    sweeper.abort();
    Ok(())
}

/// Remove mailbox entries older than the retention age
pub async fn handle_sweep(
    config: &Config,
    older_than: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let paths = config.ipc_paths();
    let retention = older_than
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.retention());

    let report = sweep(&paths, retention, SystemTime::now()).await;

    match format {
        OutputFormat::Text => {
            println!(
                "Removed {} file(s) older than {}s from {}",
                report.total(),
                retention.as_secs(),
                paths.root().display()
            );
            println!("  tasks:      {}", report.tasks);
            println!("  results:    {}", report.results);
            println!("  quarantine: {}", report.quarantine);
            if report.failed > 0 {
                println!("  skipped:    {} (see log)", report.failed);
            }
        }
        OutputFormat::Json => {
            let output = sweep_json(paths.root(), retention, &report);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn sweep_json(root: &Path, retention: Duration, report: &SweepReport) -> serde_json::Value {
    json!({
        "root": root.display().to_string(),
        "retention_secs": retention.as_secs(),
        "removed": report,
    })
}

/// Show mailbox location, backlog and credential status
pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let paths = config.ipc_paths();
    let tasks = count_entries(paths.tasks_dir()).await?;
    let results = count_entries(paths.results_dir()).await?;
    let quarantined = count_entries(paths.quarantine_dir()).await?;
    let token_configured = config.telegram_token().is_some();

    match format {
        OutputFormat::Text => {
            println!("Mailbox:          {}", paths.root().display());
            println!("  Pending tasks:  {}", tasks);
            println!("  Unread results: {}", results);
            println!("  Quarantined:    {}", quarantined);
            println!(
                "Telegram token:   {} ({})",
                if token_configured { "configured" } else { "missing" },
                config.telegram.token_env
            );
            println!(
                "Polling:          every {} ms, timeout {} ms",
                config.ipc.poll_interval_ms, config.ipc.request_timeout_ms
            );
            println!("Retention:        {} s", config.ipc.retention_secs);
        }
        OutputFormat::Json => {
            let output = status_json(config, paths.root(), [tasks, results, quarantined]);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// `counts` is tasks, results, quarantine
fn status_json(config: &Config, root: &Path, counts: [usize; 3]) -> serde_json::Value {
    let [tasks, results, quarantined] = counts;
    json!({
        "root": root.display().to_string(),
        "tasks": tasks,
        "results": results,
        "quarantine": quarantined,
        "telegram_token_configured": config.telegram_token().is_some(),
        "telegram_token_env": config.telegram.token_env,
        "poll_interval_ms": config.ipc.poll_interval_ms,
        "request_timeout_ms": config.ipc.request_timeout_ms,
        "retention_secs": config.ipc.retention_secs,
    })
}

/// List the registered tools
pub async fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::with_defaults(config);

    match format {
        OutputFormat::Text => {
            for (name, version, description) in registry.describe() {
                println!("{} v{}", name, version);
                println!("    {}", description);
            }
        }
        OutputFormat::Json => {
            let tools: Vec<_> = registry
                .describe()
                .into_iter()
                .map(|(name, version, description)| {
                    json!({"name": name, "version": version, "description": description})
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
    }

    Ok(())
}

/// Call a tool method as `group`
pub async fn handle_call(
    config: &Config,
    tool: &str,
    method: &str,
    params: Option<&str>,
    is_main: bool,
    group: &str,
    format: OutputFormat,
) -> Result<()> {
    let params: serde_json::Value = match params {
        Some(raw) => serde_json::from_str(raw).context("--params must be valid JSON")?,
        None => serde_json::Value::Null,
    };
    let input = ToolInput::from_json_params(method, params)?;

    let ctx = CoreContext::new(group, is_main, config.ipc_paths())
        .with_requester_config(config.requester_config());
    let mut registry = ToolRegistry::with_defaults(config);
    registry.start_all(&ctx)?;

    let outcome = registry.dispatch(tool, input).await;
    registry.stop_all();
    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Hint: {}", e.user_hint());
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Text => {
            if output.success {
                println!("{}", output.as_text());
                if let Some(data) = output.data.get("data") {
                    println!();
                    println!("{}", serde_json::to_string_pretty(data)?);
                }
            } else {
                eprintln!("Error: {}", output.as_text());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    if output.success {
        Ok(())
    } else {
        Err(anyhow!("{}.{} failed", tool, method))
    }
}

/// Count mailbox entries in `dir`, ignoring in-flight temporary files
async fn count_entries(dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir.display())),
    };

    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !ipc::is_temp_file(&name.to_string_lossy()) {
            count += 1;
        }
    }
    Ok(count)
}

/// Mailbox paths after applying a command-line override
pub fn apply_ipc_override(config: &mut Config, ipc_dir: Option<&Path>) -> IpcPaths {
    if let Some(dir) = ipc_dir {
        config.ipc.root = Some(dir.to_path_buf());
    }
    config.ipc_paths()
}
