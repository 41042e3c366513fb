// Hostbridge host engine
// Main entry point for the hostbridge binary

use clap::Parser;
use hostbridge_engine::cli::{Cli, Command};
use hostbridge_engine::config::Config;
use hostbridge_engine::handlers::{
    apply_ipc_override, handle_call, handle_serve, handle_status, handle_sweep, handle_tools,
    OutputFormat,
};
use hostbridge_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };
    apply_ipc_override(&mut config, cli.ipc_dir.as_deref());

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Hostbridge v{} ({} - {})", version, commit, timestamp);

    match cli.command {
        Command::Serve => {
            tracing::info!("Starting mailbox watcher...");
            handle_serve(&config).await
        }

        Command::Sweep { older_than } => handle_sweep(&config, older_than, format).await,

        Command::Status => handle_status(&config, format).await,

        Command::Tools => handle_tools(&config, format).await,

        Command::Call {
            tool,
            method,
            params,
            main,
            group,
        } => {
            tracing::info!("Calling {}.{}", tool, method);
            handle_call(
                &config,
                &tool,
                &method,
                params.as_deref(),
                main,
                &group,
                format,
            )
            .await
        }
    }
}
