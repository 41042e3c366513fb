//! CLI interface for hostbridge
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hostbridge host engine
///
/// Answers privileged requests that sandboxed agent tools file in the shared
/// mailbox directory, and lets you call those tools from the command line.
#[derive(Parser, Debug)]
#[command(name = "hostbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the mailbox root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub ipc_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch the mailbox and answer privileged requests until Ctrl-C
    Serve,

    /// Remove mailbox entries older than the retention age, once
    Sweep {
        /// Retention age in seconds (defaults to the configured value)
        #[arg(long, value_name = "SECS")]
        older_than: Option<u64>,
    },

    /// Show mailbox location, pending entries and credential status
    Status,

    /// List the available tools
    Tools,

    /// Call a tool method the way the sandboxed agent would
    Call {
        /// Tool name (e.g. telegram_commands, weather)
        tool: String,

        /// Method name (e.g. list_commands, get_weather)
        method: String,

        /// Method parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// Call as the main (privileged) group
        #[arg(long)]
        main: bool,

        /// Group name reported to the tool
        #[arg(long, default_value = "cli")]
        group: String,
    },
}
