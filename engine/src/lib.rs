//! Hostbridge Engine Library
//!
//! Host side of the hostbridge mailbox: it answers privileged requests filed by
//! sandboxed tools. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Bot API clients
pub mod bot;

/// Mailbox watcher, responders and sweeper
pub mod ipc;

/// Built-in core tools
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
