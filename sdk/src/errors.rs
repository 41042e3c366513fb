//! Error types and handling
//!
//! This module provides the error types shared by the host engine and the
//! sandboxed tools. All errors implement the `BridgeErrorExt` trait which
//! provides user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints never include the bot token or host paths, so they are safe to hand
//! back to the agent running inside the sandbox.

use thiserror::Error;

use crate::types::ToolError;

/// Trait for error extensions
///
/// Provides additional context for errors, including user-friendly hints and
/// recoverability information.
pub trait BridgeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (bot tokens)
    /// - Host file paths
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Nothing in this system retries automatically; recoverable errors are
    /// the ones a caller can fix by changing input or configuration and
    /// calling again.
    fn is_recoverable(&self) -> bool;
}

/// Main error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration, missing credential
/// - **IPC**: Task/result file I/O and (de)serialization
/// - **Timeout**: No result within the requester's wait budget
/// - **Authorization**: Non-main caller attempting a privileged operation
/// - **External API**: Network failures and Telegram `ok: false` replies
/// - **Tool**: Parameter and dispatch errors
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, BridgeErrorExt};
///
/// let error = EngineError::Unauthorized("set_commands".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
///
/// let timeout = EngineError::Timeout(10_000);
/// assert!(timeout.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} is not configured")]
    MissingCredential(String),

    // IPC errors
    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wait budget in milliseconds; kept out of the message
    #[error("Request timed out")]
    Timeout(u64),

    // Authorization errors
    #[error("{0}")]
    Unauthorized(String),

    // External API errors
    #[error("Network error: {0}")]
    Network(String),

    /// Carries Telegram's own `description` verbatim
    #[error("{0}")]
    TelegramApi(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for EngineError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownMethod(method) => Self::UnknownOperation(method),
            other => Self::ToolError(other.to_string()),
        }
    }
}

impl BridgeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredential(_) => "Set the bot token in the host environment",

            Self::Ipc(_) => "Could not exchange files with the host. Check the IPC directories",
            Self::Serialization(_) => "Received malformed data",
            Self::Timeout(_) => "The host did not answer in time. Is the host process running?",

            Self::Unauthorized(_) => "This operation is only available to the main group",

            Self::Network(_) => "Network operation failed. Check your connection",
            Self::TelegramApi(_) => "Telegram rejected the request",

            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::ToolError(_) => "Tool operation failed",
            Self::UnknownOperation(_) => "Unknown operation requested",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unauthorized(_) | Self::ToolNotFound(_))
    }
}
