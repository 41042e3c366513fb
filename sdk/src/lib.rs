//! Hostbridge SDK
//!
//! Shared library providing the tool trait, error types and the file-based
//! mailbox used between the sandboxed tools and the host engine.

/// Core tool trait and types
pub mod core_tool;

/// Error types and handling
pub mod errors;

/// Tool input/output types
pub mod types;

/// Task/result mailbox shared with the host
pub mod ipc;

/// Sandbox side of the mailbox
pub mod requester;

// Re-export commonly used types
pub use core_tool::{CoreContext, CoreTool};
pub use errors::{BridgeErrorExt, EngineError};
pub use ipc::{IpcPaths, ResultEntry, TaskEntry};
pub use requester::{Requester, RequesterConfig};
pub use types::{ToolError, ToolInput, ToolOutput};
