//! Host side of the task/result mailbox
//!
//! The [`watcher::TaskWatcher`] claims task files filed by sandboxed tools and
//! offers each one to the registered [`Responder`]s in order. A responder that
//! recognizes the task's type prefix answers it by writing exactly one result
//! file. The [`sweeper`] reclaims entries nobody picked up.

use async_trait::async_trait;
use sdk::ipc::{IpcPaths, TaskEntry};

pub mod sweeper;
pub mod telegram_responder;
pub mod watcher;

pub use sweeper::{spawn_sweeper, sweep, SweepReport};
pub use telegram_responder::TelegramResponder;
pub use watcher::TaskWatcher;

/// Executes tasks of one type namespace
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Handle `task` if it belongs to this responder.
    ///
    /// Returns `false` for tasks outside the responder's namespace. When it
    /// returns `true` a result file has been written (or its write failed and
    /// was logged); errors never escape.
    async fn handle_request(&self, task: &TaskEntry, paths: &IpcPaths) -> bool;
}
