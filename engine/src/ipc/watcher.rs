//! Task directory watcher
//!
//! Polls `tasks/` and hands each entry to the registered responders, one task
//! at a time. A task is claimed by renaming it to a dot-prefixed name before
//! it is read; if two hosts race for the same file, only the one whose rename
//! succeeds executes it. The claimed file is deleted before dispatch, so every
//! task runs at most once.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

use sdk::errors::EngineError;
use sdk::ipc::{self, IpcPaths, ResultEntry, TaskEntry};

use super::Responder;

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, EngineError>;

const CLAIMED_SUFFIX: &str = ".claimed";

pub struct TaskWatcher {
    paths: IpcPaths,
    poll_interval: Duration,
    responders: Vec<Arc<dyn Responder>>,
}

impl TaskWatcher {
    pub fn new(paths: IpcPaths, poll_interval: Duration) -> Self {
        Self {
            paths,
            poll_interval,
            responders: Vec::new(),
        }
    }

    /// Register a responder; responders are consulted in registration order
    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responders.push(responder);
        self
    }

    pub fn paths(&self) -> &IpcPaths {
        &self.paths
    }

    /// Names of the registered responders
    pub fn responder_names(&self) -> Vec<String> {
        self.responders.iter().map(|r| r.name().to_string()).collect()
    }

    /// Process every task currently in the task directory.
    ///
    /// Returns the number of tasks claimed. Errors on individual tasks are
    /// logged and do not stop the pass.
    pub async fn process_pending(&self) -> Result<usize> {
        let names = self.pending_task_names().await?;
        let mut claimed = 0;

        for name in names {
            match self.process_task(&name).await {
                Ok(true) => claimed += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to process task {}: {}", name, e),
            }
        }

        Ok(claimed)
    }

    /// Poll until `shutdown` is set
    pub async fn run(&self, shutdown: Arc<AtomicBool>) {
        info!(
            "Watching {} every {:?} (responders: {})",
            self.paths.tasks_dir().display(),
            self.poll_interval,
            self.responder_names().join(", ")
        );

        while !shutdown.load(Ordering::SeqCst) {
            match self.process_pending().await {
                Ok(0) => {}
                Ok(n) => debug!("Processed {} task(s)", n),
                Err(e) => error!("Task poll failed: {}", e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!("Task watcher stopped");
    }

    /// Task file names, oldest request id first
    async fn pending_task_names(&self) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(self.paths.tasks_dir()).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if ipc::is_temp_file(&name) || !name.ends_with(".json") {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    /// Claim, parse and dispatch one task file.
    ///
    /// Returns `false` when another process claimed the file first.
    async fn process_task(&self, name: &str) -> Result<bool> {
        let path = self.paths.tasks_dir().join(name);
        let claimed = self
            .paths
            .tasks_dir()
            .join(format!(".{}{}", name, CLAIMED_SUFFIX));

        match fs::rename(&path, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        // Parsed loosely first so a task missing a field can still be answered
        let value = match ipc::read_entry::<serde_json::Value>(&claimed).await? {
            None => return Ok(false),
            Some(Ok(value)) => value,
            Some(Err(parse_err)) => {
                self.reject_malformed(&claimed, name, &parse_err, None).await?;
                return Ok(true);
            }
        };

        let task = match serde_json::from_value::<TaskEntry>(value.clone()) {
            Ok(task) => task,
            Err(parse_err) => {
                self.reject_malformed(&claimed, name, &parse_err, Some(&value))
                    .await?;
                return Ok(true);
            }
        };

        if !ipc::is_valid_request_id(&task.request_id) {
            let dest = self.quarantine_claimed(&claimed, name).await?;
            warn!(
                "Task with invalid request id {:?} moved to {}",
                task.request_id,
                dest.display()
            );
            return Ok(true);
        }

        ipc::remove_entry(&claimed).await?;
        self.dispatch(&task).await;
        Ok(true)
    }

    async fn dispatch(&self, task: &TaskEntry) {
        debug!("Dispatching {} ({})", task.request_id, task.kind);

        for responder in &self.responders {
            if responder.handle_request(task, &self.paths).await {
                return;
            }
        }

        warn!(
            "No responder for request type {} ({})",
            task.kind, task.request_id
        );
        let result = ResultEntry::failure(
            task.request_id.as_str(),
            format!("Unsupported request type: {}", task.kind),
        );
        if let Err(e) = ipc::write_result(&self.paths, &result).await {
            error!("Failed to write result for {}: {}", task.request_id, e);
        }
    }

    /// Quarantine a task that does not parse, answering its sender when the
    /// file still names a usable request id
    async fn reject_malformed(
        &self,
        claimed: &Path,
        name: &str,
        parse_err: &serde_json::Error,
        value: Option<&serde_json::Value>,
    ) -> Result<()> {
        let dest = self.quarantine_claimed(claimed, name).await?;
        warn!(
            "Malformed task {} moved to {}: {}",
            name,
            dest.display(),
            parse_err
        );

        let request_id = value
            .and_then(|v| v.get("requestId"))
            .and_then(|id| id.as_str())
            .filter(|id| ipc::is_valid_request_id(id));
        if let Some(request_id) = request_id {
            let result =
                ResultEntry::failure(request_id, format!("Malformed task: {}", parse_err));
            if let Err(e) = ipc::write_result(&self.paths, &result).await {
                error!("Failed to write result for {}: {}", request_id, e);
            }
        }
        Ok(())
    }

    /// Move a claimed file into quarantine under its original name
    async fn quarantine_claimed(&self, claimed: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(self.paths.quarantine_dir()).await?;
        let dest = self.paths.quarantine_dir().join(name);

        if let Err(e) = fs::rename(claimed, &dest).await {
            warn!("Could not quarantine {}: {}", claimed.display(), e);
            ipc::remove_entry(claimed).await?;
        }
        Ok(dest)
    }
}
