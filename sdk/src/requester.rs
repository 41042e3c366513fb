//! Sandbox side of the mailbox
//!
//! [`Requester::call_privileged`] files a task, then polls for the matching
//! result until it arrives or the wait budget runs out. It never returns an
//! error: every failure, including the timeout, comes back as a failure
//! [`ResultEntry`] so the calling tool can hand the message to the user.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::ipc::{self, ClaimedResult, IpcPaths, ResultEntry, TaskEntry};

/// Message returned when no result arrives in time, as shown by
/// [`EngineError::Timeout`]
pub const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Default delay between result polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default wait budget for a result
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Polling parameters for the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequesterConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Files tasks and waits for their results
#[derive(Debug, Clone)]
pub struct Requester {
    paths: IpcPaths,
    config: RequesterConfig,
}

impl Requester {
    pub fn new(paths: IpcPaths, config: RequesterConfig) -> Self {
        Self { paths, config }
    }

    pub fn paths(&self) -> &IpcPaths {
        &self.paths
    }

    /// Ask the host to perform `kind` with `payload`, using the configured
    /// timeout.
    pub async fn call_privileged(
        &self,
        kind: &str,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> ResultEntry {
        self.call_privileged_with_timeout(kind, payload, self.config.timeout)
            .await
    }

    /// Ask the host to perform `kind` with `payload`, waiting at most `timeout`.
    pub async fn call_privileged_with_timeout(
        &self,
        kind: &str,
        payload: serde_json::Map<String, serde_json::Value>,
        timeout: Duration,
    ) -> ResultEntry {
        let task = TaskEntry::new(kind, payload);
        let request_id = task.request_id.clone();

        if let Err(e) = ipc::write_task(&self.paths, &task).await {
            warn!("Failed to file {} request {}: {}", kind, request_id, e);
            return ResultEntry::failure(request_id, e.to_string());
        }
        info!("Filed {} request {}", kind, request_id);

        self.await_result(&request_id, timeout).await
    }

    /// Poll for the result of `request_id` until it appears or `timeout`
    /// elapses.
    pub async fn await_result(&self, request_id: &str, timeout: Duration) -> ResultEntry {
        let deadline = Instant::now() + timeout;

        loop {
            match ipc::claim_result(&self.paths, request_id).await {
                Ok(ClaimedResult::Ready(result)) => {
                    debug!("Claimed result for {}", request_id);
                    return result;
                }
                Ok(ClaimedResult::Malformed(err)) => {
                    return ResultEntry::failure(
                        request_id,
                        format!("Failed to parse result: {}", err),
                    );
                }
                Ok(ClaimedResult::Pending) => {}
                Err(e) => {
                    warn!("Failed to read result for {}: {}", request_id, e);
                    return ResultEntry::failure(request_id, e.to_string());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let err = EngineError::Timeout(timeout.as_millis() as u64);
                warn!("Request {} timed out after {:?}", request_id, timeout);
                return ResultEntry::failure(request_id, err.to_string());
            }

            let remaining = deadline - now;
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }
}
