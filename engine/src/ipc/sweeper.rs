//! Retention cleanup for the mailbox
//!
//! Removes tasks nobody claimed, results nobody collected and quarantined
//! files once they are older than the retention age. A file that cannot be
//! inspected or removed is logged and counted, and the sweep moves on.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sdk::errors::EngineError;
use sdk::ipc::{self, IpcPaths};

/// Result type for sweeper operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Files removed by one sweep, per directory, plus entries it had to skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    pub tasks: usize,
    pub results: usize,
    pub quarantine: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.tasks + self.results + self.quarantine
    }
}

/// Outcome of sweeping one directory
#[derive(Debug, Default)]
struct DirSweep {
    removed: usize,
    failed: usize,
}

/// Remove mailbox files last modified more than `retention` before `now`
///
/// All three directories are visited even when some entries fail.
pub async fn sweep(paths: &IpcPaths, retention: Duration, now: SystemTime) -> SweepReport {
    sweep_with(paths, retention, now, |path| async move {
        ipc::remove_entry(&path).await
    })
    .await
}

async fn sweep_with<F, Fut>(
    paths: &IpcPaths,
    retention: Duration,
    now: SystemTime,
    remove: F,
) -> SweepReport
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let tasks = sweep_dir(paths.tasks_dir(), retention, now, &remove).await;
    let results = sweep_dir(paths.results_dir(), retention, now, &remove).await;
    let quarantine = sweep_dir(paths.quarantine_dir(), retention, now, &remove).await;

    SweepReport {
        tasks: tasks.removed,
        results: results.removed,
        quarantine: quarantine.removed,
        failed: tasks.failed + results.failed + quarantine.failed,
    }
}

async fn sweep_dir<F, Fut>(dir: &Path, retention: Duration, now: SystemTime, remove: &F) -> DirSweep
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut outcome = DirSweep::default();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return outcome,
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            outcome.failed += 1;
            return outcome;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                // The listing itself broke; the rest of this directory waits
                // for the next tick.
                warn!("Listing {} stopped early: {}", dir.display(), e);
                outcome.failed += 1;
                break;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            // Consumed between listing and stat
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                outcome.failed += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();

        if age > retention {
            debug!("Sweeping {} (age {:?})", path.display(), age);
            match remove(path.clone()).await {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    warn!("Could not sweep {}: {}", path.display(), e);
                    outcome.failed += 1;
                }
            }
        }
    }

    outcome
}

/// Sweep once immediately, then every `interval` until `shutdown` is set
pub fn spawn_sweeper(
    paths: IpcPaths,
    retention: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            let report = sweep(&paths, retention, SystemTime::now()).await;
            if report.total() > 0 || report.failed > 0 {
                info!(
                    tasks = report.tasks,
                    results = report.results,
                    quarantine = report.quarantine,
                    failed = report.failed,
                    "Swept orphaned mailbox entries"
                );
            } else {
                debug!("Sweep found nothing to remove");
            }
        }
    })
}
