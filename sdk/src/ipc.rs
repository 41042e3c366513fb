//! File-based request/response mailbox
//!
//! The sandboxed side and the host side share two directories: `tasks/` and
//! `results/`. A task entry is written once by the requester and consumed once
//! by the host; a result entry is written once by the host and consumed once by
//! the requester. Both are plain JSON files named `<requestId>.json`.
//!
//! Every write goes through [`write_json_atomic`]: the full contents land in a
//! dot-prefixed temporary file in the same directory and are then renamed
//! into place, so a reader observes either nothing or the complete file.
//!
//! Files that fail to parse are moved into `quarantine/` instead of being left
//! in the mailbox or deleted, so they can be inspected until the sweeper
//! expires them.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::EngineError;

/// Length of the random suffix appended to request ids
const REQUEST_ID_SUFFIX_LEN: usize = 6;

/// Upper bound on request id length accepted from disk
const MAX_REQUEST_ID_LEN: usize = 64;

/// Directory layout of the mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcPaths {
    root: PathBuf,
    tasks: PathBuf,
    results: PathBuf,
    quarantine: PathBuf,
}

impl IpcPaths {
    /// Lay out the mailbox under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            tasks: root.join("tasks"),
            results: root.join("results"),
            quarantine: root.join("quarantine"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks
    }

    pub fn results_dir(&self) -> &Path {
        &self.results
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine
    }

    /// Final path of the task file for `request_id`
    pub fn task_path(&self, request_id: &str) -> PathBuf {
        self.tasks.join(entry_file_name(request_id))
    }

    /// Final path of the result file for `request_id`
    pub fn result_path(&self, request_id: &str) -> PathBuf {
        self.results.join(entry_file_name(request_id))
    }

    /// Create all mailbox directories
    pub async fn ensure_dirs(&self) -> Result<(), EngineError> {
        for dir in [&self.tasks, &self.results, &self.quarantine] {
            fs::create_dir_all(dir).await.map_err(|e| {
                EngineError::Ipc(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

/// A pending cross-process request
///
/// Serialized as `{type, requestId, ...payload, timestamp}`: payload fields
/// sit at the top level next to the envelope fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "requestId")]
    pub request_id: String,

    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,

    /// RFC 3339 creation time, informational only
    #[serde(default)]
    pub timestamp: String,
}

impl TaskEntry {
    /// Create a task entry with a fresh request id
    pub fn new(kind: impl Into<String>, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            kind: kind.into(),
            request_id: generate_request_id(),
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Get a string field from the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// The outcome of a task, written by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "requestId", default)]
    pub request_id: String,

    pub success: bool,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResultEntry {
    pub fn success(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// State of a result slot as seen by the requester
#[derive(Debug)]
pub enum ClaimedResult {
    /// No result file yet
    Pending,
    /// Result parsed and removed from the mailbox
    Ready(ResultEntry),
    /// Result file was malformed and has been quarantined
    Malformed(String),
}

/// Generate a correlation id: Unix milliseconds plus a short random suffix.
pub fn generate_request_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix.to_ascii_lowercase())
}

/// Whether `id` is safe to use as a file name component.
///
/// Ids read back from task files come from the sandbox and must never be
/// able to address a path outside the mailbox.
pub fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether a directory entry is an in-flight temporary write
pub fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".tmp")
}

fn entry_file_name(request_id: &str) -> String {
    format!("{}.json", request_id)
}

/// Atomically write `value` as JSON to `dir/file_name`.
///
/// Contents are written and synced to `dir/.<file_name>.tmp` first, then
/// renamed over the final name. An existing file with the final name is
/// replaced, never duplicated.
pub async fn write_json_atomic<T: Serialize>(
    dir: &Path,
    file_name: &str,
    value: &T,
) -> Result<PathBuf, EngineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| EngineError::Ipc(format!("Failed to create {}: {}", dir.display(), e)))?;

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = dir.join(format!(".{}.tmp", file_name));
    let final_path = dir.join(file_name);

    let write = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &final_path).await
    };

    if let Err(e) = write.await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(EngineError::Ipc(format!(
            "Failed to write {}: {}",
            final_path.display(),
            e
        )));
    }

    Ok(final_path)
}

/// Write a task entry into the task directory
pub async fn write_task(paths: &IpcPaths, task: &TaskEntry) -> Result<PathBuf, EngineError> {
    write_json_atomic(paths.tasks_dir(), &entry_file_name(&task.request_id), task).await
}

/// Write a result entry into the result directory
pub async fn write_result(paths: &IpcPaths, result: &ResultEntry) -> Result<PathBuf, EngineError> {
    if !is_valid_request_id(&result.request_id) {
        return Err(EngineError::Ipc(format!(
            "Refusing to write result for invalid request id {:?}",
            result.request_id
        )));
    }
    write_json_atomic(
        paths.results_dir(),
        &entry_file_name(&result.request_id),
        result,
    )
    .await
}

/// Read a JSON entry, returning `Ok(None)` if the file does not exist.
///
/// The outer error is an I/O failure; the inner one a parse failure.
pub async fn read_entry<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<Result<T, serde_json::Error>>, EngineError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::Ipc(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Remove a file, treating "already gone" as success
pub async fn remove_entry(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Ipc(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Move a malformed entry into the quarantine directory.
///
/// Falls back to deleting the file if it cannot be moved, so a bad entry is
/// never picked up twice.
pub async fn quarantine(paths: &IpcPaths, path: &Path) -> Result<PathBuf, EngineError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| EngineError::Ipc(format!("Not a file: {}", path.display())))?;

    fs::create_dir_all(paths.quarantine_dir()).await?;
    let dest = paths.quarantine_dir().join(file_name);

    if let Err(e) = fs::rename(path, &dest).await {
        tracing::warn!(
            "Could not quarantine {}: {}; removing it instead",
            path.display(),
            e
        );
        remove_entry(path).await?;
    }

    Ok(dest)
}

/// Claim the result for `request_id`, if it has arrived.
///
/// A parsed result is deleted before it is returned, so it is observed at
/// most once.
pub async fn claim_result(
    paths: &IpcPaths,
    request_id: &str,
) -> Result<ClaimedResult, EngineError> {
    let path = paths.result_path(request_id);

    match read_entry::<ResultEntry>(&path).await? {
        None => Ok(ClaimedResult::Pending),
        Some(Ok(result)) => {
            let removal = remove_entry(&path).await;
            Ok(settle_claim(result, request_id, removal))
        }
        Some(Err(parse_err)) => {
            let dest = quarantine(paths, &path).await?;
            tracing::warn!(
                "Malformed result for {} moved to {}: {}",
                request_id,
                dest.display(),
                parse_err
            );
            Ok(ClaimedResult::Malformed(parse_err.to_string()))
        }
    }
}

/// Finish a claim once the result parsed
///
/// A result the host already produced is handed back even if its file could
/// not be removed; the sweeper collects the leftover.
fn settle_claim(
    mut result: ResultEntry,
    request_id: &str,
    removal: Result<(), EngineError>,
) -> ClaimedResult {
    if let Err(e) = removal {
        tracing::warn!("Claimed result for {} but could not remove it: {}", request_id, e);
    }
    if result.request_id.is_empty() {
        result.request_id = request_id.to_string();
    }
    ClaimedResult::Ready(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn payload(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), REQUEST_ID_SUFFIX_LEN);
        assert!(is_valid_request_id(&id));
    }

    #[test]
    fn test_request_id_validation_rejects_traversal() {
        assert!(!is_valid_request_id(""));
        assert!(!is_valid_request_id("../../etc/passwd"));
        assert!(!is_valid_request_id("a/b"));
        assert!(!is_valid_request_id(&"x".repeat(MAX_REQUEST_ID_LEN + 1)));
        assert!(is_valid_request_id("1700000000000-abc123"));
    }

    #[test]
    fn test_temp_file_detection() {
        assert!(is_temp_file(".1700-abc.json.tmp"));
        assert!(is_temp_file("whatever.tmp"));
        assert!(!is_temp_file("1700-abc.json"));
    }

    #[test]
    fn test_task_entry_wire_format_flattens_payload() {
        let task = TaskEntry::new(
            "telegram_add_command",
            payload(json!({"command": "demo", "description": "desc"})),
        );
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["type"], "telegram_add_command");
        assert_eq!(value["requestId"], task.request_id.as_str());
        assert_eq!(value["command"], "demo");
        assert_eq!(value["description"], "desc");
        assert!(value["timestamp"].is_string());
        assert!(value.get("payload").is_none());

        let parsed: TaskEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.payload_str("command"), Some("demo"));
        assert!(!parsed.payload.contains_key("type"));
    }

    #[test]
    fn test_result_entry_omits_absent_data() {
        let value = serde_json::to_value(ResultEntry::success("1-a", "ok")).unwrap();
        assert!(value.get("data").is_none());

        let with_data = ResultEntry::success("1-a", "ok").with_data(json!([]));
        let value = serde_json::to_value(with_data).unwrap();
        assert_eq!(value["data"], json!([]));
    }

    #[test]
    fn test_result_entry_tolerates_missing_request_id() {
        let parsed: ResultEntry =
            serde_json::from_str(r#"{"success": false, "message": "nope"}"#).unwrap();
        assert_eq!(parsed.request_id, "");
        assert!(!parsed.success);
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let paths = IpcPaths::new(dir.path());

        let task = TaskEntry::new("telegram_list_commands", Default::default());
        let written = write_task(&paths, &task).await.unwrap();
        assert_eq!(written, paths.task_path(&task.request_id));

        let names: Vec<String> = std::fs::read_dir(paths.tasks_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", task.request_id)]);
    }

    #[tokio::test]
    async fn test_rewriting_result_keeps_single_file() {
        let dir = TempDir::new().unwrap();
        let paths = IpcPaths::new(dir.path());

        write_result(&paths, &ResultEntry::failure("1-dup", "first"))
            .await
            .unwrap();
        write_result(&paths, &ResultEntry::success("1-dup", "second"))
            .await
            .unwrap();

        let count = std::fs::read_dir(paths.results_dir()).unwrap().count();
        assert_eq!(count, 1);

        match claim_result(&paths, "1-dup").await.unwrap() {
            ClaimedResult::Ready(result) => assert_eq!(result.message, "second"),
            other => panic!("expected ready result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_result_rejects_invalid_id() {
        let dir = TempDir::new().unwrap();
        let paths = IpcPaths::new(dir.path());

        let err = write_result(&paths, &ResultEntry::failure("../escape", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Ipc(_)));
    }

    #[tokio::test]
    async fn test_claim_result_deletes_on_read() {
        let dir = TempDir::new().unwrap();
        let paths = IpcPaths::new(dir.path());

        write_result(&paths, &ResultEntry::success("1-once", "done"))
            .await
            .unwrap();

        assert!(matches!(
            claim_result(&paths, "1-once").await.unwrap(),
            ClaimedResult::Ready(_)
        ));
        assert!(!paths.result_path("1-once").exists());
        assert!(matches!(
            claim_result(&paths, "1-once").await.unwrap(),
            ClaimedResult::Pending
        ));
    }

    #[tokio::test]
    async fn test_claim_result_quarantines_malformed_file() {
        let dir = TempDir::new().unwrap();
        let paths = IpcPaths::new(dir.path());
        paths.ensure_dirs().await.unwrap();

        std::fs::write(paths.result_path("1-bad"), b"{not json").unwrap();

        match claim_result(&paths, "1-bad").await.unwrap() {
            ClaimedResult::Malformed(msg) => assert!(!msg.is_empty()),
            other => panic!("expected malformed result, got {:?}", other),
        }
        assert!(!paths.result_path("1-bad").exists());
        assert!(paths.quarantine_dir().join("1-bad.json").exists());
    }

    #[test]
    fn test_failed_removal_still_returns_result() {
        let mut parsed = ResultEntry::success("", "done");
        parsed.data = Some(json!({"count": 2}));
        let removal = Err(EngineError::Ipc(
            "Failed to remove 1-kept.json: Operation not permitted".to_string(),
        ));

        match settle_claim(parsed, "1-kept", removal) {
            ClaimedResult::Ready(result) => {
                assert!(result.success);
                assert_eq!(result.request_id, "1-kept");
                assert_eq!(result.message, "done");
                assert_eq!(result.data, Some(json!({"count": 2})));
            }
            other => panic!("expected ready result, got {:?}", other),
        }
    }
}
