//! Integration tests for the Telegram commands tool
//!
//! A small stand-in host answers tasks straight from the mailbox, so these
//! tests exercise the tool end to end without the engine.

use sdk::ipc::{self, IpcPaths, ResultEntry, TaskEntry};
use sdk::{CoreContext, CoreTool, RequesterConfig, ToolInput};
use serde_json::json;
use std::time::Duration;
use telegram::{TelegramCommandsTool, UNAUTHORIZED_MESSAGE};
use tempfile::TempDir;

fn fast() -> RequesterConfig {
    RequesterConfig {
        poll_interval: Duration::from_millis(10),
        timeout: Duration::from_millis(200),
    }
}

fn started_tool(paths: &IpcPaths, is_main: bool) -> TelegramCommandsTool {
    let mut tool = TelegramCommandsTool::new();
    let ctx = CoreContext::new("group", is_main, paths.clone()).with_requester_config(fast());
    tool.start(ctx).unwrap();
    tool
}

/// Answer the first task that shows up with `reply(task)`.
async fn answer_one(paths: IpcPaths, reply: impl Fn(&TaskEntry) -> ResultEntry) -> TaskEntry {
    loop {
        if let Ok(entries) = std::fs::read_dir(paths.tasks_dir()) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if ipc::is_temp_file(&name) {
                    continue;
                }
                let bytes = std::fs::read(entry.path()).unwrap();
                let task: TaskEntry = serde_json::from_slice(&bytes).unwrap();
                std::fs::remove_file(entry.path()).unwrap();
                ipc::write_result(&paths, &reply(&task)).await.unwrap();
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_non_main_caller_is_rejected_without_task_file() {
    let dir = TempDir::new().unwrap();
    let paths = IpcPaths::new(dir.path());
    let tool = started_tool(&paths, false);

    for method in ["list_commands", "clear_commands", "add_command"] {
        let input = ToolInput::new(method)
            .with_param("command", json!("demo"))
            .with_param("description", json!("desc"));
        let output = tool.handle(input).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.as_text(), UNAUTHORIZED_MESSAGE);
    }

    assert!(!paths.tasks_dir().exists());
}

#[tokio::test]
async fn test_add_command_files_task_and_returns_host_reply() {
    let dir = TempDir::new().unwrap();
    let paths = IpcPaths::new(dir.path());
    let tool = started_tool(&paths, true);

    let host = tokio::spawn(answer_one(paths.clone(), |task| {
        ResultEntry::success(
            &task.request_id,
            format!(
                "Successfully added command: /{}",
                task.payload_str("command").unwrap_or_default()
            ),
        )
    }));

    let output = tool
        .handle(
            ToolInput::new("add_command")
                .with_param("command", json!("/demo"))
                .with_param("description", json!("desc")),
        )
        .await
        .unwrap();
    let task = host.await.unwrap();

    assert_eq!(task.kind, "telegram_add_command");
    assert_eq!(task.payload_str("command"), Some("demo"));
    assert!(output.success);
    assert_eq!(output.as_text(), "Successfully added command: /demo");
    assert!(!paths.result_path(&task.request_id).exists());
}

#[tokio::test]
async fn test_list_commands_carries_data() {
    let dir = TempDir::new().unwrap();
    let paths = IpcPaths::new(dir.path());
    let tool = started_tool(&paths, true);

    let host = tokio::spawn(answer_one(paths.clone(), |task| {
        ResultEntry::success(&task.request_id, "Current bot commands:\n/help - Help")
            .with_data(json!([{"command": "help", "description": "Help"}]))
    }));

    let output = tool.handle(ToolInput::new("list_commands")).await.unwrap();
    host.await.unwrap();

    assert!(output.success);
    assert_eq!(output.data["data"][0]["command"], "help");
}

#[tokio::test]
async fn test_no_host_means_timeout_reply() {
    let dir = TempDir::new().unwrap();
    let paths = IpcPaths::new(dir.path());
    let tool = started_tool(&paths, true);

    let output = tool.handle(ToolInput::new("clear_commands")).await.unwrap();

    assert!(!output.success);
    assert_eq!(output.as_text(), "Request timed out");
}

#[tokio::test]
async fn test_invalid_command_name_is_reported_locally() {
    let dir = TempDir::new().unwrap();
    let paths = IpcPaths::new(dir.path());
    let tool = started_tool(&paths, true);

    let output = tool
        .handle(ToolInput::new("remove_command").with_param("command", json!("Not Valid")))
        .await
        .unwrap();

    assert!(!output.success);
    assert!(output.as_text().contains("Invalid command name"));
    assert!(!paths.tasks_dir().exists());
}
