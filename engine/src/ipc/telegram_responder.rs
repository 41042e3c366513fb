//! Answers `telegram_*` tasks by calling the Bot API
//!
//! Add and remove are read-modify-write over `setMyCommands`, which replaces
//! the whole list. They are optimistic: a change made to the command list by
//! someone else between the read and the write is lost. The watcher runs
//! tasks one at a time, so requests arriving through the mailbox never race
//! each other.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sdk::errors::{BridgeErrorExt, EngineError};
use sdk::ipc::{self, IpcPaths, ResultEntry, TaskEntry};
use std::sync::Arc;
use tracing::{error, info, warn};

use ::telegram::protocol::{normalize_command_name, BotCommand, TelegramRequest, NAMESPACE};

use super::Responder;
use crate::bot::{BotApiError, BotCommandsApi, TelegramApiClient};

/// Credential named in the reply when the host has no bot token
const CREDENTIAL: &str = "Telegram bot token";

pub struct TelegramResponder {
    api: Option<Arc<dyn BotCommandsApi>>,
}

impl TelegramResponder {
    /// Create a responder backed by `api`; `None` means no credential is
    /// configured and every request is answered with a configuration error.
    pub fn new(api: Option<Arc<dyn BotCommandsApi>>) -> Self {
        Self { api }
    }

    /// Create a responder talking to the real Bot API
    pub fn from_token(token: Option<String>, api_base: &str) -> Self {
        Self::new(token.map(|token| {
            Arc::new(TelegramApiClient::new(token, api_base)) as Arc<dyn BotCommandsApi>
        }))
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    async fn execute(
        &self,
        api: &dyn BotCommandsApi,
        request: TelegramRequest,
        task: &TaskEntry,
    ) -> Result<ResultEntry> {
        let id = task.request_id.as_str();

        match request {
            TelegramRequest::ListCommands => {
                let commands = api.get_my_commands().await?;
                Ok(ResultEntry::success(id, describe_commands(&commands))
                    .with_data(serde_json::to_value(&commands)?))
            }

            TelegramRequest::SetCommands => {
                let raw = task
                    .payload
                    .get("commands")
                    .cloned()
                    .ok_or_else(|| anyhow!("Missing field: commands"))?;
                let mut commands: Vec<BotCommand> =
                    serde_json::from_value(raw).context("Invalid commands list")?;
                for cmd in &mut commands {
                    cmd.command = normalize_command_name(&cmd.command);
                }

                api.set_my_commands(&commands).await?;
                Ok(
                    ResultEntry::success(id, format!("Successfully set {} bot commands", commands.len()))
                        .with_data(serde_json::to_value(&commands)?),
                )
            }

            TelegramRequest::AddCommand => {
                let name = normalize_command_name(required_str(task, "command")?);
                let description = required_str(task, "description")?.to_string();

                let mut commands = api.get_my_commands().await?;
                commands.retain(|c| c.command != name);
                commands.push(BotCommand::new(name.as_str(), description));

                api.set_my_commands(&commands).await?;
                Ok(
                    ResultEntry::success(id, format!("Successfully added command: /{}", name))
                        .with_data(serde_json::to_value(&commands)?),
                )
            }

            TelegramRequest::RemoveCommand => {
                let name = normalize_command_name(required_str(task, "command")?);

                let mut commands = api.get_my_commands().await?;
                let before = commands.len();
                commands.retain(|c| c.command != name);
                if commands.len() == before {
                    return Ok(ResultEntry::failure(
                        id,
                        format!("Command not found: /{}", name),
                    ));
                }

                api.set_my_commands(&commands).await?;
                Ok(
                    ResultEntry::success(id, format!("Successfully removed command: /{}", name))
                        .with_data(serde_json::to_value(&commands)?),
                )
            }

            TelegramRequest::ClearCommands => {
                api.set_my_commands(&[]).await?;
                Ok(ResultEntry::success(id, "Successfully cleared all bot commands")
                    .with_data(serde_json::json!([])))
            }
        }
    }
}

#[async_trait]
impl Responder for TelegramResponder {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn handle_request(&self, task: &TaskEntry, paths: &IpcPaths) -> bool {
        if !task.kind.starts_with(NAMESPACE) {
            return false;
        }

        let id = task.request_id.as_str();
        let result = match (&self.api, TelegramRequest::from_task_type(&task.kind)) {
            (None, _) => {
                let err = EngineError::MissingCredential(CREDENTIAL.to_string());
                warn!("Telegram request {} refused: {}", id, err);
                ResultEntry::failure(id, err.to_string())
            }
            (Some(_), None) => {
                warn!("Unknown telegram request type {}", task.kind);
                ResultEntry::failure(id, format!("Unknown telegram request type: {}", task.kind))
            }
            (Some(api), Some(request)) => match self.execute(api.as_ref(), request, task).await {
                Ok(result) => result,
                Err(e) => ResultEntry::failure(id, failure_message(id, &task.kind, e)),
            },
        };

        info!(
            request_id = id,
            kind = %task.kind,
            success = result.success,
            "Answered telegram request"
        );

        if let Err(e) = ipc::write_result(paths, &result).await {
            error!("Failed to write result for {}: {}", id, e);
        }
        true
    }
}

/// Message for a failed request; Bot API errors keep Telegram's wording
fn failure_message(id: &str, kind: &str, err: anyhow::Error) -> String {
    match err.downcast::<BotApiError>() {
        Ok(api_err) => {
            let err = EngineError::from(api_err);
            error!(
                recoverable = err.is_recoverable(),
                "Telegram request {} ({}) failed: {} ({})",
                id,
                kind,
                err,
                err.user_hint()
            );
            err.to_string()
        }
        Err(err) => {
            error!("Telegram request {} ({}) failed: {:#}", id, kind, err);
            format!("{:#}", err)
        }
    }
}

fn required_str<'a>(task: &'a TaskEntry, key: &str) -> Result<&'a str> {
    task.payload_str(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing field: {}", key))
}

fn describe_commands(commands: &[BotCommand]) -> String {
    if commands.is_empty() {
        return "No bot commands are currently set.".to_string();
    }

    let lines: Vec<String> = commands
        .iter()
        .map(|c| format!("/{} - {}", c.command, c.description))
        .collect();
    format!("Current bot commands:\n{}", lines.join("\n"))
}
