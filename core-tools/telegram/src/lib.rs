//! Telegram Bot Command Core Tool
//!
//! Lets the main group's agent list, set, add, remove and clear the bot's
//! slash commands. The sandbox holds no bot token, so every call is filed as
//! a task in the host mailbox and answered by the host engine.

pub mod protocol;

use async_trait::async_trait;
use sdk::{CoreContext, CoreTool, EngineError, ResultEntry, ToolError, ToolInput, ToolOutput};
use serde_json::{Map, Value};
use tracing::{info, warn};

use protocol::{
    normalize_command_name, validate_command_name, validate_description, BotCommand,
    TelegramRequest,
};

/// Fixed reply for callers outside the main group
pub const UNAUTHORIZED_MESSAGE: &str = "Only the main group can manage Telegram bot commands.";

/// Bot command manager tool
pub struct TelegramCommandsTool {
    ctx: Option<CoreContext>,
}

impl TelegramCommandsTool {
    /// Create a new TelegramCommandsTool instance
    pub fn new() -> Self {
        Self { ctx: None }
    }

    fn context(&self) -> Result<&CoreContext, EngineError> {
        self.ctx
            .as_ref()
            .ok_or_else(|| EngineError::ToolError("telegram_commands tool not started".to_string()))
    }
}

impl Default for TelegramCommandsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoreTool for TelegramCommandsTool {
    fn name(&self) -> &str {
        "telegram_commands"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Manage the Telegram bot's slash commands (main group only)"
    }

    fn start(&mut self, ctx: CoreContext) -> Result<(), EngineError> {
        info!(group = %ctx.group, is_main = ctx.is_main, "Telegram commands tool started");
        self.ctx = Some(ctx);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.ctx = None;
        info!("Telegram commands tool stopped");
        Ok(())
    }

    async fn handle(&self, input: ToolInput) -> Result<ToolOutput, EngineError> {
        let ctx = self.context()?;
        let request = TelegramRequest::from_method(&input.method)
            .ok_or_else(|| ToolError::UnknownMethod(input.method.clone()))?;

        if !ctx.is_main {
            warn!(group = %ctx.group, method = %input.method, "Rejected non-main caller");
            let err = EngineError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string());
            return Ok(ToolOutput::error(err.to_string()));
        }

        let payload = match build_payload(request, &input) {
            Ok(payload) => payload,
            Err(ToolError::InvalidParameter(msg)) => return Ok(ToolOutput::error(msg)),
            Err(e) => return Err(e.into()),
        };

        let result = ctx
            .requester()
            .call_privileged(&request.task_type(), payload)
            .await;

        Ok(into_output(result))
    }
}

/// Validate tool parameters and shape them into a task payload
fn build_payload(
    request: TelegramRequest,
    input: &ToolInput,
) -> Result<Map<String, Value>, ToolError> {
    let mut payload = Map::new();

    match request {
        TelegramRequest::ListCommands | TelegramRequest::ClearCommands => {}
        TelegramRequest::AddCommand => {
            let command = normalize_command_name(&input.param_str("command")?);
            validate_command_name(&command).map_err(ToolError::InvalidParameter)?;
            let description = input.param_str("description")?.trim().to_string();
            validate_description(&description).map_err(ToolError::InvalidParameter)?;

            payload.insert("command".to_string(), Value::String(command));
            payload.insert("description".to_string(), Value::String(description));
        }
        TelegramRequest::RemoveCommand => {
            let command = normalize_command_name(&input.param_str("command")?);
            validate_command_name(&command).map_err(ToolError::InvalidParameter)?;
            payload.insert("command".to_string(), Value::String(command));
        }
        TelegramRequest::SetCommands => {
            let raw = input.param_json("commands")?.clone();
            let mut commands: Vec<BotCommand> = serde_json::from_value(raw).map_err(|e| {
                ToolError::InvalidParameter(format!(
                    "commands must be a list of {{command, description}} objects: {}",
                    e
                ))
            })?;
            for cmd in &mut commands {
                cmd.command = normalize_command_name(&cmd.command);
                validate_command_name(&cmd.command).map_err(ToolError::InvalidParameter)?;
                validate_description(&cmd.description).map_err(ToolError::InvalidParameter)?;
            }
            let commands = serde_json::to_value(commands)
                .map_err(|e| ToolError::InvalidParameter(e.to_string()))?;
            payload.insert("commands".to_string(), commands);
        }
    }

    Ok(payload)
}

fn into_output(result: ResultEntry) -> ToolOutput {
    match (result.success, result.data) {
        (true, Some(data)) => ToolOutput::text_with_data(result.message, data),
        (true, None) => ToolOutput::text(result.message),
        (false, _) => ToolOutput::error(result.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_payload_is_normalized() {
        let input = ToolInput::new("add_command")
            .with_param("command", json!("/demo"))
            .with_param("description", json!("  A demo  "));
        let payload = build_payload(TelegramRequest::AddCommand, &input).unwrap();
        assert_eq!(payload["command"], "demo");
        assert_eq!(payload["description"], "A demo");
    }

    #[test]
    fn test_add_payload_requires_description() {
        let input = ToolInput::new("add_command").with_param("command", json!("demo"));
        let err = build_payload(TelegramRequest::AddCommand, &input).unwrap_err();
        assert!(matches!(err, ToolError::MissingParameter(ref k) if k == "description"));
    }

    #[test]
    fn test_set_payload_rejects_bad_names() {
        let input = ToolInput::new("set_commands").with_param(
            "commands",
            json!([{"command": "Bad Name", "description": "nope"}]),
        );
        let err = build_payload(TelegramRequest::SetCommands, &input).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter(_)));
    }

    #[test]
    fn test_set_payload_rejects_non_list() {
        let input = ToolInput::new("set_commands").with_param("commands", json!("help"));
        assert!(build_payload(TelegramRequest::SetCommands, &input).is_err());
    }

    #[test]
    fn test_list_payload_is_empty() {
        let input = ToolInput::new("list_commands");
        assert!(build_payload(TelegramRequest::ListCommands, &input)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_into_output() {
        let ok = into_output(ResultEntry::success("1-a", "listed").with_data(json!([])));
        assert!(ok.success);
        assert_eq!(ok.as_text(), "listed");

        let failed = into_output(ResultEntry::failure("1-a", "Request timed out"));
        assert!(!failed.success);
        assert_eq!(failed.as_text(), "Request timed out");
    }

    #[tokio::test]
    async fn test_handle_before_start_is_an_error() {
        let tool = TelegramCommandsTool::new();
        let err = tool
            .handle(ToolInput::new("list_commands"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ToolError(_)));
    }
}
