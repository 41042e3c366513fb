//! Request types and payloads exchanged with the host for bot command
//! management.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Type prefix shared by every Telegram request
pub const NAMESPACE: &str = "telegram_";

/// Maximum description length accepted by the Bot API
pub const MAX_DESCRIPTION_LEN: usize = 256;

/// A slash command as the Bot API models it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

/// Operations the host performs on the bot's command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramRequest {
    ListCommands,
    SetCommands,
    AddCommand,
    RemoveCommand,
    ClearCommands,
}

impl TelegramRequest {
    pub const ALL: [TelegramRequest; 5] = [
        Self::ListCommands,
        Self::SetCommands,
        Self::AddCommand,
        Self::RemoveCommand,
        Self::ClearCommands,
    ];

    /// Tool method name, also the sub-type after the namespace prefix
    pub fn method(self) -> &'static str {
        match self {
            Self::ListCommands => "list_commands",
            Self::SetCommands => "set_commands",
            Self::AddCommand => "add_command",
            Self::RemoveCommand => "remove_command",
            Self::ClearCommands => "clear_commands",
        }
    }

    /// Full task type written to the mailbox
    pub fn task_type(self) -> String {
        format!("{}{}", NAMESPACE, self.method())
    }

    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.method() == method)
    }

    /// Resolve a task type; `None` for types outside the namespace or
    /// unknown sub-types.
    pub fn from_task_type(kind: &str) -> Option<Self> {
        kind.strip_prefix(NAMESPACE).and_then(Self::from_method)
    }
}

/// Strip the leading slash and surrounding whitespace from a command name
pub fn normalize_command_name(name: &str) -> String {
    name.trim().trim_start_matches('/').to_string()
}

/// Check a normalized command name against the Bot API rules: 1-32
/// characters of lowercase letters, digits and underscores.
pub fn validate_command_name(name: &str) -> Result<(), String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]{1,32}$").expect("valid command pattern"));

    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "Invalid command name '{}': use 1-32 lowercase letters, digits or underscores",
            name
        ))
    }
}

/// Check a command description against the Bot API length limits
pub fn validate_description(description: &str) -> Result<(), String> {
    let len = description.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Command description must be 1-{} characters",
            MAX_DESCRIPTION_LEN
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_round_trip() {
        for request in TelegramRequest::ALL {
            assert_eq!(
                TelegramRequest::from_task_type(&request.task_type()),
                Some(request)
            );
        }
    }

    #[test]
    fn test_foreign_and_unknown_types() {
        assert_eq!(TelegramRequest::from_task_type("weather_get"), None);
        assert_eq!(TelegramRequest::from_task_type("telegram_explode"), None);
        assert_eq!(TelegramRequest::from_task_type("list_commands"), None);
    }

    #[test]
    fn test_normalize_command_name() {
        assert_eq!(normalize_command_name("/demo"), "demo");
        assert_eq!(normalize_command_name("  demo "), "demo");
    }

    #[test]
    fn test_validate_command_name() {
        assert!(validate_command_name("demo_2").is_ok());
        assert!(validate_command_name("Demo").is_err());
        assert!(validate_command_name("").is_err());
        assert!(validate_command_name(&"a".repeat(33)).is_err());
        assert!(validate_command_name("with space").is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Says hello").is_ok());
        assert!(validate_description("").is_err());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }
}
