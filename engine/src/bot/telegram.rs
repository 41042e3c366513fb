//! Telegram Bot API command client
//!
//! Reads and replaces the bot's slash-command list. The Bot API only offers
//! full replacement (`setMyCommands`), so single-command edits are done by the
//! caller as read-modify-write.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use ::telegram::protocol::BotCommand;
use sdk::errors::EngineError;

/// Default Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Result type for Bot API operations
pub type Result<T> = std::result::Result<T, BotApiError>;

/// Errors from the Bot API
///
/// Messages never contain the request URL, which embeds the bot token.
#[derive(Debug, thiserror::Error)]
pub enum BotApiError {
    /// Telegram answered `ok: false`; carries its `description` verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from Telegram: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BotApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.without_url().to_string())
    }
}

impl From<BotApiError> for EngineError {
    fn from(err: BotApiError) -> Self {
        match err {
            BotApiError::Rejected(description) => Self::TelegramApi(description),
            BotApiError::Network(msg) => Self::Network(msg),
            malformed @ BotApiError::Malformed(_) => Self::TelegramApi(malformed.to_string()),
        }
    }
}

/// Access to the bot's command list
#[async_trait]
pub trait BotCommandsApi: Send + Sync {
    /// Current command list
    async fn get_my_commands(&self) -> Result<Vec<BotCommand>>;

    /// Replace the whole command list
    async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()>;
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Serialize)]
struct SetMyCommandsRequest<'a> {
    commands: &'a [BotCommand],
}

/// HTTP implementation of [`BotCommandsApi`]
#[derive(Clone)]
pub struct TelegramApiClient {
    token: String,
    api_base: String,
    client: Client,
}

impl std::fmt::Debug for TelegramApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApiClient")
            .field("api_base", &self.api_base)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TelegramApiClient {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Decode a Bot API reply, honoring its `ok` flag rather than the HTTP
    /// status alone.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| BotApiError::Malformed(format!("HTTP {}: {}", status, e)))?;

        if !parsed.ok {
            return Err(BotApiError::Rejected(parsed.description.unwrap_or_else(|| {
                format!("Telegram API returned ok=false (HTTP {})", status)
            })));
        }

        parsed
            .result
            .ok_or_else(|| BotApiError::Malformed("missing result field".to_string()))
    }
}

#[async_trait]
impl BotCommandsApi for TelegramApiClient {
    async fn get_my_commands(&self) -> Result<Vec<BotCommand>> {
        debug!("GET getMyCommands");
        let response = self
            .client
            .get(self.method_url("getMyCommands"))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        debug!("POST setMyCommands with {} commands", commands.len());
        let response = self
            .client
            .post(self.method_url("setMyCommands"))
            .json(&SetMyCommandsRequest { commands })
            .send()
            .await?;
        let _: bool = Self::decode(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_strips_trailing_slash() {
        let client = TelegramApiClient::new("123:abc", "http://localhost:9000/");
        assert_eq!(
            client.method_url("getMyCommands"),
            "http://localhost:9000/bot123:abc/getMyCommands"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = TelegramApiClient::new("123:secret", DEFAULT_API_BASE);
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_set_request_serialization() {
        let commands = vec![BotCommand::new("help", "Show help")];
        let body = serde_json::to_value(SetMyCommandsRequest {
            commands: &commands,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"commands": [{"command": "help", "description": "Show help"}]})
        );
    }

    #[test]
    fn test_rejected_displays_description_verbatim() {
        let err = BotApiError::Rejected("Bad Request: command is invalid".to_string());
        assert_eq!(err.to_string(), "Bad Request: command is invalid");
    }

    #[test]
    fn test_engine_error_keeps_api_wording() {
        let rejected: EngineError = BotApiError::Rejected("Bad Request: x".to_string()).into();
        assert!(matches!(rejected, EngineError::TelegramApi(_)));
        assert_eq!(rejected.to_string(), "Bad Request: x");

        let network: EngineError = BotApiError::Network("connection reset".to_string()).into();
        assert!(matches!(network, EngineError::Network(_)));
        assert_eq!(network.to_string(), "Network error: connection reset");

        let malformed: EngineError = BotApiError::Malformed("not json".to_string()).into();
        assert_eq!(
            malformed.to_string(),
            "Unexpected response from Telegram: not json"
        );
    }
}
