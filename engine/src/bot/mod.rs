//! Bot API clients used by the host

pub mod telegram;

pub use self::telegram::{BotApiError, BotCommandsApi, TelegramApiClient};
