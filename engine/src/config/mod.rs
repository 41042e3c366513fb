//! Configuration management
//!
//! This module handles loading, validation, and management of the hostbridge
//! configuration. Configuration is stored in TOML format at
//! ~/.hostbridge/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **ipc**: Mailbox location, polling, timeouts and retention
//! - **telegram**: Bot API endpoint and the environment variable holding the token
//! - **weather**: Weather service endpoint and timeout
//!
//! The bot token itself is never written to the config file; only the name of
//! the environment variable it is read from.
//!
//! # Examples
//!
//! ```no_run
//! use hostbridge_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Mailbox: {}", config.ipc_paths().root().display());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::ipc::IpcPaths;
use sdk::requester::RequesterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Mailbox settings
    #[serde(default)]
    pub ipc: IpcConfig,

    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Weather service settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Mailbox root holding `tasks/`, `results/` and `quarantine/`.
    /// Defaults to `<data_dir>/ipc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// How often both sides poll their directory
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a requester waits for its result
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Age after which unclaimed files are swept
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// How often the sweeper runs while serving
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Environment variable holding the bot token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Weather service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the wttr.in service
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.hostbridge")
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_telegram_api_base() -> String {
    crate::bot::telegram::DEFAULT_API_BASE.to_string()
}

fn default_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_weather_base_url() -> String {
    weather::client::DEFAULT_BASE_URL.to_string()
}

fn default_weather_timeout_secs() -> u64 {
    15
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            root: None,
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            token_env: default_token_env(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.hostbridge/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Written before processing so `~` stays unexpanded in the file
        let defaults = Self::default_config();
        let toml_string = toml::to_string_pretty(&defaults)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = defaults;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.hostbridge/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".hostbridge").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            ipc: IpcConfig::default(),
            telegram: TelegramConfig::default(),
            weather: WeatherConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Rejects unknown log levels and zero intervals, and expands `~` in the
    /// data and mailbox directories.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let intervals = [
            ("ipc.poll_interval_ms", self.ipc.poll_interval_ms),
            ("ipc.request_timeout_ms", self.ipc.request_timeout_ms),
            ("ipc.retention_secs", self.ipc.retention_secs),
            ("ipc.sweep_interval_secs", self.ipc.sweep_interval_secs),
            ("weather.timeout_secs", self.weather.timeout_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(EngineError::Config(format!(
                "{} must be greater than zero",
                name
            )));
        }

        if self.telegram.token_env.trim().is_empty() {
            return Err(EngineError::Config(
                "telegram.token_env must name an environment variable".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if let Some(root) = &self.ipc.root {
            self.ipc.root = Some(expand_path(root)?);
        }

        Ok(())
    }

    /// Mailbox root directory
    pub fn ipc_root(&self) -> PathBuf {
        self.ipc
            .root
            .clone()
            .unwrap_or_else(|| self.core.data_dir.join("ipc"))
    }

    /// Mailbox directory layout
    pub fn ipc_paths(&self) -> IpcPaths {
        IpcPaths::new(self.ipc_root())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ipc.poll_interval_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.ipc.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.ipc.sweep_interval_secs)
    }

    /// Requester timing for tools running against this mailbox
    pub fn requester_config(&self) -> RequesterConfig {
        RequesterConfig {
            poll_interval: self.poll_interval(),
            timeout: Duration::from_millis(self.ipc.request_timeout_ms),
        }
    }

    /// Bot token from the configured environment variable; empty counts as unset
    pub fn telegram_token(&self) -> Option<String> {
        std::env::var(&self.telegram.token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.ipc.poll_interval_ms, 500);
        assert_eq!(config.ipc.request_timeout_ms, 10_000);
        assert_eq!(config.ipc.retention_secs, 3600);
        assert_eq!(config.ipc.sweep_interval_secs, 300);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.token_env, "TELEGRAM_BOT_TOKEN");
        assert_eq!(config.weather.base_url, "https://wttr.in");
        assert_eq!(config.weather.timeout_secs, 15);
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config = Config::from_toml_str("[core]\ndata_dir = \"/srv/hostbridge\"\n").unwrap();

        assert_eq!(config.ipc_root(), PathBuf::from("/srv/hostbridge/ipc"));
        assert_eq!(
            config.ipc_paths().tasks_dir(),
            Path::new("/srv/hostbridge/ipc/tasks")
        );
        assert_eq!(config.requester_config(), RequesterConfig::default());
    }

    #[test]
    fn test_explicit_ipc_root() {
        let config = Config::from_toml_str(
            "[core]\ndata_dir = \"/srv/hb\"\n[ipc]\nroot = \"/tmp/mailbox\"\nrequest_timeout_ms = 2500\n",
        )
        .unwrap();

        assert_eq!(config.ipc_root(), PathBuf::from("/tmp/mailbox"));
        assert_eq!(config.requester_config().timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("loud")));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = Config::from_toml_str("[core]\n[ipc]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("ipc.poll_interval_ms"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[core]\nlog_level = \"debug\"\n[telegram]\ntoken_env = \"HB_TEST_TOKEN\"\n")
            .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.telegram.token_env, "HB_TEST_TOKEN");
    }

    #[test]
    fn test_create_default_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::create_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.core.log_level, "info");

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("~/.hostbridge"));
    }

    #[test]
    fn test_telegram_token_ignores_empty_value() {
        let mut config = Config::default_config();
        config.telegram.token_env = "HB_CONFIG_TEST_TOKEN_EMPTY".to_string();

        std::env::set_var("HB_CONFIG_TEST_TOKEN_EMPTY", "  ");
        assert_eq!(config.telegram_token(), None);

        std::env::set_var("HB_CONFIG_TEST_TOKEN_EMPTY", "123:abc");
        assert_eq!(config.telegram_token(), Some("123:abc".to_string()));
        std::env::remove_var("HB_CONFIG_TEST_TOKEN_EMPTY");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.ipc.retention_secs, deserialized.ipc.retention_secs);
    }
}
