//! Process settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DEFAULT_REMINDER_INTERVAL_SECS;

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Directory holding `users.json` and `config.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prefix every command token must start with.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Interval between reminder scans in seconds.
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_secs: u64,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_command_prefix() -> String {
    "/".to_owned()
}

const fn default_reminder_interval() -> u64 {
    DEFAULT_REMINDER_INTERVAL_SECS
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            command_prefix: default_command_prefix(),
            reminder_interval_secs: default_reminder_interval(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR").map_or_else(|_| default_data_dir(), PathBuf::from),
            command_prefix: std::env::var("COMMAND_PREFIX")
                .unwrap_or_else(|_| default_command_prefix()),
            reminder_interval_secs: std::env::var("REMINDER_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_reminder_interval),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        }
    }

    /// Checks that the settings can drive a running bot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyCommandPrefix);
        }
        if self.command_prefix.contains(char::is_whitespace) {
            return Err(ConfigError::WhitespaceInPrefix(self.command_prefix.clone()));
        }
        if self.reminder_interval_secs == 0 {
            return Err(ConfigError::ZeroReminderInterval);
        }
        Ok(())
    }

    /// Interval between reminder scans.
    #[must_use]
    pub const fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Command prefix must not be empty")]
    EmptyCommandPrefix,

    #[error("Command prefix must not contain whitespace: {0:?}")]
    WhitespaceInPrefix(String),

    #[error("Reminder interval must be greater than 0 seconds")]
    ZeroReminderInterval,
}
