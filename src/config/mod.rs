//! Configuration module for the expiry reminder bot.
//!
//! Two kinds of configuration live here: the reminder configuration
//! document persisted next to the user records, and process-level bot
//! settings read from the environment.

pub(crate) mod de;
mod reminder;
mod settings;

pub use reminder::ReminderConfig;
pub use settings::{BotSettings, ConfigError};

/// Calendar date format used in every persisted document.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default interval between reminder scans (24 hours).
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 24 * 60 * 60;
