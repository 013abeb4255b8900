//! Reminder configuration document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::{ids_as_strings, lenient_string};

/// Process-wide reminder configuration, persisted as `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderConfig {
    /// User ids allowed to run privileged commands.
    #[serde(default, deserialize_with = "ids_as_strings")]
    pub admins: Vec<String>,

    /// Gate for the daily reminder scan.
    #[serde(default = "default_reminder_enabled")]
    pub reminder_enabled: bool,

    /// Day offsets before expiry that trigger a broadcast reminder.
    #[serde(default = "default_reminder_days_before")]
    pub reminder_days_before: Vec<i64>,

    /// Days after expiry at which admins are told about an expired user.
    #[serde(default = "default_expired_check_days")]
    pub expired_check_days: i64,

    /// Destination channel for broadcast reminders.
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_id: String,

    /// Keys this version does not know about, kept so a save does not drop
    /// them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_reminder_enabled() -> bool {
    true
}

fn default_reminder_days_before() -> Vec<i64> {
    vec![3, 0]
}

const fn default_expired_check_days() -> i64 {
    1
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            reminder_enabled: default_reminder_enabled(),
            reminder_days_before: default_reminder_days_before(),
            expired_check_days: default_expired_check_days(),
            group_id: String::new(),
            extra: Map::new(),
        }
    }
}

impl ReminderConfig {
    /// Checks whether `user_id` is listed as an admin.
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|admin| admin == user_id)
    }
}
