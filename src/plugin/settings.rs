//! Bulk get/set of the two store documents.
//!
//! This is the surface a settings UI or an offline tool talks to. Users are
//! exchanged as a pretty-printed JSON blob; bad input yields a failed
//! [`SaveOutcome`], never an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::ReminderConfig;
use crate::store::{RecordStore, UserMap, UserRecord};

/// Aggregate counts over the user collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub expired_users: usize,
}

impl UserStats {
    /// Counts `records` as of `today`.
    ///
    /// Active means expiring strictly after today; expired means expiring
    /// today or earlier. A record with no expiry counts as expired on
    /// 1970-01-01 and one with an unparsable expiry is in neither bucket.
    #[must_use]
    pub fn compute(records: &UserMap, today: NaiveDate) -> Self {
        let mut stats = Self {
            total_users: records.len(),
            ..Self::default()
        };

        for record in records.values() {
            match effective_expiry(record) {
                Some(expire) if expire > today => stats.active_users += 1,
                Some(_) => stats.expired_users += 1,
                None => {}
            }
        }

        stats
    }
}

fn effective_expiry(record: &UserRecord) -> Option<NaiveDate> {
    if record.expire_date.is_empty() {
        NaiveDate::from_ymd_opt(1970, 1, 1)
    } else {
        record.expire_on()
    }
}

/// Current contents of both documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// The users document, pretty-printed.
    pub users_json: String,
    pub config: ReminderConfig,
    pub stats: UserStats,
}

/// A bulk update. Absent parts are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    /// Replacement users document as a JSON string.
    #[serde(default)]
    pub users_json: Option<String>,

    /// Replacement config document.
    #[serde(default)]
    pub config: Option<Value>,
}

/// Result of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub message: String,
}

impl SaveOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            message: "Settings saved".to_owned(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Reads both documents.
pub fn snapshot(store: &RecordStore) -> SettingsSnapshot {
    let records = store.load_records();
    let users_json = serde_json::to_string_pretty(&records).unwrap_or_else(|e| {
        error!("Failed to serialize user records: {}", e);
        "{}".to_owned()
    });

    SettingsSnapshot {
        stats: UserStats::compute(&records, store.today()),
        users_json,
        config: store.load_config(),
    }
}

/// Applies a bulk update.
///
/// Both parts are parsed before anything is written, so malformed input
/// leaves both documents untouched. The writes themselves are not atomic
/// as a pair: users are written first, and if the config write then fails
/// the users document stays replaced and the failure message says so.
/// Returns the outcome and, when the config was replaced, the new config.
pub fn apply(store: &RecordStore, update: SettingsUpdate) -> (SaveOutcome, Option<ReminderConfig>) {
    let records = match update.users_json.as_deref().map(|json| serde_json::from_str::<UserMap>(json)) {
        Some(Err(e)) => return (SaveOutcome::failed(format!("Invalid JSON: {e}")), None),
        Some(Ok(records)) => Some(records),
        None => None,
    };

    let config = match update.config.map(serde_json::from_value::<ReminderConfig>) {
        Some(Err(e)) => return (SaveOutcome::failed(format!("Invalid JSON: {e}")), None),
        Some(Ok(config)) => Some(config),
        None => None,
    };

    if let Some(records) = &records
        && let Err(e) = store.try_save_records(records)
    {
        error!("Failed to save settings: {}", e);
        return (SaveOutcome::failed(format!("Save failed: {e}")), None);
    }

    if let Some(config) = &config
        && let Err(e) = store.try_save_config(config)
    {
        error!("Failed to save settings: {}", e);
        let message = if records.is_some() {
            format!("Save failed: {e} (users document was already saved)")
        } else {
            format!("Save failed: {e}")
        };
        return (SaveOutcome::failed(message), None);
    }

    info!(
        "Settings saved (users: {}, config: {})",
        records.as_ref().map_or_else(|| "unchanged".to_owned(), |r| r.len().to_string()),
        if config.is_some() { "replaced" } else { "unchanged" }
    );
    (SaveOutcome::ok(), config)
}
