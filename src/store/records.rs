//! User records and the record store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::persist::{ensure_document, load_or_default, read_json, save_or_log, write_json_atomic};
use super::{CONFIG_FILE, StoreError, USERS_FILE};
use crate::clock::Clock;
use crate::config::de::lenient_string;
use crate::config::{DATE_FORMAT, ReminderConfig};

/// The persisted user collection, keyed by user id.
pub type UserMap = BTreeMap<String, UserRecord>;

/// One user's subscription window.
///
/// Dates are kept as the strings found on disk so that a malformed value
/// survives a load/save cycle untouched; parse them with [`Self::expire_on`]
/// and [`Self::start_on`]. Non-string values are read as strings and `null`
/// as empty, so one hand-edited field never fails the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Display name on the external platform. Empty when unset.
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform_username: String,

    /// Date the record was created (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_date: String,

    /// Date after which the user is expired (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub expire_date: String,

    /// Fields this version does not know about, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Creates a record starting on `start` and expiring on `expire`.
    #[must_use]
    pub fn new(username: impl Into<String>, start: NaiveDate, expire: NaiveDate) -> Self {
        Self {
            platform_username: username.into(),
            start_date: format_date(start),
            expire_date: format_date(expire),
            extra: Map::new(),
        }
    }

    /// Parsed expiry date, `None` if the stored value is malformed.
    #[must_use]
    pub fn expire_on(&self) -> Option<NaiveDate> {
        parse_date(&self.expire_date)
    }

    /// Parsed start date, `None` if the stored value is malformed.
    #[must_use]
    pub fn start_on(&self) -> Option<NaiveDate> {
        parse_date(&self.start_date)
    }

    /// Whole days from `today` until expiry. Negative once expired.
    #[must_use]
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.expire_on()
            .map(|expire| expire.signed_duration_since(today).num_days())
    }
}

/// Formats a date the way every document stores it.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a stored `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Shifts `date` by a signed number of days.
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, StoreError> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| StoreError::DateOutOfRange(format_date(date), days))
}

/// Record store over `users.json` and `config.json`.
///
/// Every read-modify-write sequence runs under one store-wide lock, so
/// concurrent command handling and reminder scans never lose updates.
pub struct RecordStore {
    users_path: PathBuf,
    config_path: PathBuf,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl RecordStore {
    /// Opens the store in `data_dir`, creating the directory and default
    /// documents when absent.
    pub fn open(data_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|source| StoreError::Io {
            path: data_dir.display().to_string(),
            source,
        })?;

        let store = Self {
            users_path: data_dir.join(USERS_FILE),
            config_path: data_dir.join(CONFIG_FILE),
            clock,
            lock: Mutex::new(()),
        };

        ensure_document(&store.users_path, &UserMap::new(), "user records");
        ensure_document(&store.config_path, &ReminderConfig::default(), "config");

        info!("Record store opened at {}", data_dir.display());
        Ok(store)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Today's date according to the store's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Path of the user-record document.
    #[must_use]
    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    /// Path of the configuration document.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads all user records. Missing or malformed documents yield an
    /// empty collection.
    pub fn load_records(&self) -> UserMap {
        let _guard = self.guard();
        load_or_default(&self.users_path, "user records")
    }

    /// Overwrites the user-record document. Failures are logged.
    pub fn save_records(&self, records: &UserMap) -> bool {
        let _guard = self.guard();
        save_or_log(&self.users_path, records, "user records")
    }

    /// Overwrites the user-record document, reporting failures.
    pub fn try_save_records(&self, records: &UserMap) -> Result<(), StoreError> {
        let _guard = self.guard();
        write_json_atomic(&self.users_path, records)
    }

    /// Loads the reminder configuration, falling back to defaults.
    pub fn load_config(&self) -> ReminderConfig {
        let _guard = self.guard();
        load_or_default(&self.config_path, "config")
    }

    /// Overwrites the configuration document. Failures are logged.
    pub fn save_config(&self, config: &ReminderConfig) -> bool {
        let _guard = self.guard();
        save_or_log(&self.config_path, config, "config")
    }

    /// Overwrites the configuration document, reporting failures.
    pub fn try_save_config(&self, config: &ReminderConfig) -> Result<(), StoreError> {
        let _guard = self.guard();
        write_json_atomic(&self.config_path, config)
    }

    /// Creates or updates a user record.
    ///
    /// A new record starts today and expires `extend_days` from today (or
    /// today when `extend_days <= 0`). For an existing record a given
    /// `username` replaces the stored one, and a positive `extend_days`
    /// extends from whichever is later, the current expiry or today. A
    /// malformed stored expiry extends from today.
    ///
    /// A users document that exists but cannot be parsed is left alone and
    /// reported as an error rather than overwritten.
    pub fn upsert_user(
        &self,
        user_id: &str,
        username: Option<&str>,
        extend_days: i64,
    ) -> Result<UserRecord, StoreError> {
        let _guard = self.guard();
        let today = self.clock.today();
        let mut records: UserMap = match read_json(&self.users_path) {
            Ok(records) => records,
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                UserMap::new()
            }
            Err(e) => return Err(e),
        };

        let record = if let Some(record) = records.get_mut(user_id) {
            if let Some(name) = username {
                record.platform_username = name.to_owned();
            }
            if extend_days > 0 {
                let base = record.expire_on().map_or(today, |expire| expire.max(today));
                record.expire_date = format_date(shift_days(base, extend_days)?);
            }
            record.clone()
        } else {
            let expire = if extend_days > 0 {
                shift_days(today, extend_days)?
            } else {
                today
            };
            let record = UserRecord::new(username.unwrap_or_default(), today, expire);
            records.insert(user_id.to_owned(), record.clone());
            info!("Created record for user {}", user_id);
            record
        };

        save_or_log(&self.users_path, &records, "user records");
        debug!("Upserted user {}: expires {}", user_id, record.expire_date);
        Ok(record)
    }

    /// Looks up one user's record.
    pub fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        self.load_records().remove(user_id)
    }

    /// Returns every record whose stored expiry equals `date` exactly.
    ///
    /// Matching is exact string equality against the formatted date; a
    /// record whose expiry cannot be parsed never matches.
    pub fn find_by_expire_date(&self, date: NaiveDate) -> Vec<(String, UserRecord)> {
        let target = format_date(date);
        self.load_records()
            .into_iter()
            .filter(|(_, record)| record.expire_date == target)
            .collect()
    }

    /// Records expiring exactly `days_from_now` days after today.
    pub fn find_expiring_in(&self, days_from_now: i64) -> Result<Vec<(String, UserRecord)>, StoreError> {
        let date = shift_days(self.clock.today(), days_from_now)?;
        Ok(self.find_by_expire_date(date))
    }

    /// Records that expired exactly `days_ago` days before today.
    pub fn find_expired_since(&self, days_ago: i64) -> Result<Vec<(String, UserRecord)>, StoreError> {
        let date = shift_days(self.clock.today(), days_ago.saturating_neg())?;
        Ok(self.find_by_expire_date(date))
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("users_path", &self.users_path)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}
