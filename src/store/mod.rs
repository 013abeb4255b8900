//! Durable record store.
//!
//! Holds the user-record collection and the reminder configuration as two
//! independent JSON documents in the data directory.

pub mod persist;
mod records;

use thiserror::Error;

pub use records::{RecordStore, UserMap, UserRecord};

/// File name of the user-record document.
pub const USERS_FILE: &str = "users.json";

/// File name of the reminder configuration document.
pub const CONFIG_FILE: &str = "config.json";

/// Errors that can occur while reading or writing store documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Date out of range: {0} + {1} days")]
    DateOutOfRange(String, i64),
}
