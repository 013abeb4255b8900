//! Fail-soft persistence helpers.
//!
//! Storage failures never reach the chat surface: readers fall back to the
//! document's default value and writers report a success flag, and both
//! log what went wrong. The fallible variants are kept for callers that
//! must report failures back to an operator.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::StoreError;

/// Reads and parses a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        what: path.display().to_string(),
        source,
    })
}

/// Writes a JSON document by writing a sibling temp file and renaming it over
/// the target, so a crash mid-write never leaves a truncated document.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Parse {
        what: path.display().to_string(),
        source,
    })?;

    let mut tmp_name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, content).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)
}

/// Loads a document, logging and returning `T::default()` on any failure.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match read_json(path) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to load {}: {}", what, e);
            T::default()
        }
    }
}

/// Saves a document, logging on failure. Returns whether the write landed.
pub fn save_or_log<T: Serialize>(path: &Path, value: &T, what: &str) -> bool {
    match write_json_atomic(path, value) {
        Ok(()) => {
            debug!("Saved {} to {}", what, path.display());
            true
        }
        Err(e) => {
            error!("Failed to save {}: {}", what, e);
            false
        }
    }
}

/// Writes `value` to `path` only if nothing exists there yet.
pub fn ensure_document<T: Serialize>(path: &Path, value: &T, what: &str) {
    if !path.exists() {
        save_or_log(path, value, what);
    }
}
