mod config;
pub mod database;
pub mod memory;
pub mod scope;

pub use config::{Config, CountdownConfig, LocationConfig, NotificationsConfig, ProviderConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use scope::{SessionKeyScope, GLOBAL_KEYS};

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;

/// String-keyed, string-valued synchronous storage.
///
/// This is the only persistence substrate the prayer subsystem touches:
/// coordinates, adjustments, alarm flags and the session identity all live
/// here as plain strings or JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Every key currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Read a JSON document. A value that fails to parse is treated as absent.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unparseable stored value");
            Ok(None)
        }
    }
}

/// Write a JSON document.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Returns the miqat data directory, creating it if needed.
///
/// `MIQAT_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/miqat`, or `~/.config/miqat-dev` when `MIQAT_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("MIQAT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MIQAT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("miqat-dev")
            } else {
                base_dir.join("miqat")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}
