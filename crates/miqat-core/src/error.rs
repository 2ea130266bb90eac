//! Core error types for miqat-core.
//!
//! Most failures in this crate are recoverable and are modelled as explicit
//! fallback variants on the operation's return type instead. The errors here
//! cover what is genuinely exceptional: a storage backend that cannot be
//! opened, an invalid user setting, a malformed config file.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for miqat-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Prayer time provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Location errors
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// Notification errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database file
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// A thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,

    /// A value could not be encoded for storage
    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Prayer time service errors. Never escape `PrayerTimeProvider::fetch`;
/// they are carried inside `ProviderOutcome::Fallback` as the reason.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Device location errors. Always recovered by the fallback coordinate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location capability unavailable")]
    Unavailable,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Cached fix too old ({age_secs}s)")]
    StaleFix { age_secs: u64 },
}

/// Notification sink errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Adjustment outside the accepted minute range
    #[error("Adjustment of {minutes} minutes for '{boundary}' is outside {min}..={max}")]
    OutOfRange {
        boundary: String,
        minutes: i32,
        min: i32,
        max: i32,
    },

    /// Boundary cannot carry an alarm
    #[error("'{0}' is informational and cannot carry an alarm")]
    NotAlarmable(String),

    /// Unknown boundary name
    #[error("Unknown prayer boundary: {0}")]
    UnknownBoundary(String),

    /// Malformed HH:MM value
    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
