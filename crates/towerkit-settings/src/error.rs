//! Error types for the settings crate.
//!
//! These cover keyed access and persistence. Validation failures are
//! reported with [`towerkit_core::ConfigurationError`] instead, since the
//! engine surfaces them to the front end.

use std::io;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The key does not name a setting.
    #[error("{0} is not a valid setting name")]
    UnknownKey(String),

    /// A value could not be converted to the setting's type.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// An indexed setting was accessed past its end.
    #[error("Index {index} is out of range for '{key}' (length {len})")]
    IndexOutOfRange { key: String, index: usize, len: usize },

    /// The settings file extension is not supported.
    #[error("Unsupported settings format: {0}")]
    UnsupportedFormat(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
