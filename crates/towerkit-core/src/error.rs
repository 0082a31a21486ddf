//! Error handling for TowerKit
//!
//! Provides the error types for every stage of a tower pass:
//! - Configuration errors (detected before any output is written)
//! - I/O errors (fatal during a pass; staged output is discarded)
//!
//! Unrecognized G-code is never an error; it passes through verbatim.
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
///
/// Raised by settings validation. A pass that hits one of these aborts
/// before a single output byte is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Template file is missing or unreadable
    #[error("Template file not found: {}", .path.display())]
    FileNotFound {
        /// The template path that could not be opened.
        path: PathBuf,
    },

    /// A temperature bound is not an integer
    #[error("Temperature {} is not an integer: '{value}'", bound_name(.index))]
    NotAnInteger {
        /// 0 for the minimum, 1 for the maximum.
        index: usize,
        /// The text that failed to parse.
        value: String,
    },

    /// The maximum temperature does not exceed the minimum
    #[error("Invalid temperature range: max ({max}) must be greater than min ({min})")]
    InvalidRange {
        /// Lower bound in °C.
        min: i64,
        /// Upper bound in °C.
        max: i64,
    },

    /// The temperature step cannot partition a range
    #[error("Invalid temperature step: {step} (must be greater than 0)")]
    InvalidStep {
        /// The rejected step in °C.
        step: i64,
    },

    /// The level cap is beyond what a single pass supports
    #[error("Invalid level cap: {cap} (must be at most {limit})")]
    InvalidLevelCap {
        /// The rejected cap.
        cap: i64,
        /// Largest supported cap.
        limit: i64,
    },

    /// The range does not split into at most `cap` evenly spaced levels
    #[error(
        "Temperature range {min}-{max} does not split into at most {cap} levels of {step} °C"
    )]
    TooManyLevels {
        /// Lower bound in °C.
        min: i64,
        /// Upper bound in °C.
        max: i64,
        /// Step between levels in °C.
        step: i64,
        /// Maximum number of levels allowed.
        cap: i64,
    },
}

/// Returns the settings name of a temperature range bound.
pub fn range_bound_name(index: usize) -> &'static str {
    match index {
        0 => "min",
        1 => "max",
        _ => "out-of-range",
    }
}

fn bound_name(index: &usize) -> &'static str {
    range_bound_name(*index)
}

/// Pass I/O error type
///
/// Represents failures while streaming the template into the staged output.
#[derive(Error, Debug)]
pub enum IoError {
    /// The template could not be opened or read
    #[error("Cannot read template {}: {source}", .path.display())]
    UnreadableInput {
        /// The template path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The staged output could not be created, written or published
    #[error("Cannot write output {}: {source}", .path.display())]
    UnwritableOutput {
        /// The output path (final name, or its directory while staging).
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Main error type for TowerKit
///
/// A unified error type used by the public engine API.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Pass I/O error
    #[error(transparent)]
    Io(#[from] IoError),

    /// Another pass is already running on this engine
    #[error("A tower pass is already in progress on this engine")]
    PassInProgress,
}

impl Error {
    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
