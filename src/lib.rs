//! # TowerKit
//!
//! Customizes a pre-sliced temperature calibration tower for a chosen
//! temperature range. Each rise in nozzle height starts the next level;
//! extruder set-points are rewritten per level and the print is cut off
//! after the last level the range needs.
//!
//! ## Architecture
//!
//! TowerKit is organized as a workspace with multiple crates:
//!
//! 1. **towerkit-core** - Error types and the progress observer trait
//! 2. **towerkit-settings** - Persisted settings, validation, descriptions
//! 3. **towerkit-gcode** - Classification, height tracking, scheduling, rewriting
//! 4. **towerkit** - Command-line front end that integrates all crates

pub mod cli;

pub use towerkit_core::{
    ConfigurationError, Error, IoError, NoOpObserver, ProgressObserver, ProgressObserverHandle,
    Result,
};

pub use towerkit_settings::{
    RangeEntry, Settings, SettingsError, SettingsResult, SettingsStore, ValidatedSettings,
};

pub use towerkit_gcode::{
    classify_line, compute_bands, output_path_for, HeightTracker, LineKind, ParsedLine,
    PassOutcome, PositioningMode, RewriteReport, SyntheticCommand, TemperatureBand,
    TemperatureSchedule, TowerEngine, TowerRewriter,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output to stderr, leaving stdout to status text
/// - RUST_LOG environment variable support, falling back to `default_level`
pub fn init_logging(default_level: tracing::Level) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
