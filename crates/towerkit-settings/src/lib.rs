//! TowerKit Settings Crate
//!
//! Holds the tower configuration (template path, temperature range, step and
//! level cap), validates it before a pass, and persists it as JSON or TOML.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::keys;
pub use config::{
    RangeEntry, SettingDescriptor, Settings, ValidatedSettings, DEFAULT_LEVEL_CAP, DEFAULT_STEP,
    DEFAULT_TEMPLATE_PATH, MAX_LEVEL_CAP, SETTING_DESCRIPTORS,
};
pub use error::{SettingsError, SettingsResult};
pub use persistence::{SettingsStore, DESCRIPTIONS_FILE_NAME, SETTINGS_FILE_NAME};
