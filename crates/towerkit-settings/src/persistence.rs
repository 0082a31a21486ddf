//! Settings Persistence
//!
//! Handles loading and saving the tower settings from/to a configuration
//! file, and the one-time human-readable description written beside it.

use crate::config::{Settings, ValidatedSettings, SETTING_DESCRIPTORS};
use crate::error::SettingsResult;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use towerkit_core::ConfigurationError;

/// Settings file name inside the config directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Description file written beside the settings file
pub const DESCRIPTIONS_FILE_NAME: &str = "settings descriptions.txt";

const TEMPLATE_NOTE: &str = "\
  Template Compatibility:
  - Each rise in Z height starts a new level of the tower, so slice the
    template so that Z only rises where a new level begins.
  - Extruder set-points (M104, M109) in the template are rewritten to the
    temperature of the level they appear in; a level that starts without one
    gets one inserted right after its first move.";

/// Settings store bound to a file
///
/// Owns the in-memory [`Settings`] and the path they persist to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Settings,
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store with default settings for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            settings: Settings::default(),
            path: path.into(),
        }
    }

    /// Create a store for `path`, loading it if the file exists
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let mut store = Self::new(path);
        if store.path.exists() {
            store.load()?;
        } else {
            tracing::debug!(
                "No settings at {}, using defaults",
                store.path.display()
            );
        }
        Ok(store)
    }

    /// Default settings location in the platform config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("towerkit").join(SETTINGS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME))
    }

    /// Path the settings persist to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload settings from the file, replacing the in-memory values
    pub fn load(&mut self) -> SettingsResult<()> {
        self.settings = Settings::load_from_file(&self.path)?;
        tracing::debug!("Loaded settings from {}", self.path.display());
        Ok(())
    }

    /// Save settings to the file, creating its directory if needed
    ///
    /// Succeeds for settings that would fail validation.
    pub fn save(&self) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.settings.save_to_file(&self.path)?;
        tracing::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Get reference to settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable reference to settings
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn get(&self, key: &str) -> SettingsResult<String> {
        self.settings.get(key)
    }

    pub fn set(&mut self, key: &str, value: &str) -> SettingsResult<()> {
        self.settings.set(key, value)
    }

    pub fn get_indexed(&self, key: &str, index: usize) -> SettingsResult<String> {
        self.settings.get_indexed(key, index)
    }

    pub fn set_indexed(&mut self, key: &str, index: usize, value: &str) -> SettingsResult<()> {
        self.settings.set_indexed(key, index, value)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<ValidatedSettings, ConfigurationError> {
        self.settings.validate()
    }

    /// Path of the description file beside the settings file
    pub fn descriptions_path(&self) -> PathBuf {
        self.path.with_file_name(DESCRIPTIONS_FILE_NAME)
    }

    /// Human-readable description of every setting
    pub fn describe(&self) -> String {
        let mut text = String::new();
        text.push_str(TEMPLATE_NOTE);
        text.push('\n');
        text.push_str(&format!(
            "You can edit \"{}\" to change settings\n",
            self.path.display()
        ));
        text.push('\n');
        text.push_str("Settings:\n");
        for descriptor in SETTING_DESCRIPTORS {
            text.push_str(&format!(
                "- {}: ({}) {}\n",
                descriptor.key, descriptor.type_name, descriptor.description
            ));
        }
        text
    }

    /// Write the description file unless it already exists
    ///
    /// Returns `true` if the file was written by this call.
    pub fn write_descriptions_once(&self) -> SettingsResult<bool> {
        let path = self.descriptions_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(
                    "Settings descriptions were previously saved to {}",
                    path.display()
                );
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(self.describe().as_bytes()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(e.into());
        }

        tracing::info!("An explanation of settings has been written to {}", path.display());
        Ok(true)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}
