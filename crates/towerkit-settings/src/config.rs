//! Tower settings record and validation
//!
//! Provides the persisted settings shape, keyed access for front ends and
//! the validation that must pass before a tower is generated.
//!
//! Values are stored as entered. A temperature typed as `"19O"` survives a
//! save/load round-trip and is only rejected by [`Settings::validate`].

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use towerkit_core::ConfigurationError;

/// Template looked up when no path is configured
pub const DEFAULT_TEMPLATE_PATH: &str = "tower.gcode";

/// Degrees between consecutive levels
pub const DEFAULT_STEP: i64 = 5;

/// Levels available in the stock template tower
pub const DEFAULT_LEVEL_CAP: i64 = 10;

/// Largest level cap a pass accepts
pub const MAX_LEVEL_CAP: i64 = 1000;

/// Key names accepted by [`Settings::get`] and [`Settings::set`]
pub mod keys {
    pub const TEMPLATE_PATH: &str = "template_path";
    pub const TEMPERATURE: &str = "temperature";
    pub const STEP: &str = "step";
    pub const LEVEL_CAP: &str = "level_cap";
    pub const WAIT_FOR_TEMPERATURE: &str = "wait_for_temperature";
}

/// Documentation for one setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    pub key: &'static str,
    pub type_name: &'static str,
    pub description: &'static str,
}

/// Every setting, in the order they are documented
pub const SETTING_DESCRIPTORS: &[SettingDescriptor] = &[
    SettingDescriptor {
        key: keys::TEMPLATE_PATH,
        type_name: "path",
        description: "Look here for the sliced template tower G-code.",
    },
    SettingDescriptor {
        key: keys::TEMPERATURE,
        type_name: "[int, int]",
        description: "The first level is printed at temperature[0] (C); each following level \
                      adds step until the level printed at temperature[1], then printing stops.",
    },
    SettingDescriptor {
        key: keys::STEP,
        type_name: "int",
        description: "Change this many degrees at each level.",
    },
    SettingDescriptor {
        key: keys::LEVEL_CAP,
        type_name: "int",
        description: "This is how many levels the template tower has; a range needing more \
                      levels is rejected.",
    },
    SettingDescriptor {
        key: keys::WAIT_FOR_TEMPERATURE,
        type_name: "bool",
        description: "Inserted set-points wait for the nozzle to reach temperature (M109) \
                      when true, or continue printing while it heats (M104) when false.",
    },
];

/// One bound of the temperature range
///
/// Integers are kept as integers; anything else is kept verbatim so the
/// user's input is never lost before validation reports on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeEntry {
    /// A parsed temperature in °C
    Degrees(i64),
    /// Text that has not parsed as an integer
    Text(String),
}

impl RangeEntry {
    /// Parse user input, keeping it as text when it is not an integer
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(value) => Self::Degrees(value),
            Err(_) => Self::Text(text.to_string()),
        }
    }

    /// The temperature in °C, if this entry holds an integer
    pub fn degrees(&self) -> Option<i64> {
        match self {
            Self::Degrees(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Default for RangeEntry {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<i64> for RangeEntry {
    fn from(value: i64) -> Self {
        Self::Degrees(value)
    }
}

impl std::fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degrees(value) => write!(f, "{}", value),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Complete tower configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sliced template tower to customize
    pub template_path: PathBuf,
    /// Minimum and maximum temperature in °C
    pub temperature_range: [RangeEntry; 2],
    /// Degrees between consecutive levels
    pub step: i64,
    /// Maximum number of levels the template provides
    pub level_cap: i64,
    /// Use set-and-wait for inserted set-points
    pub wait_for_temperature: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            temperature_range: [RangeEntry::default(), RangeEntry::default()],
            step: DEFAULT_STEP,
            level_cap: DEFAULT_LEVEL_CAP,
            wait_for_temperature: true,
        }
    }
}

/// Settings that passed validation, with the range resolved to integers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSettings {
    pub template_path: PathBuf,
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub level_cap: i64,
    pub wait_for_temperature: bool,
}

impl ValidatedSettings {
    /// Number of levels the range needs
    pub fn level_count(&self) -> usize {
        self.max
            .checked_sub(self.min)
            .and_then(|span| span.checked_div(self.step))
            .map_or(0, |levels| levels as usize + 1)
    }
}

impl Settings {
    /// Create new settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings for a template and temperature range
    pub fn for_range(template_path: impl Into<PathBuf>, min: i64, max: i64) -> Self {
        Self {
            template_path: template_path.into(),
            temperature_range: [RangeEntry::Degrees(min), RangeEntry::Degrees(max)],
            ..Self::default()
        }
    }

    /// Get a scalar setting as text
    pub fn get(&self, key: &str) -> SettingsResult<String> {
        match key {
            keys::TEMPLATE_PATH => Ok(self.template_path.to_string_lossy().into_owned()),
            keys::STEP => Ok(self.step.to_string()),
            keys::LEVEL_CAP => Ok(self.level_cap.to_string()),
            keys::WAIT_FOR_TEMPERATURE => Ok(self.wait_for_temperature.to_string()),
            keys::TEMPERATURE => Err(SettingsError::InvalidSetting {
                key: key.to_string(),
                reason: "indexed setting; use get_indexed".to_string(),
            }),
            _ => Err(SettingsError::UnknownKey(key.to_string())),
        }
    }

    /// Set a scalar setting from text, converting it to the setting's type
    pub fn set(&mut self, key: &str, value: &str) -> SettingsResult<()> {
        match key {
            keys::TEMPLATE_PATH => self.template_path = PathBuf::from(value),
            keys::STEP => self.step = parse_integer(key, value)?,
            keys::LEVEL_CAP => self.level_cap = parse_integer(key, value)?,
            keys::WAIT_FOR_TEMPERATURE => {
                self.wait_for_temperature = value.trim().parse().map_err(|_| {
                    SettingsError::InvalidSetting {
                        key: key.to_string(),
                        reason: format!("'{}' is not true or false", value),
                    }
                })?;
            }
            keys::TEMPERATURE => {
                return Err(SettingsError::InvalidSetting {
                    key: key.to_string(),
                    reason: "indexed setting; use set_indexed".to_string(),
                })
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Get one element of an indexed setting as text
    pub fn get_indexed(&self, key: &str, index: usize) -> SettingsResult<String> {
        self.range_entry(key, index).map(|entry| entry.to_string())
    }

    /// Set one element of an indexed setting
    ///
    /// Any text is accepted; [`Settings::validate`] decides whether it is
    /// usable.
    pub fn set_indexed(&mut self, key: &str, index: usize, value: &str) -> SettingsResult<()> {
        self.range_entry(key, index)?;
        self.temperature_range[index] = RangeEntry::parse(value);
        Ok(())
    }

    fn range_entry(&self, key: &str, index: usize) -> SettingsResult<&RangeEntry> {
        if key != keys::TEMPERATURE {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        self.temperature_range
            .get(index)
            .ok_or_else(|| SettingsError::IndexOutOfRange {
                key: key.to_string(),
                index,
                len: self.temperature_range.len(),
            })
    }

    /// Describe a setting, preceded by its type in parentheses
    pub fn help(key: &str) -> Option<String> {
        SETTING_DESCRIPTORS
            .iter()
            .find(|d| d.key == key)
            .map(|d| format!("({}) {}", d.type_name, d.description))
    }

    /// Validate the settings before a pass
    ///
    /// Checks run in order: template readable, both bounds integers,
    /// max > min, step usable, level cap supported, and the range fitting
    /// within the level cap.
    pub fn validate(&self) -> Result<ValidatedSettings, ConfigurationError> {
        check_template(&self.template_path)?;

        let mut bounds = [0i64; 2];
        for (index, entry) in self.temperature_range.iter().enumerate() {
            bounds[index] = entry
                .degrees()
                .ok_or_else(|| ConfigurationError::NotAnInteger {
                    index,
                    value: entry.to_string(),
                })?;
        }
        let [min, max] = bounds;

        if max <= min {
            return Err(ConfigurationError::InvalidRange { min, max });
        }
        if self.step <= 0 {
            return Err(ConfigurationError::InvalidStep { step: self.step });
        }

        if self.level_cap > MAX_LEVEL_CAP {
            return Err(ConfigurationError::InvalidLevelCap {
                cap: self.level_cap,
                limit: MAX_LEVEL_CAP,
            });
        }

        // levels = span / step + 1, compared without overflowing
        let fits = match max.checked_sub(min) {
            Some(span) => span % self.step == 0 && span / self.step < self.level_cap,
            None => false,
        };
        if !fits {
            return Err(ConfigurationError::TooManyLevels {
                min,
                max,
                step: self.step,
                cap: self.level_cap,
            });
        }

        Ok(ValidatedSettings {
            template_path: self.template_path.clone(),
            min,
            max,
            step: self.step,
            level_cap: self.level_cap,
            wait_for_temperature: self.wait_for_temperature,
        })
    }

    /// Load settings from file (JSON or TOML)
    ///
    /// Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let settings = match extension(path).as_str() {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => return Err(SettingsError::UnsupportedFormat(other.to_string())),
        };

        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    ///
    /// Never validates, so an invalid but recoverable configuration is kept.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        let content = match extension(path).as_str() {
            "json" => serde_json::to_string_pretty(self)?,
            "toml" => toml::to_string_pretty(self)?,
            other => return Err(SettingsError::UnsupportedFormat(other.to_string())),
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

fn parse_integer(key: &str, value: &str) -> SettingsResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{}' is not an integer", value),
        })
}

fn check_template(path: &Path) -> Result<(), ConfigurationError> {
    let readable = path.is_file() && File::open(path).is_ok();
    if readable {
        Ok(())
    } else {
        Err(ConfigurationError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
