//! Temperature band scheduling
//!
//! Splits a temperature range into evenly spaced levels, one per tower band.

use std::fmt;
use towerkit_core::ConfigurationError;
use towerkit_settings::{ValidatedSettings, MAX_LEVEL_CAP};

/// One level of the tower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureBand {
    /// Zero-based level index
    pub index: usize,
    /// Set-point for the level in °C
    pub temperature: i64,
}

/// Ordered temperatures for every level of a tower pass
///
/// Level `i` is printed at `min + i * step`; the last level is exactly `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureSchedule {
    bands: Vec<TemperatureBand>,
    step: i64,
}

/// Compute the level temperatures for a range
///
/// Fails when `max <= min`, `step <= 0`, `cap` exceeds [`MAX_LEVEL_CAP`],
/// the span is not a multiple of `step`, or more than `cap` levels would be
/// needed.
pub fn compute_bands(
    min: i64,
    max: i64,
    step: i64,
    cap: i64,
) -> Result<TemperatureSchedule, ConfigurationError> {
    if max <= min {
        return Err(ConfigurationError::InvalidRange { min, max });
    }
    if step <= 0 {
        return Err(ConfigurationError::InvalidStep { step });
    }
    if cap > MAX_LEVEL_CAP {
        return Err(ConfigurationError::InvalidLevelCap {
            cap,
            limit: MAX_LEVEL_CAP,
        });
    }
    let count = match max.checked_sub(min) {
        Some(span) if span % step == 0 && span / step < cap => span / step + 1,
        _ => {
            return Err(ConfigurationError::TooManyLevels {
                min,
                max,
                step,
                cap,
            })
        }
    };

    let bands = (0..count)
        .map(|i| TemperatureBand {
            index: i as usize,
            temperature: min + i * step,
        })
        .collect();
    Ok(TemperatureSchedule { bands, step })
}

impl TemperatureSchedule {
    /// Schedule for settings that already passed validation
    pub fn from_settings(settings: &ValidatedSettings) -> Result<Self, ConfigurationError> {
        compute_bands(settings.min, settings.max, settings.step, settings.level_cap)
    }

    /// All levels in print order
    pub fn bands(&self) -> &[TemperatureBand] {
        &self.bands
    }

    /// Number of levels
    pub fn count(&self) -> usize {
        self.bands.len()
    }

    /// Temperature of a level, if it exists
    pub fn temperature(&self, index: usize) -> Option<i64> {
        self.bands.get(index).map(|band| band.temperature)
    }

    pub fn min(&self) -> i64 {
        self.bands.first().map(|b| b.temperature).unwrap_or_default()
    }

    pub fn max(&self) -> i64 {
        self.bands.last().map(|b| b.temperature).unwrap_or_default()
    }

    pub fn step(&self) -> i64 {
        self.step
    }
}

impl fmt::Display for TemperatureSchedule {
    /// Two-row table of level numbers over their temperatures
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .bands
            .iter()
            .map(|b| b.temperature.to_string().len().max(b.index.to_string().len()))
            .max()
            .unwrap_or(0)
            + 2;

        write!(f, "{:<13}", "level:")?;
        for band in &self.bands {
            write!(f, "{:<width$}", band.index, width = width)?;
        }
        writeln!(f)?;
        write!(f, "{:<13}", "temperature:")?;
        for band in &self.bands {
            write!(f, "{:<width$}", band.temperature, width = width)?;
        }
        Ok(())
    }
}
