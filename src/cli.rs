//! Command-line front end
//!
//! Arguments override the saved settings, the result is saved back, and a
//! tower pass runs with status printed to the console.

use crate::{PassOutcome, ProgressObserver, SettingsStore, TowerEngine};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use towerkit_settings::{keys, SettingsResult};

/// TowerKit - customize a temperature calibration tower
#[derive(Parser, Debug)]
#[command(name = "towerkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Temperature of the first level (°C)
    #[arg(requires = "max")]
    pub min: Option<String>,

    /// Temperature of the last level (°C)
    pub max: Option<String>,

    /// Sliced template tower to customize
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Degrees between consecutive levels
    #[arg(short, long)]
    pub step: Option<i64>,

    /// Number of levels the template provides
    #[arg(short, long)]
    pub level_cap: Option<i64>,

    /// Settings file to load and save (.json or .toml)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Command used for inserted set-points
    #[arg(long, value_enum)]
    pub synthetic_command: Option<SyntheticArg>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Inserted set-point command
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticArg {
    /// Set temperature and keep printing
    M104,
    /// Set temperature and wait for it
    M109,
}

impl Cli {
    /// Settings file this invocation uses
    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(SettingsStore::default_path)
    }

    /// Copy the given arguments into `store`, leaving the rest untouched
    pub fn apply(&self, store: &mut SettingsStore) -> SettingsResult<()> {
        if let Some(template) = &self.template {
            store.set(keys::TEMPLATE_PATH, &template.to_string_lossy())?;
        }
        if let Some(min) = &self.min {
            store.set_indexed(keys::TEMPERATURE, 0, min)?;
        }
        if let Some(max) = &self.max {
            store.set_indexed(keys::TEMPERATURE, 1, max)?;
        }
        if let Some(step) = self.step {
            store.set(keys::STEP, &step.to_string())?;
        }
        if let Some(cap) = self.level_cap {
            store.set(keys::LEVEL_CAP, &cap.to_string())?;
        }
        if let Some(command) = self.synthetic_command {
            let wait = command == SyntheticArg::M109;
            store.set(keys::WAIT_FOR_TEMPERATURE, &wait.to_string())?;
        }
        Ok(())
    }
}

/// Prints status text to stdout and logs progress
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_status(&self, text: &str) {
        println!("{}", text);
    }

    fn on_progress(&self, percent: u8) {
        tracing::info!("{}% complete", percent);
    }

    fn on_enable_controls(&self, enabled: bool) {
        tracing::debug!("Controls {}", if enabled { "enabled" } else { "disabled" });
    }
}

/// Load, update and save settings, then run one pass
pub async fn execute(cli: &Cli) -> anyhow::Result<PassOutcome> {
    let mut store = SettingsStore::open(cli.settings_path())?;
    cli.apply(&mut store)?;
    store.save()?;
    store.write_descriptions_once()?;

    let engine = Arc::new(TowerEngine::new(Arc::new(ConsoleObserver)));
    let outcome = engine.run_async(store.settings().clone()).await??;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_range_and_options() {
        let cli = Cli::try_parse_from([
            "towerkit",
            "190",
            "230",
            "--template",
            "petg.gcode",
            "--step",
            "10",
            "--synthetic-command",
            "m104",
        ])
        .unwrap();
        assert_eq!(cli.min.as_deref(), Some("190"));
        assert_eq!(cli.max.as_deref(), Some("230"));
        assert_eq!(cli.step, Some(10));
        assert_eq!(cli.synthetic_command, Some(SyntheticArg::M104));
    }

    #[test]
    fn test_min_requires_max() {
        assert!(Cli::try_parse_from(["towerkit", "190"]).is_err());
        assert!(Cli::try_parse_from(["towerkit"]).is_ok());
    }

    #[test]
    fn test_apply_overrides_only_given_values() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsStore::new(dir.path().join("settings.json"));
        store.set(keys::STEP, "10").unwrap();

        let cli = Cli::try_parse_from(["towerkit", "200", "hot", "--synthetic-command", "m104"])
            .unwrap();
        cli.apply(&mut store).unwrap();

        assert_eq!(store.get_indexed(keys::TEMPERATURE, 0).unwrap(), "200");
        assert_eq!(store.get_indexed(keys::TEMPERATURE, 1).unwrap(), "hot");
        assert_eq!(store.get(keys::STEP).unwrap(), "10");
        assert_eq!(store.get(keys::WAIT_FOR_TEMPERATURE).unwrap(), "false");
    }

    #[tokio::test]
    async fn test_execute_saves_settings_and_writes_tower() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("tower.gcode");
        std::fs::write(&template, "M104 S200\nG1 Z0.2\nG1 X1\nG1 Z0.4\nG1 X2\n").unwrap();
        let settings = dir.path().join("settings.json");

        let cli = Cli::try_parse_from([
            "towerkit".to_string(),
            "210".to_string(),
            "215".to_string(),
            "--template".to_string(),
            template.to_string_lossy().into_owned(),
            "--settings".to_string(),
            settings.to_string_lossy().into_owned(),
        ])
        .unwrap();

        let outcome = execute(&cli).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&outcome.output_path).unwrap(),
            "M104 S210\nG1 Z0.2\nM109 S215 ; towerkit: band 1\nG1 X1\nG1 Z0.4\n"
        );
        assert!(settings.exists());
        assert!(dir.path().join("settings descriptions.txt").exists());
    }

    #[tokio::test]
    async fn test_execute_saves_settings_even_when_invalid() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.toml");
        let cli = Cli::try_parse_from([
            "towerkit".to_string(),
            "230".to_string(),
            "180".to_string(),
            "--template".to_string(),
            dir.path().join("missing.gcode").to_string_lossy().into_owned(),
            "--settings".to_string(),
            settings.to_string_lossy().into_owned(),
        ])
        .unwrap();

        assert!(execute(&cli).await.is_err());
        let store = SettingsStore::open(&settings).unwrap();
        assert_eq!(store.get_indexed(keys::TEMPERATURE, 0).unwrap(), "230");
    }
}
