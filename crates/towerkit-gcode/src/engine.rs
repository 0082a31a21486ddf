//! Tower pass engine
//!
//! Runs one complete pass: validate settings, compute the schedule, stream
//! the template into a staged file beside the output and publish it under
//! its final name. The front end hears about every step through its
//! [`ProgressObserver`].

use crate::rewriter::{RewriteReport, StreamError, SyntheticCommand, TowerRewriter};
use crate::schedule::TemperatureSchedule;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;
use towerkit_core::{Error, IoError, ProgressObserverHandle, Result};
use towerkit_settings::{Settings, ValidatedSettings, DEFAULT_TEMPLATE_PATH};

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Where the customized tower was written
    pub output_path: PathBuf,
    /// Temperatures used for each level
    pub schedule: TemperatureSchedule,
    /// Counters from the rewrite
    pub report: RewriteReport,
}

/// Output path for a template and range
///
/// The output sits beside the template, named `<min>-<max>_<template name>`.
pub fn output_path_for(template: &Path, min: i64, max: i64) -> PathBuf {
    let name = template
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from(DEFAULT_TEMPLATE_PATH));
    let mut output_name = OsString::from(format!("{}-{}_", min, max));
    output_name.push(name);
    template.with_file_name(output_name)
}

/// Clears the in-flight flag when a pass ends, however it ends
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs tower passes and reports to an observer
///
/// One pass at a time: a run started while another is in flight on the same
/// engine is rejected with [`Error::PassInProgress`].
pub struct TowerEngine {
    observer: ProgressObserverHandle,
    in_flight: AtomicBool,
}

impl TowerEngine {
    pub fn new(observer: ProgressObserverHandle) -> Self {
        Self {
            observer,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<PassGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::PassInProgress)?;
        Ok(PassGuard(&self.in_flight))
    }

    /// Run one pass on the calling thread
    ///
    /// Controls are disabled for the duration and re-enabled on every exit
    /// path. Failures are also reported as status text.
    pub fn run(&self, settings: &Settings) -> Result<PassOutcome> {
        let _guard = self.begin().inspect_err(|_| {
            tracing::warn!("Rejected tower pass: another pass is in progress");
        })?;

        self.observer.on_enable_controls(false);
        let result = self.execute(settings);
        if let Err(e) = &result {
            if e.is_configuration_error() {
                tracing::warn!("Tower pass not started: {}", e);
            } else {
                tracing::error!("Tower pass failed: {}", e);
            }
            self.observer.on_status(&e.to_string());
        }
        self.observer.on_enable_controls(true);
        result
    }

    /// Run one pass on the blocking thread pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_async(self: Arc<Self>, settings: Settings) -> JoinHandle<Result<PassOutcome>> {
        tokio::task::spawn_blocking(move || self.run(&settings))
    }

    fn execute(&self, settings: &Settings) -> Result<PassOutcome> {
        let validated = settings.validate()?;
        let schedule = TemperatureSchedule::from_settings(&validated)?;

        tracing::info!(
            "Generating {} levels from {} to {} °C in steps of {}",
            schedule.count(),
            schedule.min(),
            schedule.max(),
            schedule.step()
        );
        self.observer.on_status(&schedule.to_string());
        self.observer.on_progress(0);

        let output_path = output_path_for(&validated.template_path, validated.min, validated.max);
        let report = self.write_output(&validated, &schedule, &output_path)?;

        self.observer.on_progress(100);
        if report.bands_emitted < schedule.count() {
            tracing::warn!(
                "Template ended after {} of {} levels",
                report.bands_emitted,
                schedule.count()
            );
        }
        let status = format!(
            "Saved {} ({} of {} levels, {}-{} °C)",
            output_path.display(),
            report.bands_emitted,
            schedule.count(),
            schedule.min(),
            schedule.max()
        );
        tracing::info!("{}", status);
        self.observer.on_status(&status);

        Ok(PassOutcome {
            output_path,
            schedule,
            report,
        })
    }

    fn write_output(
        &self,
        settings: &ValidatedSettings,
        schedule: &TemperatureSchedule,
        output_path: &Path,
    ) -> Result<RewriteReport> {
        let template = &settings.template_path;
        let input = File::open(template).map_err(|source| IoError::UnreadableInput {
            path: template.clone(),
            source,
        })?;
        self.publish(BufReader::new(input), settings, schedule, output_path)
    }

    /// Stream `input` into a staged file and publish it as `output_path`
    ///
    /// The staged file is removed if anything fails before publication, so
    /// the output path either keeps its previous content or holds a
    /// complete tower.
    fn publish<R: BufRead>(
        &self,
        input: R,
        settings: &ValidatedSettings,
        schedule: &TemperatureSchedule,
        output_path: &Path,
    ) -> Result<RewriteReport> {
        let template = &settings.template_path;
        let staging_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut staged =
            NamedTempFile::new_in(&staging_dir).map_err(|source| IoError::UnwritableOutput {
                path: staging_dir.clone(),
                source,
            })?;
        tracing::debug!("Staging output at {}", staged.path().display());

        let rewriter = TowerRewriter::new(schedule)
            .with_synthetic_command(SyntheticCommand::from_wait(settings.wait_for_temperature));
        let report = rewriter
            .rewrite(
                input,
                BufWriter::new(staged.as_file_mut()),
                &*self.observer,
            )
            .map_err(|e| match e {
                StreamError::Read(source) => IoError::UnreadableInput {
                    path: template.clone(),
                    source,
                },
                StreamError::Write(source) => IoError::UnwritableOutput {
                    path: output_path.to_path_buf(),
                    source,
                },
            })?;

        staged
            .as_file()
            .sync_all()
            .map_err(|source| IoError::UnwritableOutput {
                path: output_path.to_path_buf(),
                source,
            })?;
        staged
            .persist(output_path)
            .map_err(|e| IoError::UnwritableOutput {
                path: output_path.to_path_buf(),
                source: e.error,
            })?;

        Ok(report)
    }
}

impl std::fmt::Debug for TowerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TowerEngine")
            .field("in_flight", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{self, Read};
    use tempfile::TempDir;

    /// Yields a few lines, then fails
    struct BrokenTemplate {
        lines: &'static [u8],
    }

    impl Read for BrokenTemplate {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.lines.is_empty() {
                return Err(io::Error::other("device removed"));
            }
            let n = self.lines.len().min(buf.len());
            buf[..n].copy_from_slice(&self.lines[..n]);
            self.lines = &self.lines[n..];
            Ok(n)
        }
    }

    fn settings_in(dir: &TempDir) -> ValidatedSettings {
        ValidatedSettings {
            template_path: dir.path().join("tower.gcode"),
            min: 180,
            max: 190,
            step: 5,
            level_cap: 10,
            wait_for_temperature: true,
        }
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_read_failure_mid_pass_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let schedule = TemperatureSchedule::from_settings(&settings).unwrap();
        let output_path = dir.path().join("180-190_tower.gcode");
        let engine = TowerEngine::new(Arc::new(towerkit_core::NoOpObserver));

        let input = BufReader::new(BrokenTemplate {
            lines: b"M104 S200\nG1 Z0.2\nG1 X1\n",
        });
        let result = engine.publish(input, &settings, &schedule, &output_path);

        assert!(matches!(
            result,
            Err(Error::Io(IoError::UnreadableInput { ref path, .. })) if *path == settings.template_path
        ));
        assert!(!output_path.exists());
        assert!(entries(&dir).is_empty());
    }

    #[test]
    fn test_read_failure_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let schedule = TemperatureSchedule::from_settings(&settings).unwrap();
        let output_path = dir.path().join("180-190_tower.gcode");
        fs::write(&output_path, "previous tower\n").unwrap();
        let engine = TowerEngine::new(Arc::new(towerkit_core::NoOpObserver));

        let input = BufReader::new(BrokenTemplate { lines: b"G1 Z0.2\n" });
        assert!(engine
            .publish(input, &settings, &schedule, &output_path)
            .is_err());

        assert_eq!(fs::read_to_string(&output_path).unwrap(), "previous tower\n");
        assert_eq!(entries(&dir), vec!["180-190_tower.gcode".to_string()]);
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("towers/petg.gcode"), 220, 250),
            PathBuf::from("towers/220-250_petg.gcode")
        );
        assert_eq!(
            output_path_for(Path::new("tower.gcode"), 180, 200),
            PathBuf::from("180-200_tower.gcode")
        );
    }

    #[test]
    fn test_guard_clears_flag() {
        let engine = TowerEngine::new(Arc::new(towerkit_core::NoOpObserver));
        {
            let _guard = engine.begin().unwrap();
            assert!(engine.is_running());
            assert!(matches!(engine.begin(), Err(Error::PassInProgress)));
        }
        assert!(!engine.is_running());
    }
}
