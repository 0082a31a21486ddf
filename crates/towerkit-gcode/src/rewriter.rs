//! Temperature tower rewriting
//!
//! Streams a template line by line. Each rise in nozzle height starts the
//! next band of the tower: extruder set-points inside a band are rewritten
//! to the band's temperature, a band that starts without one gets one
//! inserted, and the stream is cut off at the move that would start the
//! band after the last.
//!
//! Lines are read as raw bytes and copied through with their original
//! terminators, so a template that only needs truncation comes out as a
//! byte-exact prefix of itself whatever its encoding.

use crate::classifier::{LineKind, ParsedLine};
use crate::height::HeightTracker;
use crate::schedule::TemperatureSchedule;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use towerkit_core::ProgressObserver;

/// Tag written in the comment of every inserted set-point
const SYNTHETIC_TAG: &str = "towerkit";

/// Comment and blank lines held back while a new band looks for its
/// set-point before one is inserted anyway
pub const DEFAULT_HELD_LINE_LIMIT: usize = 256;

/// Failure while streaming, split by which side failed
#[derive(Error, Debug)]
pub enum StreamError {
    /// Reading the template failed
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing the output failed
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

/// Command used for inserted set-points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntheticCommand {
    /// M104: set and continue
    SetOnly,
    /// M109: set and wait
    #[default]
    SetAndWait,
}

impl SyntheticCommand {
    pub fn from_wait(wait_for_temperature: bool) -> Self {
        if wait_for_temperature {
            Self::SetAndWait
        } else {
            Self::SetOnly
        }
    }

    pub fn word(&self) -> &'static str {
        match self {
            Self::SetOnly => "M104",
            Self::SetAndWait => "M109",
        }
    }
}

/// Where the rewriter is in the tower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// Copying lines of the given band
    Emitting(usize),
    /// Stopped after the move that would start a band past the last
    Truncated,
}

/// Counters from one rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Template lines read
    pub input_lines: usize,
    /// Lines written, inserted set-points included
    pub output_lines: usize,
    /// Height increases seen, including the truncating one
    pub height_increases: usize,
    /// Bands that produced output
    pub bands_emitted: usize,
    /// Set-points inserted for bands that had none
    pub inserted: usize,
    /// Template set-points rewritten in place
    pub rewritten: usize,
    /// Whether output stopped before the end of the template
    pub truncated: bool,
}

/// Band waiting for its first substantive line
#[derive(Debug)]
struct PendingBand {
    index: usize,
    terminator: Vec<u8>,
    held: Vec<Vec<u8>>,
}

/// Rewrites a template for one temperature schedule
#[derive(Debug, Clone, Copy)]
pub struct TowerRewriter<'a> {
    schedule: &'a TemperatureSchedule,
    synthetic: SyntheticCommand,
    held_line_limit: usize,
}

impl<'a> TowerRewriter<'a> {
    pub fn new(schedule: &'a TemperatureSchedule) -> Self {
        Self {
            schedule,
            synthetic: SyntheticCommand::default(),
            held_line_limit: DEFAULT_HELD_LINE_LIMIT,
        }
    }

    /// Use `command` for inserted set-points
    pub fn with_synthetic_command(mut self, command: SyntheticCommand) -> Self {
        self.synthetic = command;
        self
    }

    /// Hold at most `limit` comment lines while a band waits for its set-point
    ///
    /// Once the limit is reached the set-point is inserted before the held
    /// lines, as if the band had started with code.
    pub fn with_held_line_limit(mut self, limit: usize) -> Self {
        self.held_line_limit = limit;
        self
    }

    /// Line inserted at the start of a band that has no set-point
    pub fn synthetic_line(&self, index: usize) -> String {
        format!(
            "{} S{} ; {}: band {}",
            self.synthetic.word(),
            self.band_temperature(index),
            SYNTHETIC_TAG,
            index
        )
    }

    fn band_temperature(&self, index: usize) -> i64 {
        self.schedule
            .temperature(index)
            .unwrap_or_else(|| self.schedule.max())
    }

    /// Stream `reader` into `writer`
    ///
    /// The writer is flushed before returning. Progress is reported to
    /// `observer` at every band transition.
    pub fn rewrite<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
        observer: &dyn ProgressObserver,
    ) -> Result<RewriteReport, StreamError>
    where
        R: BufRead,
        W: Write,
    {
        let count = self.schedule.count();
        let mut report = RewriteReport {
            bands_emitted: 1,
            ..RewriteReport::default()
        };
        let mut tracker = HeightTracker::new();
        let mut state = RewriteState::Emitting(0);
        let mut pending: Option<PendingBand> = None;
        let mut line = Vec::new();

        while let RewriteState::Emitting(band) = state {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(StreamError::Read)?;
            if read == 0 {
                break;
            }
            report.input_lines += 1;

            let (body, terminator) = split_terminator(&line);
            let parsed = ParsedLine::parse_bytes(body);

            if let Some(mut waiting) = pending.take() {
                let settled = parsed.is_code() || waiting.held.len() >= self.held_line_limit;
                if !settled {
                    waiting.held.push(line.clone());
                    pending = Some(waiting);
                    continue;
                }
                if parsed.kind != LineKind::TemperatureSet {
                    self.write_synthetic(&mut writer, &waiting, &mut report)?;
                }
                for held in &waiting.held {
                    emit(&mut writer, held, &mut report)?;
                }
            }

            if parsed.kind == LineKind::TemperatureSet {
                let mut rewritten = parsed.with_temperature_bytes(self.band_temperature(band));
                tracing::trace!(
                    "band {}: '{}' -> '{}'",
                    band,
                    parsed.raw,
                    String::from_utf8_lossy(&rewritten)
                );
                rewritten.extend_from_slice(terminator);
                emit(&mut writer, &rewritten, &mut report)?;
                report.rewritten += 1;
            } else {
                emit(&mut writer, &line, &mut report)?;
            }

            if !tracker.update(&parsed).increased {
                continue;
            }
            report.height_increases += 1;

            let next = band + 1;
            if next >= count {
                tracing::debug!(
                    "Truncating after band {} at Z {} (line {})",
                    band,
                    tracker.z(),
                    report.input_lines
                );
                report.truncated = true;
                state = RewriteState::Truncated;
                continue;
            }

            tracing::debug!(
                "Band {} starts at Z {} with {} °C",
                next,
                tracker.z(),
                self.band_temperature(next)
            );
            report.bands_emitted += 1;
            state = RewriteState::Emitting(next);
            pending = Some(PendingBand {
                index: next,
                terminator: terminator.to_vec(),
                held: Vec::new(),
            });
            observer.on_progress(progress_percent(next, count));
        }

        if let Some(waiting) = pending {
            self.write_synthetic(&mut writer, &waiting, &mut report)?;
            for held in &waiting.held {
                emit(&mut writer, held, &mut report)?;
            }
        }

        writer.flush().map_err(StreamError::Write)?;
        Ok(report)
    }

    fn write_synthetic<W: Write>(
        &self,
        writer: &mut W,
        band: &PendingBand,
        report: &mut RewriteReport,
    ) -> Result<(), StreamError> {
        let text = self.synthetic_line(band.index);
        // A trigger on the last, unterminated line still needs a line break
        let mut line = Vec::with_capacity(text.len() + 2);
        if band.terminator.is_empty() {
            line.push(b'\n');
        }
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(&band.terminator);
        emit(writer, &line, report)?;
        report.inserted += 1;
        Ok(())
    }
}

fn emit<W: Write>(
    writer: &mut W,
    line: &[u8],
    report: &mut RewriteReport,
) -> Result<(), StreamError> {
    writer.write_all(line).map_err(StreamError::Write)?;
    report.output_lines += 1;
    Ok(())
}

/// Split a line into its body and its `\n` or `\r\n` terminator
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let body_len = if line.ends_with(b"\r\n") {
        line.len() - 2
    } else if line.ends_with(b"\n") {
        line.len() - 1
    } else {
        line.len()
    };
    line.split_at(body_len)
}

/// Percent complete when `band` of `count` starts
pub fn progress_percent(band: usize, count: usize) -> u8 {
    if count == 0 {
        return 100;
    }
    (band.saturating_mul(100) / count).min(100) as u8
}
