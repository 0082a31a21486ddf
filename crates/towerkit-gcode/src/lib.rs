//! # TowerKit G-Code
//!
//! Streams a pre-sliced temperature tower template and rewrites it for a
//! requested temperature range:
//! - Line classification (moves, extruder set-points, positioning modes)
//! - Height tracking across absolute and relative positioning
//! - Temperature band scheduling
//! - Single-pass rewriting with truncation after the last band
//! - An engine that validates settings and publishes the output atomically

pub mod classifier;
pub mod engine;
pub mod height;
pub mod rewriter;
pub mod schedule;

pub use classifier::{classify_line, LineKind, ParsedLine, PositioningMode};
pub use engine::{output_path_for, PassOutcome, TowerEngine};
pub use height::{HeightTracker, HeightUpdate};
pub use rewriter::{
    RewriteReport, RewriteState, StreamError, SyntheticCommand, TowerRewriter,
    DEFAULT_HELD_LINE_LIMIT,
};
pub use schedule::{compute_bands, TemperatureBand, TemperatureSchedule};
