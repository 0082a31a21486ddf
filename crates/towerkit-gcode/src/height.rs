//! Nozzle height tracking
//!
//! Follows the Z coordinate through a stream of classified lines, honoring
//! G90/G91 positioning, and reports when a move raises the nozzle.

use crate::classifier::{LineKind, ParsedLine, PositioningMode};

/// Result of feeding one line to a [`HeightTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightUpdate {
    /// The line moved the nozzle strictly higher than before
    pub increased: bool,
    /// Z after the line
    pub z: f64,
}

/// Tracks current Z and positioning mode
///
/// Starts at Z 0 in absolute mode. Only moves carrying a numeric Z word
/// change the height; homing and coordinate resets are not interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightTracker {
    z: f64,
    mode: PositioningMode,
}

impl HeightTracker {
    pub fn new() -> Self {
        Self {
            z: 0.0,
            mode: PositioningMode::Absolute,
        }
    }

    /// Current Z
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Current positioning mode
    pub fn mode(&self) -> PositioningMode {
        self.mode
    }

    /// Apply one line and report whether it raised the nozzle
    pub fn update(&mut self, line: &ParsedLine) -> HeightUpdate {
        let previous = self.z;
        match line.kind {
            LineKind::ModeSwitch(mode) => self.mode = mode,
            LineKind::Move => {
                if let Some(z) = line.z {
                    self.z = match self.mode {
                        PositioningMode::Absolute => z,
                        PositioningMode::Relative => self.z + z,
                    };
                }
            }
            LineKind::TemperatureSet | LineKind::Other => {}
        }
        HeightUpdate {
            increased: self.z > previous,
            z: self.z,
        }
    }
}

impl Default for HeightTracker {
    fn default() -> Self {
        Self::new()
    }
}
