//! Normalized per-step input snapshot.
//!
//! Key bindings, touch controls and scripted playback all reduce to this one
//! shape before reaching the simulation.

use serde::{Deserialize, Serialize};

/// Input state for a single simulation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    /// Horizontal axis: -1 left, 0 none, 1 right.
    pub horizontal: i8,
    /// Vertical axis: -1 up, 0 none, 1 down.
    pub vertical: i8,
    /// Drill button held.
    pub drill: bool,
    /// Interact pressed this step.
    pub interact: bool,
}

impl InputSnapshot {
    /// Snapshot with every axis and button clamped into its legal range.
    pub fn normalized(self) -> Self {
        Self {
            horizontal: self.horizontal.signum(),
            vertical: self.vertical.signum(),
            ..self
        }
    }

    /// Hold the drill in a direction.
    pub fn drilling(horizontal: i8, vertical: i8) -> Self {
        Self {
            horizontal,
            vertical,
            drill: true,
            interact: false,
        }
    }
}
