#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod input;
pub mod pos;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use input::InputSnapshot;
pub use pos::{Facing, TilePos};

/// Fixed tick type (one tick per simulation step).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}
