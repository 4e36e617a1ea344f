//! Plain-data snapshot handed to the save collaborator.
//!
//! The snapshot carries exactly what a world needs beyond its seed: the
//! override list, the explored set and elevator placements. Versioning and
//! storage belong to the caller.

use deepdig_core::{SimTick, TilePos};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elevator::ElevatorRecord;
use crate::world::TileOverride;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot was taken from seed {found}, world uses seed {expected}")]
    SeedMismatch { expected: u64, found: u64 },
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub seed: u64,
    pub tick: SimTick,
    pub overrides: Vec<TileOverride>,
    pub explored: Vec<TilePos>,
    pub elevators: Vec<ElevatorRecord>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Reject snapshots from a different world.
    pub fn check_seed(&self, expected: u64) -> Result<(), SnapshotError> {
        if self.seed != expected {
            return Err(SnapshotError::SeedMismatch {
                expected,
                found: self.seed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorldSnapshot {
        WorldSnapshot {
            seed: 42,
            tick: SimTick(120),
            overrides: vec![TileOverride { x: 22, y: 10, kind: 0 }],
            explored: vec![TilePos::new(22, 10)],
            elevators: vec![ElevatorRecord {
                top_x: 30,
                top_y: 12,
                length: 4,
                car_position: 13.5,
            }],
        }
    }

    #[test]
    fn json_round_trip() {
        let snapshot = sample();
        let json = snapshot.to_json().unwrap();
        assert_eq!(WorldSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn seed_mismatch_is_rejected() {
        let snapshot = sample();
        assert!(snapshot.check_seed(42).is_ok());
        assert!(matches!(
            snapshot.check_seed(7),
            Err(SnapshotError::SeedMismatch { expected: 7, found: 42 })
        ));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            WorldSnapshot::from_json("{not json"),
            Err(SnapshotError::Json(_))
        ));
    }
}
