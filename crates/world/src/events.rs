//! Point-in-time notifications emitted by the simulation.
//!
//! The caller drains these once per step; nothing in the engine reacts to them.

use deepdig_core::TilePos;
use glam::Vec2;
use serde::Serialize;

use crate::tile::TileId;

/// User-facing refusal or warning raised for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// Tile is harder than the current drill.
    UpgradeNeeded { pos: TilePos, hardness: u8, drill_power: u8 },
    /// Boulder drilling needs a consumable explosive tip.
    NeedExplosiveTip { pos: TilePos },
    /// Placement was rejected.
    CannotPlace { pos: TilePos },
    /// Ore was destroyed because the cargo hold is full.
    CargoFull,
}

/// Why the rover was hauled back home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueReason {
    EnergyDepleted,
    HullDestroyed,
    Crushed,
}

/// Notable state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    TileDrilled { pos: TilePos, kind: TileId },
    OreCollected { ore: String, value: u32 },
    OreLost { ore: String, value: u32 },
    DrillCancelled { pos: TilePos },
    Explosion { center: TilePos, radius: f32, cleared: usize },
    Damage { amount: f32, hull: f32 },
    BoulderUnstable { pos: TilePos },
    BoulderFalling { pos: TilePos },
    BoulderLanded { pos: TilePos },
    BoulderImpact { pos: TilePos },
    ElevatorBoarded { elevator: u32 },
    ElevatorChained { from: u32, to: u32 },
    ElevatorLeft { elevator: u32 },
    TilePlaced { pos: TilePos, kind: TileId },
    Signal(Signal),
    Rescued { reason: RescueReason, home: Vec2 },
}

impl WorldEvent {
    /// Short label used for event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::TileDrilled { .. } => "tile_drilled",
            WorldEvent::OreCollected { .. } => "ore_collected",
            WorldEvent::OreLost { .. } => "ore_lost",
            WorldEvent::DrillCancelled { .. } => "drill_cancelled",
            WorldEvent::Explosion { .. } => "explosion",
            WorldEvent::Damage { .. } => "damage",
            WorldEvent::BoulderUnstable { .. } => "boulder_unstable",
            WorldEvent::BoulderFalling { .. } => "boulder_falling",
            WorldEvent::BoulderLanded { .. } => "boulder_landed",
            WorldEvent::BoulderImpact { .. } => "boulder_impact",
            WorldEvent::ElevatorBoarded { .. } => "elevator_boarded",
            WorldEvent::ElevatorChained { .. } => "elevator_chained",
            WorldEvent::ElevatorLeft { .. } => "elevator_left",
            WorldEvent::TilePlaced { .. } => "tile_placed",
            WorldEvent::Signal(_) => "signal",
            WorldEvent::Rescued { .. } => "rescued",
        }
    }
}

impl From<Signal> for WorldEvent {
    fn from(signal: Signal) -> Self {
        WorldEvent::Signal(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tags() {
        let event = WorldEvent::TileDrilled {
            pos: TilePos::new(22, 10),
            kind: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "tile_drilled");
        assert_eq!(json["pos"]["x"], 22);
        assert_eq!(event.kind(), "tile_drilled");
    }

    #[test]
    fn signals_wrap_into_events() {
        let event: WorldEvent = Signal::CargoFull.into();
        assert_eq!(event.kind(), "signal");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "signal");
    }
}
