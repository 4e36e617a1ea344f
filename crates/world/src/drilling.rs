//! Drilling state machine.
//!
//! Sustained directional input plus world queries turn into tile destruction
//! and ore yield. Progress belongs to a single target: switching targets,
//! releasing the drill or running out of energy discards it.

use deepdig_core::{InputSnapshot, TilePos};
use tracing::debug;

use crate::events::{Signal, WorldEvent};
use crate::rover::{CargoItem, Rover};
use crate::tile::{TileKind, TILE_AIR};
use crate::world::WorldState;

/// Progress at or above `1.0 - PROGRESS_EPSILON` completes a tile.
pub const PROGRESS_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrillState {
    Idle,
    Targeting { target: TilePos, progress: f32 },
    /// A tile was cleared on the last step.
    Complete { target: TilePos },
}

/// Tile cleared by a finished drill.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillCompletion {
    pub pos: TilePos,
    pub kind: TileKind,
    pub used_explosive_tip: bool,
}

/// Result of one drilling step.
#[derive(Debug, Clone, PartialEq)]
pub enum DrillUpdate {
    Idle,
    Refused { target: TilePos },
    Progress { target: TilePos, progress: f32 },
    Cancelled { target: TilePos },
    Completed(DrillCompletion),
}

/// Why a target cannot be drilled right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    NotDrillable,
    NeedExplosiveTip,
    UpgradeNeeded { hardness: u8 },
}

#[derive(Debug, Clone)]
pub struct DrillingEngine {
    state: DrillState,
    last_refusal: Option<TilePos>,
}

impl Default for DrillingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillingEngine {
    pub fn new() -> Self {
        Self {
            state: DrillState::Idle,
            last_refusal: None,
        }
    }

    pub fn state(&self) -> DrillState {
        self.state
    }

    /// Current target and progress fraction, for progress overlays.
    pub fn progress(&self) -> Option<(TilePos, f32)> {
        match self.state {
            DrillState::Targeting { target, progress } => Some((target, progress)),
            _ => None,
        }
    }

    /// Drop any in-flight progress.
    pub fn cancel(&mut self) {
        self.state = DrillState::Idle;
        self.last_refusal = None;
    }

    /// Resolve the tile the rover is aiming at.
    ///
    /// Vertical input alone wins, then horizontal input, then the last facing.
    /// Horizontal targets require the rover to be past the middle of its own
    /// tile in the direction of travel.
    pub fn resolve_target(rover: &Rover, input: &InputSnapshot) -> Option<TilePos> {
        let tile = rover.tile();
        let (dx, dy) = if input.vertical != 0 && input.horizontal == 0 {
            (0, input.vertical.signum() as i32)
        } else if input.horizontal != 0 {
            (input.horizontal.signum() as i32, 0)
        } else {
            rover.facing.offset()
        };

        if dx != 0 {
            let frac = rover.pos.x - rover.pos.x.floor();
            if (dx > 0 && frac < 0.5) || (dx < 0 && frac > 0.5) {
                return None;
            }
        }
        Some(tile.offset(dx, dy))
    }

    /// Advance drilling by `dt` seconds.
    pub fn update(
        &mut self,
        world: &mut WorldState,
        rover: &mut Rover,
        input: &InputSnapshot,
        dt: f32,
        energy_per_second: f32,
        events: &mut Vec<WorldEvent>,
    ) -> DrillUpdate {
        if !input.drill {
            if let DrillState::Targeting { target, .. } = self.state {
                events.push(WorldEvent::DrillCancelled { pos: target });
                self.cancel();
                return DrillUpdate::Cancelled { target };
            }
            self.cancel();
            return DrillUpdate::Idle;
        }

        let Some(target) = Self::resolve_target(rover, input) else {
            self.state = DrillState::Idle;
            return DrillUpdate::Idle;
        };

        let kind = world.kind_at(target).clone();
        let needs_tip = world.catalog().needs_explosive_tip(kind.id);

        if let Some(refusal) = Self::check(&kind, needs_tip, rover) {
            self.state = DrillState::Idle;
            if refusal == Refusal::NotDrillable {
                self.last_refusal = None;
                return DrillUpdate::Idle;
            }
            if self.last_refusal != Some(target) {
                self.last_refusal = Some(target);
                let signal = match refusal {
                    Refusal::NeedExplosiveTip => Signal::NeedExplosiveTip { pos: target },
                    Refusal::UpgradeNeeded { hardness } => Signal::UpgradeNeeded {
                        pos: target,
                        hardness,
                        drill_power: rover.upgrades.drill_power,
                    },
                    Refusal::NotDrillable => return DrillUpdate::Idle,
                };
                events.push(signal.into());
            }
            return DrillUpdate::Refused { target };
        }
        self.last_refusal = None;

        let mut progress = match self.state {
            DrillState::Targeting {
                target: current,
                progress,
            } if current == target => progress,
            _ => 0.0,
        };

        if !rover.drain_energy(energy_per_second * dt) {
            debug!(%target, "Drill stalled: energy depleted");
            events.push(WorldEvent::DrillCancelled { pos: target });
            self.state = DrillState::Idle;
            return DrillUpdate::Cancelled { target };
        }

        let seconds = kind.drill_time / rover.upgrades.drill_speed.max(f32::EPSILON);
        progress += dt / seconds;

        if progress < 1.0 - PROGRESS_EPSILON {
            self.state = DrillState::Targeting { target, progress };
            return DrillUpdate::Progress { target, progress };
        }

        let completion = self.complete(world, rover, target, kind, needs_tip, events);
        DrillUpdate::Completed(completion)
    }

    fn check(kind: &TileKind, needs_tip: bool, rover: &Rover) -> Option<Refusal> {
        if !kind.is_drillable() {
            return Some(Refusal::NotDrillable);
        }
        if needs_tip {
            return (rover.explosive_tips == 0).then_some(Refusal::NeedExplosiveTip);
        }
        (kind.hardness > rover.upgrades.drill_power).then_some(Refusal::UpgradeNeeded {
            hardness: kind.hardness,
        })
    }

    fn complete(
        &mut self,
        world: &mut WorldState,
        rover: &mut Rover,
        target: TilePos,
        kind: TileKind,
        needs_tip: bool,
        events: &mut Vec<WorldEvent>,
    ) -> DrillCompletion {
        if let Some(ore) = &kind.ore {
            let item = CargoItem {
                ore: ore.clone(),
                value: kind.value,
            };
            match rover.cargo.try_add(item) {
                Ok(()) => events.push(WorldEvent::OreCollected {
                    ore: ore.clone(),
                    value: kind.value,
                }),
                Err(lost) => {
                    events.push(WorldEvent::OreLost {
                        ore: lost.ore,
                        value: lost.value,
                    });
                    events.push(Signal::CargoFull.into());
                }
            }
        }

        if needs_tip {
            rover.explosive_tips = rover.explosive_tips.saturating_sub(1);
        }

        world.set_kind_at(target, TILE_AIR);
        events.push(WorldEvent::TileDrilled {
            pos: target,
            kind: kind.id,
        });
        debug!(%target, tile = %kind.name, "Tile drilled");

        self.state = DrillState::Complete { target };
        DrillCompletion {
            pos: target,
            kind,
            used_explosive_tip: needs_tip,
        }
    }
}
