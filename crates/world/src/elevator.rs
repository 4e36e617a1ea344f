//! Elevator shafts: a car constrained to a vertical rail of placed tiles.
//!
//! Shafts that overlap in one column merge into a single elevator; shafts that
//! merely touch end-to-end stay separate and chain, handing the rider over in
//! the same step.

use std::collections::BTreeMap;

use deepdig_core::{InputSnapshot, TilePos};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::WorldEvent;
use crate::rover::Rover;
use crate::tile::{ElevatorPart, TileId};
use crate::world::WorldState;

/// Reasons a placement request is rejected. Nothing is written on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("tile {0} is outside the world")]
    OutOfBounds(TilePos),
    #[error("tile {0} is blocked by solid terrain")]
    Obstructed(TilePos),
    #[error("elevator shafts need at least two tiles, got {0}")]
    TooShort(i32),
    #[error("tile kind {0} cannot be placed")]
    NotPlaceable(TileId),
    #[error("the tile catalog has no elevator {0:?} piece")]
    MissingPiece(ElevatorPart),
    #[error("no placeable items left")]
    OutOfStock,
}

/// Placement data persisted by the save collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevatorRecord {
    pub top_x: i32,
    pub top_y: i32,
    pub length: i32,
    pub car_position: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Elevator {
    pub id: u32,
    pub x: i32,
    pub top_y: i32,
    pub length: i32,
    /// Car row, continuous, always within `[top_y, bottom_y]`.
    pub car_y: f32,
}

impl Elevator {
    pub fn bottom_y(&self) -> i32 {
        self.top_y + self.length - 1
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x == self.x && pos.y >= self.top_y && pos.y <= self.bottom_y()
    }

    fn overlaps(&self, x: i32, top: i32, bottom: i32) -> bool {
        self.x == x && top <= self.bottom_y() && bottom >= self.top_y
    }

    pub fn clamp_car(&self, y: f32) -> f32 {
        y.clamp(self.top_y as f32, self.bottom_y() as f32)
    }

    pub fn record(&self) -> ElevatorRecord {
        ElevatorRecord {
            top_x: self.x,
            top_y: self.top_y,
            length: self.length,
            car_position: self.car_y,
        }
    }
}

pub struct ElevatorSystem {
    elevators: BTreeMap<u32, Elevator>,
    next_id: u32,
    rider: Option<u32>,
    car_speed: f32,
    entry_tolerance: f32,
    jump_off_speed: f32,
}

impl ElevatorSystem {
    pub fn new(car_speed: f32, entry_tolerance: f32, jump_off_speed: f32) -> Self {
        Self {
            elevators: BTreeMap::new(),
            next_id: 1,
            rider: None,
            car_speed,
            entry_tolerance,
            jump_off_speed,
        }
    }

    pub fn get(&self, id: u32) -> Option<&Elevator> {
        self.elevators.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Elevator> + '_ {
        self.elevators.values()
    }

    pub fn len(&self) -> usize {
        self.elevators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elevators.is_empty()
    }

    /// Elevator currently carrying the rover.
    pub fn rider(&self) -> Option<u32> {
        self.rider
    }

    pub fn is_riding(&self) -> bool {
        self.rider.is_some()
    }

    /// Drop the rider claim without an event (rescue, restore).
    pub fn release_rider(&mut self) {
        self.rider = None;
    }

    /// Car positions `(x, car_y)` for sprite placement.
    pub fn car_positions(&self) -> impl Iterator<Item = (i32, f32)> + '_ {
        self.elevators.values().map(|e| (e.x, e.car_y))
    }

    /// Place a shaft of `length` tiles hanging from `top`.
    ///
    /// A shaft overlapping existing shafts in the same column is merged into
    /// the lowest-id one. Returns the id of the elevator that owns the span.
    pub fn place(
        &mut self,
        world: &mut WorldState,
        top: TilePos,
        length: i32,
    ) -> Result<u32, PlacementError> {
        if length < 2 {
            return Err(PlacementError::TooShort(length));
        }
        let bottom = top.y + length - 1;
        if let Some(pos) = (top.y..=bottom)
            .map(|y| TilePos::new(top.x, y))
            .find(|&pos| !world.in_bounds(pos))
        {
            return Err(PlacementError::OutOfBounds(pos));
        }
        for y in top.y..=bottom {
            let pos = TilePos::new(top.x, y);
            let kind = world.kind_at(pos);
            if kind.solid && !kind.placed && kind.elevator_part.is_none() {
                return Err(PlacementError::Obstructed(pos));
            }
        }
        let pieces = Self::pieces(world)?;

        let overlapping: Vec<u32> = self
            .elevators
            .values()
            .filter(|e| e.overlaps(top.x, top.y, bottom))
            .map(|e| e.id)
            .collect();

        let (id, span_top, span_bottom, car_y) = match overlapping.first() {
            None => {
                let id = self.next_id;
                self.next_id += 1;
                (id, top.y, bottom, top.y as f32)
            }
            Some(&keep) => {
                let mut span_top = top.y;
                let mut span_bottom = bottom;
                let mut car_y = top.y as f32;
                for id in &overlapping {
                    if let Some(old) = self.elevators.get(id) {
                        span_top = span_top.min(old.top_y);
                        span_bottom = span_bottom.max(old.bottom_y());
                        if *id == keep {
                            car_y = old.car_y;
                        }
                    }
                }
                for id in overlapping.iter().skip(1) {
                    self.elevators.remove(id);
                    if self.rider == Some(*id) {
                        self.rider = Some(keep);
                    }
                }
                debug!(elevator = keep, merged = overlapping.len(), "Merged elevator shafts");
                (keep, span_top, span_bottom, car_y)
            }
        };

        let elevator = Elevator {
            id,
            x: top.x,
            top_y: span_top,
            length: span_bottom - span_top + 1,
            car_y: 0.0,
        };
        let elevator = Elevator {
            car_y: elevator.clamp_car(car_y),
            ..elevator
        };

        let [top_tile, rope_tile, bottom_tile] = pieces;
        for y in span_top..=span_bottom {
            let tile = if y == span_top {
                top_tile
            } else if y == span_bottom {
                bottom_tile
            } else {
                rope_tile
            };
            world.set_kind_at(TilePos::new(top.x, y), tile);
        }
        self.elevators.insert(id, elevator);
        Ok(id)
    }

    fn pieces(world: &WorldState) -> Result<[TileId; 3], PlacementError> {
        let catalog = world.catalog();
        let piece = |part| {
            catalog
                .elevator_tile(part)
                .ok_or(PlacementError::MissingPiece(part))
        };
        Ok([
            piece(ElevatorPart::Top)?,
            piece(ElevatorPart::Rope)?,
            piece(ElevatorPart::Bottom)?,
        ])
    }

    /// Elevator in the same column whose near end touches `from`'s end in
    /// direction `dir` (-1 up, 1 down).
    fn chain_target(&self, from: &Elevator, dir: i32) -> Option<u32> {
        self.elevators
            .values()
            .find(|e| {
                e.id != from.id
                    && e.x == from.x
                    && if dir < 0 {
                        e.bottom_y() == from.top_y - 1
                    } else {
                        e.top_y == from.bottom_y() + 1
                    }
            })
            .map(|e| e.id)
    }

    /// Board, drive, chain or leave. Runs after the rover motor.
    pub fn update(
        &mut self,
        rover: &mut Rover,
        input: &InputSnapshot,
        dt: f32,
        events: &mut Vec<WorldEvent>,
    ) {
        match self.rider {
            Some(id) => self.ride(id, rover, input, dt, events),
            None => self.try_board(rover, events),
        }
    }

    fn try_board(&mut self, rover: &mut Rover, events: &mut Vec<WorldEvent>) {
        if rover.velocity.y < 0.0 {
            return;
        }
        let column = rover.tile().x;
        let tolerance = self.entry_tolerance;
        let Some(elevator) = self.elevators.values_mut().find(|e| {
            e.x == column
                && rover.pos.y >= e.top_y as f32 - tolerance
                && rover.pos.y <= e.bottom_y() as f32 + 1.0
        }) else {
            return;
        };

        elevator.car_y = elevator.clamp_car(rover.pos.y - 0.5);
        rover.pos.y = elevator.car_y + 0.5;
        rover.velocity.y = 0.0;
        self.rider = Some(elevator.id);
        debug!(elevator = elevator.id, car = elevator.car_y, "Boarded elevator");
        events.push(WorldEvent::ElevatorBoarded {
            elevator: elevator.id,
        });
    }

    fn ride(
        &mut self,
        id: u32,
        rover: &mut Rover,
        input: &InputSnapshot,
        dt: f32,
        events: &mut Vec<WorldEvent>,
    ) {
        let Some(current) = self.elevators.get(&id).cloned() else {
            warn!(elevator = id, "Rider referenced a missing elevator");
            self.rider = None;
            return;
        };

        if rover.tile().x != current.x || rover.velocity.y <= -self.jump_off_speed {
            self.rider = None;
            debug!(elevator = id, "Left elevator");
            events.push(WorldEvent::ElevatorLeft { elevator: id });
            return;
        }

        let dir = input.vertical.signum() as i32;
        let wanted = current.car_y + dir as f32 * self.car_speed * dt;
        let car_y = current.clamp_car(wanted);
        let mut carrier = id;
        let mut rover_car = car_y;

        if dir != 0 && car_y != wanted {
            if let Some(next_id) = self.chain_target(&current, dir) {
                if let Some(next) = self.elevators.get_mut(&next_id) {
                    next.car_y = if dir < 0 {
                        next.bottom_y() as f32
                    } else {
                        next.top_y as f32
                    };
                    rover_car = next.car_y;
                }
                carrier = next_id;
                debug!(from = id, to = next_id, "Chained elevator");
                events.push(WorldEvent::ElevatorChained {
                    from: id,
                    to: next_id,
                });
            }
        }

        if let Some(elevator) = self.elevators.get_mut(&id) {
            elevator.car_y = car_y;
        }
        self.rider = Some(carrier);
        rover.pos.y = rover_car + 0.5;
        rover.velocity.y = 0.0;
        rover.grounded = true;
    }

    /// Records for every elevator, in id order.
    pub fn export_records(&self) -> Vec<ElevatorRecord> {
        self.elevators.values().map(Elevator::record).collect()
    }

    /// Rebuild elevators from saved records; invalid records are skipped.
    pub fn import_records(&mut self, world: &mut WorldState, records: &[ElevatorRecord]) {
        for record in records {
            let top = TilePos::new(record.top_x, record.top_y);
            match self.place(world, top, record.length) {
                Ok(id) => {
                    if let Some(elevator) = self.elevators.get_mut(&id) {
                        elevator.car_y = elevator.clamp_car(record.car_position);
                    }
                }
                Err(err) => warn!(%top, "Skipping elevator record: {err}"),
            }
        }
    }

    pub fn clear(&mut self) {
        self.elevators.clear();
        self.rider = None;
        self.next_id = 1;
    }
}
