//! Rover state and the movement half of the per-step agent update.
//!
//! Positions are in tile units: `pos` is the centre of the rover's box and a
//! tile `(x, y)` spans `[x, x + 1) × [y, y + 1)`.

use deepdig_core::{Facing, InputSnapshot, TilePos};
use deepdig_physics::{Aabb, EDGE_EPSILON};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{RoverConfig, SimConfig};
use crate::world::WorldState;

/// Rover box edge length in tiles.
pub const ROVER_SIZE: f32 = 0.8;

/// Capability levels read by the drilling and visibility systems.
///
/// Owned by the economy layer; the engine only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Upgrades {
    pub drill_power: u8,
    pub drill_speed: f32,
    pub light_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoItem {
    pub ore: String,
    pub value: u32,
}

/// Bounded ore hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    items: Vec<CargoItem>,
    capacity: usize,
}

impl Cargo {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn items(&self) -> &[CargoItem] {
        &self.items
    }

    /// Store an item; hands it back when the hold is full.
    pub fn try_add(&mut self, item: CargoItem) -> Result<(), CargoItem> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn total_value(&self) -> u64 {
        self.items.iter().map(|item| item.value as u64).sum()
    }

    /// Empty the hold, returning its contents (e.g. for selling).
    pub fn take_all(&mut self) -> Vec<CargoItem> {
        std::mem::take(&mut self.items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rover {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub facing: Facing,
    pub energy: f32,
    pub max_energy: f32,
    pub hull: f32,
    pub max_hull: f32,
    pub cargo: Cargo,
    pub upgrades: Upgrades,
    pub explosive_tips: u32,
    pub ladders: u32,
    pub grounded: bool,
    pub climbing: bool,
}

impl Rover {
    pub fn from_config(cfg: &RoverConfig) -> Self {
        Self {
            pos: cfg.home,
            velocity: Vec2::ZERO,
            facing: Facing::default(),
            energy: cfg.max_energy,
            max_energy: cfg.max_energy,
            hull: cfg.max_hull,
            max_hull: cfg.max_hull,
            cargo: Cargo::new(cfg.cargo_capacity),
            upgrades: Upgrades {
                drill_power: cfg.drill_power,
                drill_speed: cfg.drill_speed,
                light_radius: cfg.light_radius,
            },
            explosive_tips: cfg.explosive_tips,
            ladders: cfg.ladders,
            grounded: false,
            climbing: false,
        }
    }

    /// Tile containing the rover's centre.
    pub fn tile(&self) -> TilePos {
        TilePos::containing(self.pos.x, self.pos.y)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(ROVER_SIZE))
    }

    /// Apply hull damage; returns the remaining hull.
    pub fn damage(&mut self, amount: f32) -> f32 {
        self.hull = (self.hull - amount.max(0.0)).max(0.0);
        self.hull
    }

    /// Spend energy; returns `false` once the reserve is empty.
    pub fn drain_energy(&mut self, amount: f32) -> bool {
        self.energy = (self.energy - amount.max(0.0)).max(0.0);
        self.energy > 0.0
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull <= 0.0
    }

    /// Teleport home, lose the cargo and restore reserves.
    pub fn rescue(&mut self, home: Vec2) {
        self.pos = home;
        self.velocity = Vec2::ZERO;
        self.cargo.clear();
        self.energy = self.max_energy;
        self.hull = self.max_hull;
        self.grounded = false;
        self.climbing = false;
    }
}

/// What the motor did this step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorReport {
    /// Upward thrust was applied.
    pub thrusting: bool,
    /// The rover hit something while moving horizontally.
    pub blocked_x: bool,
}

/// Walk, gravity, thrust and climbing with axis-separated tile collision.
///
/// While `riding`, vertical motion belongs to the elevator: only horizontal
/// walking and the jump-off impulse (from `interact`) are applied.
pub fn step_motor(
    rover: &mut Rover,
    world: &WorldState,
    input: &InputSnapshot,
    cfg: &SimConfig,
    dt: f32,
    riding: bool,
) -> MotorReport {
    let mut report = MotorReport::default();

    if let Some(facing) = Facing::from_horizontal(input.horizontal) {
        rover.facing = facing;
    } else if let Some(facing) = Facing::from_vertical(input.vertical) {
        rover.facing = facing;
    }

    rover.velocity.x = input.horizontal as f32 * cfg.walk_speed;
    rover.climbing = !riding && overlaps_climbable(rover, world);

    if riding {
        rover.velocity.y = if input.interact {
            -cfg.jump_off_speed
        } else {
            0.0
        };
    } else if rover.climbing {
        rover.velocity.y = input.vertical as f32 * cfg.climb_speed;
    } else {
        rover.velocity.y += cfg.gravity * dt;
        if input.vertical < 0 && rover.energy > 0.0 {
            rover.velocity.y -= cfg.thrust_accel * dt;
            report.thrusting = true;
        }
        rover.velocity.y = rover
            .velocity
            .y
            .clamp(-cfg.max_rise_speed, cfg.max_fall_speed);
    }

    report.blocked_x = move_horizontal(rover, world, rover.velocity.x * dt);
    if rover.velocity.y != 0.0 {
        move_vertical(rover, world, rover.velocity.y * dt);
    } else if !riding {
        rover.grounded = rests_on_floor(rover, world);
    }
    report
}

fn overlaps_climbable(rover: &Rover, world: &WorldState) -> bool {
    let aabb = rover.aabb();
    aabb.tile_rows().any(|y| {
        aabb.tile_columns()
            .any(|x| world.kind_at(TilePos::new(x, y)).climbable)
    })
}

fn move_horizontal(rover: &mut Rover, world: &WorldState, dx: f32) -> bool {
    if dx == 0.0 {
        return false;
    }
    let half = ROVER_SIZE * 0.5;
    let old = rover.aabb();
    let new = old.translated(Vec2::new(dx, 0.0));
    let rows = old.tile_rows();

    let columns: Vec<i32> = if dx > 0.0 {
        let first = (old.max.x - EDGE_EPSILON).floor() as i32 + 1;
        let last = (new.max.x - EDGE_EPSILON).floor() as i32;
        (first..=last).collect()
    } else {
        let first = (old.min.x + EDGE_EPSILON).floor() as i32 - 1;
        let last = (new.min.x + EDGE_EPSILON).floor() as i32;
        (last..=first).rev().collect()
    };

    for column in columns {
        if rows
            .clone()
            .any(|y| world.is_solid_at(TilePos::new(column, y)))
        {
            rover.pos.x = if dx > 0.0 {
                column as f32 - half
            } else {
                column as f32 + 1.0 + half
            };
            rover.velocity.x = 0.0;
            return true;
        }
    }
    rover.pos.x += dx;
    false
}

fn move_vertical(rover: &mut Rover, world: &WorldState, dy: f32) {
    let half = ROVER_SIZE * 0.5;
    let old = rover.aabb();
    let new = old.translated(Vec2::new(0.0, dy));
    let columns = old.tile_columns();
    rover.grounded = false;

    if dy > 0.0 {
        let first = (old.max.y - EDGE_EPSILON).floor() as i32 + 1;
        let last = (new.max.y - EDGE_EPSILON).floor() as i32;
        for row in first..=last {
            // Rows entered by the bottom edge are approached from above, so
            // one-way platforms catch the rover here.
            let floor = columns.clone().any(|x| {
                let pos = TilePos::new(x, row);
                world.is_solid_at(pos) || world.kind_at(pos).one_way
            });
            if floor {
                rover.pos.y = row as f32 - half;
                rover.velocity.y = 0.0;
                rover.grounded = true;
                return;
            }
        }
    } else {
        let first = (old.min.y + EDGE_EPSILON).floor() as i32 - 1;
        let last = (new.min.y + EDGE_EPSILON).floor() as i32;
        for row in (last..=first).rev() {
            if columns
                .clone()
                .any(|x| world.is_solid_at(TilePos::new(x, row)))
            {
                rover.pos.y = row as f32 + 1.0 + half;
                rover.velocity.y = 0.0;
                return;
            }
        }
    }
    rover.pos.y += dy;
}

fn rests_on_floor(rover: &Rover, world: &WorldState) -> bool {
    let aabb = rover.aabb();
    let below = (aabb.max.y + EDGE_EPSILON).floor() as i32;
    if (below as f32 - aabb.max.y).abs() > EDGE_EPSILON * 2.0 {
        return false;
    }
    aabb.tile_columns().any(|x| {
        let pos = TilePos::new(x, below);
        world.is_solid_at(pos) || world.kind_at(pos).one_way
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::tile::{tiles, TileCatalog};
    use std::sync::Arc;

    fn setup() -> (WorldState, Rover, SimConfig) {
        let world = WorldState::new(&WorldConfig::with_seed(42), Arc::new(TileCatalog::standard()));
        let rover = Rover::from_config(&RoverConfig::default());
        (world, rover, SimConfig::default())
    }

    fn settle(rover: &mut Rover, world: &WorldState, cfg: &SimConfig) {
        for _ in 0..120 {
            step_motor(rover, world, &InputSnapshot::default(), cfg, cfg.dt, false);
        }
    }

    #[test]
    fn rover_lands_on_surface_row() {
        let (world, mut rover, cfg) = setup();
        settle(&mut rover, &world, &cfg);
        assert!(rover.grounded);
        assert!((rover.pos.y - 9.6).abs() < 1e-4, "y = {}", rover.pos.y);
        assert_eq!(rover.tile(), TilePos::new(22, 9));
    }

    #[test]
    fn rover_falls_through_cleared_tile() {
        let (mut world, mut rover, cfg) = setup();
        world.set_kind_at(TilePos::new(22, 10), tiles::AIR);
        world.set_kind_at(TilePos::new(22, 11), tiles::DIRT);
        settle(&mut rover, &world, &cfg);
        assert_eq!(rover.tile(), TilePos::new(22, 10));
        assert!(rover.grounded);
    }

    #[test]
    fn walls_stop_horizontal_motion() {
        let (mut world, mut rover, cfg) = setup();
        world.set_kind_at(TilePos::new(24, 9), tiles::ROCK);
        settle(&mut rover, &world, &cfg);
        let right = InputSnapshot {
            horizontal: 1,
            ..InputSnapshot::default()
        };
        for _ in 0..60 {
            step_motor(&mut rover, &world, &right, &cfg, cfg.dt, false);
        }
        assert!((rover.pos.x - 23.6).abs() < 1e-4, "x = {}", rover.pos.x);
        assert_eq!(rover.facing, Facing::Right);
    }

    #[test]
    fn world_edge_is_a_wall() {
        let (world, mut rover, cfg) = setup();
        rover.pos = Vec2::new(0.6, 9.6);
        let left = InputSnapshot {
            horizontal: -1,
            ..InputSnapshot::default()
        };
        for _ in 0..30 {
            step_motor(&mut rover, &world, &left, &cfg, cfg.dt, false);
        }
        assert!((rover.pos.x - 0.4).abs() < 1e-4);
    }

    #[test]
    fn thrust_lifts_rover() {
        let (world, mut rover, cfg) = setup();
        settle(&mut rover, &world, &cfg);
        let up = InputSnapshot {
            vertical: -1,
            ..InputSnapshot::default()
        };
        let start = rover.pos.y;
        let mut thrusted = false;
        for _ in 0..30 {
            thrusted |= step_motor(&mut rover, &world, &up, &cfg, cfg.dt, false).thrusting;
        }
        assert!(thrusted);
        assert!(rover.pos.y < start - 0.5);
    }

    #[test]
    fn ladders_hold_rover_in_place() {
        let (mut world, mut rover, cfg) = setup();
        for y in 10..15 {
            world.set_kind_at(TilePos::new(22, y), tiles::LADDER);
        }
        world.set_kind_at(TilePos::new(22, 15), tiles::DIRT);
        rover.pos = Vec2::new(22.5, 12.5);
        for _ in 0..30 {
            step_motor(&mut rover, &world, &InputSnapshot::default(), &cfg, cfg.dt, false);
        }
        assert!(rover.climbing);
        assert!((rover.pos.y - 12.5).abs() < 1e-4);

        let down = InputSnapshot {
            vertical: 1,
            ..InputSnapshot::default()
        };
        for _ in 0..120 {
            step_motor(&mut rover, &world, &down, &cfg, cfg.dt, false);
        }
        assert_eq!(rover.tile(), TilePos::new(22, 14));
    }

    #[test]
    fn platforms_are_one_way() {
        let (mut world, mut rover, cfg) = setup();
        for y in 10..20 {
            world.set_kind_at(TilePos::new(22, y), tiles::AIR);
        }
        world.set_kind_at(TilePos::new(22, 15), tiles::PLATFORM);
        settle(&mut rover, &world, &cfg);
        assert_eq!(rover.tile(), TilePos::new(22, 14));

        // From below, thrusting passes through the platform.
        rover.pos = Vec2::new(22.5, 17.5);
        rover.velocity = Vec2::ZERO;
        let up = InputSnapshot {
            vertical: -1,
            ..InputSnapshot::default()
        };
        for _ in 0..40 {
            step_motor(&mut rover, &world, &up, &cfg, cfg.dt, false);
        }
        assert!(rover.pos.y < 15.0, "y = {}", rover.pos.y);
    }

    #[test]
    fn riding_suspends_gravity() {
        let (mut world, mut rover, cfg) = setup();
        world.set_kind_at(TilePos::new(22, 10), tiles::AIR);
        rover.pos = Vec2::new(22.5, 12.5);
        step_motor(&mut rover, &world, &InputSnapshot::default(), &cfg, cfg.dt, true);
        assert_eq!(rover.pos.y, 12.5);

        let jump = InputSnapshot {
            interact: true,
            ..InputSnapshot::default()
        };
        step_motor(&mut rover, &world, &jump, &cfg, cfg.dt, true);
        assert!(rover.velocity.y <= -cfg.jump_off_speed);
    }

    #[test]
    fn cargo_rejects_when_full() {
        let mut cargo = Cargo::new(1);
        let coal = CargoItem {
            ore: "coal".into(),
            value: 5,
        };
        assert!(cargo.try_add(coal.clone()).is_ok());
        assert!(cargo.is_full());
        assert_eq!(cargo.try_add(coal.clone()), Err(coal));
        assert_eq!(cargo.total_value(), 5);
        assert_eq!(cargo.take_all().len(), 1);
        assert!(cargo.is_empty());
    }

    #[test]
    fn rescue_restores_reserves() {
        let (_, mut rover, _) = setup();
        rover.energy = 0.0;
        rover.damage(40.0);
        rover.cargo.try_add(CargoItem { ore: "iron".into(), value: 25 }).unwrap();
        rover.pos = Vec2::new(50.5, 200.5);
        rover.rescue(Vec2::new(22.5, 9.5));
        assert_eq!(rover.energy, rover.max_energy);
        assert_eq!(rover.hull, rover.max_hull);
        assert!(rover.cargo.is_empty());
        assert_eq!(rover.tile(), TilePos::new(22, 9));
    }
}
