//! Tunable world, simulation and rover parameters.
//!
//! All three structs deserialize with `#[serde(default)]`, so a partial TOML or
//! JSON table only overrides the fields it names.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World extent, seed and zoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    /// Columns `[0, width)`.
    pub width: i32,
    /// Rows `[0, depth)`; the last row is bedrock.
    pub depth: i32,
    /// Row of the ground line; everything above is open sky.
    pub surface_height: i32,
    /// Town strip on the surface row is `[0, town_end)`.
    pub town_end: i32,
    /// Mining entrance strip is `[town_end, entrance_end)`.
    pub entrance_end: i32,
    /// Rows of reinforced rock directly beneath the town.
    pub protected_depth: i32,
    /// Chunks kept active around the rover, in chunk units.
    pub chunk_view_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 100,
            depth: 500,
            surface_height: 10,
            town_end: 20,
            entrance_end: 40,
            protected_depth: 3,
            chunk_view_radius: 2,
        }
    }
}

impl WorldConfig {
    /// Default layout with a specific seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

/// Fixed-step timing and per-system constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds per tick.
    pub dt: f32,
    /// Seconds a boulder stays unsupported before it starts to fall.
    pub fall_delay: f32,
    /// Boulder fall speed in tiles per second.
    pub fall_speed: f32,
    /// Elevator car speed in tiles per second.
    pub car_speed: f32,
    /// How far above a shaft top a falling rover is still caught by the car.
    pub entry_tolerance: f32,
    /// Upward velocity that counts as jumping off a car.
    pub jump_off_speed: f32,
    /// Ticks between links of an explosion chain.
    pub chain_delay_ticks: u64,
    pub drill_energy_per_second: f32,
    pub thrust_energy_per_second: f32,
    /// Drain applied while the rover is below the surface zone.
    pub idle_energy_per_second: f32,
    pub walk_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Upward acceleration while thrusting; must exceed `gravity` to climb.
    pub thrust_accel: f32,
    pub max_rise_speed: f32,
    pub climb_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            fall_delay: 2.0,
            fall_speed: 6.0,
            car_speed: 4.0,
            entry_tolerance: 0.6,
            jump_off_speed: 6.0,
            chain_delay_ticks: 6,
            drill_energy_per_second: 1.0,
            thrust_energy_per_second: 2.0,
            idle_energy_per_second: 0.05,
            walk_speed: 5.0,
            gravity: 30.0,
            max_fall_speed: 15.0,
            thrust_accel: 45.0,
            max_rise_speed: 6.0,
            climb_speed: 4.0,
        }
    }
}

/// Rover starting state and capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    /// Spawn and rescue position (tile units, centre of the rover).
    pub home: Vec2,
    pub max_energy: f32,
    pub max_hull: f32,
    pub cargo_capacity: usize,
    pub drill_power: u8,
    pub drill_speed: f32,
    pub light_radius: f32,
    pub explosive_tips: u32,
    pub ladders: u32,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            home: Vec2::new(22.5, 9.5),
            max_energy: 100.0,
            max_hull: 100.0,
            cargo_capacity: 10,
            drill_power: 1,
            drill_speed: 1.0,
            light_radius: 4.0,
            explosive_tips: 0,
            ladders: 10,
        }
    }
}
