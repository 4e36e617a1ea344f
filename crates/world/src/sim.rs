//! Fixed-order step driver.
//!
//! One call to [`Simulation::step`] runs: scheduled actions, visibility, rover
//! motor, drilling, boulders, elevators, chunk streaming, then rescue checks.
//! Every terrain write goes through [`WorldState`], so a later stage always
//! reads what an earlier stage wrote in the same step.

use std::sync::Arc;

use deepdig_core::{InputSnapshot, SimTick, TilePos};
use glam::Vec2;
use tracing::{debug, instrument, warn};

use crate::blast::{detonate, distance_to, falloff_damage};
use crate::boulder::BoulderSimulator;
use crate::chunk::{DirtyFlags, TileRect};
use crate::config::{RoverConfig, SimConfig, WorldConfig};
use crate::drilling::{DrillUpdate, DrillingEngine};
use crate::elevator::{ElevatorSystem, PlacementError};
use crate::events::{RescueReason, Signal, WorldEvent};
use crate::persist::{SnapshotError, WorldSnapshot};
use crate::rover::{step_motor, Rover};
use crate::scheduler::{ScheduledAction, Scheduler};
use crate::storage::{ChunkManager, DEFAULT_PARKED_CAPACITY};
use crate::tile::{tiles, Hazard, TileCatalog, TileId, TileKind, TILE_AIR};
use crate::visibility::{Visibility, VisibilityEngine};
use crate::world::WorldState;

/// Per-tile answer for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub kind: TileId,
    pub visibility: Visibility,
}

pub struct Simulation {
    sim_config: SimConfig,
    rover_config: RoverConfig,
    world: WorldState,
    chunks: ChunkManager,
    drilling: DrillingEngine,
    boulders: BoulderSimulator,
    elevators: ElevatorSystem,
    visibility: VisibilityEngine,
    scheduler: Scheduler,
    rover: Rover,
    tick: SimTick,
    elapsed: f64,
    events: Vec<WorldEvent>,
}

impl Simulation {
    /// Simulation over the standard tile catalog.
    pub fn new(world: &WorldConfig, sim: &SimConfig, rover: &RoverConfig) -> Self {
        Self::with_catalog(world, sim, rover, Arc::new(TileCatalog::standard()))
    }

    #[instrument(skip_all, fields(seed = world_config.seed))]
    pub fn with_catalog(
        world_config: &WorldConfig,
        sim: &SimConfig,
        rover: &RoverConfig,
        catalog: Arc<TileCatalog>,
    ) -> Self {
        let mut world = WorldState::new(world_config, catalog);
        let rover_state = Rover::from_config(rover);
        let mut chunks = ChunkManager::new(world_config.chunk_view_radius, DEFAULT_PARKED_CAPACITY);
        chunks.refresh(&mut world, rover_state.tile());

        debug!(home = ?rover.home, "Simulation ready");
        Self {
            sim_config: sim.clone(),
            rover_config: rover.clone(),
            chunks,
            drilling: DrillingEngine::new(),
            boulders: BoulderSimulator::new(sim.fall_delay, sim.fall_speed),
            elevators: ElevatorSystem::new(sim.car_speed, sim.entry_tolerance, sim.jump_off_speed),
            visibility: VisibilityEngine::new(world_config, rover.light_radius),
            scheduler: Scheduler::new(),
            rover: rover_state,
            tick: SimTick::ZERO,
            elapsed: 0.0,
            events: Vec::new(),
            world,
        }
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    /// Simulated seconds since start.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn sim_config(&self) -> &SimConfig {
        &self.sim_config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Direct terrain access for tooling and tests. Writes are picked up by
    /// the caches on the next step.
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn rover(&self) -> &Rover {
        &self.rover
    }

    /// The economy layer mutates upgrades, consumables and cargo here.
    pub fn rover_mut(&mut self) -> &mut Rover {
        &mut self.rover
    }

    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkManager {
        &mut self.chunks
    }

    pub fn drilling(&self) -> &DrillingEngine {
        &self.drilling
    }

    pub fn boulders(&self) -> &BoulderSimulator {
        &self.boulders
    }

    pub fn elevators(&self) -> &ElevatorSystem {
        &self.elevators
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Step with the configured fixed `dt`.
    pub fn step(&mut self, input: InputSnapshot) {
        self.step_with_dt(input, self.sim_config.dt);
    }

    pub fn step_with_dt(&mut self, input: InputSnapshot, dt: f32) {
        let input = input.normalized();
        self.tick = self.tick.advance(1);
        self.elapsed += dt as f64;

        self.run_scheduled();
        self.update_visibility();
        self.update_rover(&input, dt);
        self.update_drilling(&input, dt);
        self.update_boulders(dt);
        self.elevators
            .update(&mut self.rover, &input, dt, &mut self.events);
        self.chunks.refresh(&mut self.world, self.rover.tile());
        self.check_rescue();
    }

    /// Events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn run_scheduled(&mut self) {
        for action in self.scheduler.drain_due(self.tick) {
            match action {
                ScheduledAction::ChainExplosion { center } => {
                    let kind = self.world.kind_at(center).clone();
                    if !kind.is_explosive() {
                        debug!(%center, "Chain link no longer explosive; skipped");
                        continue;
                    }
                    self.world.set_kind_at(center, TILE_AIR);
                    self.explode(center, &kind);
                }
            }
        }
    }

    fn update_visibility(&mut self) {
        let center = self.rover.tile();
        let radius = self.rover.upgrades.light_radius;
        if let Some(update) = self.visibility.update(center, radius) {
            if update.newly_explored > 0 {
                self.chunks.mark_dirty_in(update.rect, DirtyFlags::LIGHT);
            }
        }
    }

    fn update_rover(&mut self, input: &InputSnapshot, dt: f32) {
        let riding = self.elevators.is_riding();
        let report = step_motor(
            &mut self.rover,
            &self.world,
            input,
            &self.sim_config,
            dt,
            riding,
        );
        if report.thrusting {
            self.rover
                .drain_energy(self.sim_config.thrust_energy_per_second * dt);
        }
        if input.interact && !riding {
            let pos = self.rover.tile();
            if let Err(err) = self.place_tile(pos, tiles::LADDER) {
                debug!(%pos, "Ladder not placed: {err}");
            }
        }
        if !self.world.is_surface_zone(self.rover.tile().y) {
            self.rover
                .drain_energy(self.sim_config.idle_energy_per_second * dt);
        }
    }

    fn update_drilling(&mut self, input: &InputSnapshot, dt: f32) {
        let update = self.drilling.update(
            &mut self.world,
            &mut self.rover,
            input,
            dt,
            self.sim_config.drill_energy_per_second,
            &mut self.events,
        );
        let DrillUpdate::Completed(done) = update else {
            return;
        };
        match done.kind.hazard {
            Hazard::None => {}
            Hazard::Heat => self.apply_damage(done.kind.hazard_damage),
            Hazard::Explosion => self.explode(done.pos, &done.kind),
        }
    }

    fn update_boulders(&mut self, dt: f32) {
        self.chunks.apply_changes(&mut self.world);
        let catalog = Arc::clone(self.world.catalog());
        let candidates: Vec<TilePos> = self
            .chunks
            .active_tiles()
            .filter(|(_, id)| catalog.kind(*id).unstable)
            .map(|(pos, _)| pos)
            .collect();
        let impact = self.boulders.update(
            &mut self.world,
            candidates,
            self.rover.tile(),
            self.elapsed,
            dt,
            &mut self.events,
        );
        if impact.is_some() {
            self.rescue(RescueReason::Crushed);
        }
    }

    fn explode(&mut self, center: TilePos, kind: &TileKind) {
        let outcome = detonate(&mut self.world, center, kind.hazard_radius);
        self.events.push(WorldEvent::Explosion {
            center,
            radius: kind.hazard_radius,
            cleared: outcome.cleared.len(),
        });

        let due = self.tick.advance(self.sim_config.chain_delay_ticks);
        for link in outcome.chained {
            self.scheduler
                .schedule(due, ScheduledAction::ChainExplosion { center: link });
        }

        let distance = distance_to(center, self.rover.pos);
        let damage = falloff_damage(kind.hazard_damage, kind.hazard_radius, distance);
        if damage > 0.0 {
            self.apply_damage(damage);
        }
    }

    fn apply_damage(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        let hull = self.rover.damage(amount);
        self.events.push(WorldEvent::Damage { amount, hull });
    }

    fn check_rescue(&mut self) {
        if self.rover.is_destroyed() {
            self.rescue(RescueReason::HullDestroyed);
        } else if self.rover.energy <= 0.0 && !self.world.is_surface_zone(self.rover.tile().y) {
            self.rescue(RescueReason::EnergyDepleted);
        }
    }

    /// Teleport home, drop cargo, refill and cancel in-flight actions.
    pub fn rescue(&mut self, reason: RescueReason) {
        let home = self.rover_config.home;
        warn!(?reason, from = %self.rover.tile(), "Rover rescued");
        self.rover.rescue(home);
        self.drilling.cancel();
        if let Some(elevator) = self.elevators.rider() {
            self.elevators.release_rider();
            self.events.push(WorldEvent::ElevatorLeft { elevator });
        }
        self.events.push(WorldEvent::Rescued { reason, home });
    }

    /// Place a ladder, platform or other single-tile placeable.
    ///
    /// Climbable tiles draw from the rover's ladder stock.
    pub fn place_tile(&mut self, pos: TilePos, kind: TileId) -> Result<(), PlacementError> {
        let result = self.try_place_tile(pos, kind);
        match result {
            Ok(()) => self.events.push(WorldEvent::TilePlaced { pos, kind }),
            Err(_) => self.events.push(Signal::CannotPlace { pos }.into()),
        }
        result
    }

    fn try_place_tile(&mut self, pos: TilePos, kind: TileId) -> Result<(), PlacementError> {
        let placed = self.world.catalog().kind(kind).clone();
        if !placed.placed || placed.elevator_part.is_some() || placed.id != kind {
            return Err(PlacementError::NotPlaceable(kind));
        }
        if !self.world.in_bounds(pos) {
            return Err(PlacementError::OutOfBounds(pos));
        }
        let current = self.world.kind_at(pos);
        if current.solid || current.placed {
            return Err(PlacementError::Obstructed(pos));
        }
        if placed.climbable {
            if self.rover.ladders == 0 {
                return Err(PlacementError::OutOfStock);
            }
            self.rover.ladders -= 1;
        }
        self.world.set_kind_at(pos, kind);
        Ok(())
    }

    /// Place an elevator shaft; failures raise a cannot-place signal.
    pub fn place_elevator(&mut self, top: TilePos, length: i32) -> Result<u32, PlacementError> {
        let result = self.elevators.place(&mut self.world, top, length);
        match &result {
            Ok(_) => {
                let kind = self.world.effective_kind_at(top);
                self.events.push(WorldEvent::TilePlaced { pos: top, kind });
            }
            Err(err) => {
                debug!(%top, length, "Elevator rejected: {err}");
                self.events.push(Signal::CannotPlace { pos: top }.into());
            }
        }
        result
    }

    /// Effective kind plus fog classification.
    pub fn tile_view(&self, pos: TilePos) -> TileView {
        TileView {
            kind: self.world.effective_kind_at(pos),
            visibility: self.visibility.classify(pos),
        }
    }

    /// Target and progress fraction of the drill, if one is running.
    pub fn drill_progress(&self) -> Option<(TilePos, f32)> {
        self.drilling.progress()
    }

    /// Explored tiles inside `rect` for the overview map.
    pub fn overview(&self, rect: TileRect) -> Vec<TilePos> {
        self.visibility.explored_in_rect(rect)
    }

    /// Rover position as the renderer sees it.
    pub fn rover_position(&self) -> Vec2 {
        self.rover.pos
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            seed: self.world.seed(),
            tick: self.tick,
            overrides: self.world.export_overrides(),
            explored: self.visibility.export_explored(),
            elevators: self.elevators.export_records(),
        }
    }

    /// Replace mutable world state with a snapshot of the same seed.
    #[instrument(skip_all, fields(tick = snapshot.tick.0))]
    pub fn restore(&mut self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        snapshot.check_seed(self.world.seed())?;

        self.world.reset_to(&snapshot.overrides);
        self.visibility = VisibilityEngine::new(self.world.config(), self.rover.upgrades.light_radius);
        self.visibility.import_explored(&snapshot.explored);
        self.elevators.clear();
        self.elevators
            .import_records(&mut self.world, &snapshot.elevators);
        self.boulders.clear();
        self.scheduler.clear();
        self.drilling.cancel();
        self.chunks.clear();
        self.chunks.refresh(&mut self.world, self.rover.tile());
        self.tick = snapshot.tick;
        debug!(
            overrides = snapshot.overrides.len(),
            elevators = snapshot.elevators.len(),
            "Snapshot restored"
        );
        Ok(())
    }
}
