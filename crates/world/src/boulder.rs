//! Gravity for unstable tiles.
//!
//! Lifecycle of a tracked boulder: unsupported (timer running) -> falling ->
//! landed or shattered on the rover. Support comes from stable ground below,
//! a resting boulder below, a placed structure below, or a climbable tile on
//! any of the four sides.

use std::collections::BTreeMap;

use deepdig_core::TilePos;
use tracing::{debug, info};

use crate::events::WorldEvent;
use crate::tile::{TileId, TILE_AIR};
use crate::world::WorldState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoulderEntry {
    /// Elapsed simulation seconds when the boulder lost support.
    pub unstable_since: f64,
    pub falling: bool,
    /// Fractional progress into the tile below, in `[0, 1]`.
    pub fall_offset: f32,
}

impl BoulderEntry {
    fn new(now: f64) -> Self {
        Self {
            unstable_since: now,
            falling: false,
            fall_offset: 0.0,
        }
    }
}

/// How a falling boulder resolved this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallOutcome {
    Continue,
    Hold,
    Landed(TilePos),
    Impact(TilePos),
}

pub struct BoulderSimulator {
    tracked: BTreeMap<TilePos, BoulderEntry>,
    fall_delay: f64,
    fall_speed: f32,
}

impl BoulderSimulator {
    pub fn new(fall_delay: f32, fall_speed: f32) -> Self {
        Self {
            tracked: BTreeMap::new(),
            fall_delay: fall_delay as f64,
            fall_speed,
        }
    }

    pub fn entry(&self, pos: TilePos) -> Option<&BoulderEntry> {
        self.tracked.get(&pos)
    }

    pub fn is_tracked(&self, pos: TilePos) -> bool {
        self.tracked.contains_key(&pos)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Tracked boulders with their fall offsets, for sprite placement.
    pub fn positions(&self) -> impl Iterator<Item = (TilePos, f32)> + '_ {
        self.tracked
            .iter()
            .map(|(pos, entry)| (*pos, entry.fall_offset))
    }

    pub fn clear(&mut self) {
        self.tracked.clear();
    }

    /// Whether the tile below holds a boulder up.
    fn blocks_fall(&self, world: &WorldState, pos: TilePos) -> bool {
        if !world.in_bounds(pos) {
            return true;
        }
        let kind = world.kind_at(pos);
        if kind.unstable {
            return !self.tracked.contains_key(&pos);
        }
        kind.solid || kind.placed || kind.climbable
    }

    /// Support check for a boulder at `pos`.
    pub fn is_supported(&self, world: &WorldState, pos: TilePos) -> bool {
        self.blocks_fall(world, pos.below())
            || pos
                .neighbors4()
                .iter()
                .any(|&n| world.in_bounds(n) && world.kind_at(n).climbable)
    }

    /// Run one step. `candidates` are positions in the active working set
    /// currently holding unstable tiles; `now` is elapsed simulation seconds.
    ///
    /// Returns the tile where a boulder struck the rover, if any.
    pub fn update(
        &mut self,
        world: &mut WorldState,
        candidates: impl IntoIterator<Item = TilePos>,
        rover_tile: TilePos,
        now: f64,
        dt: f32,
        events: &mut Vec<WorldEvent>,
    ) -> Option<TilePos> {
        self.tracked.retain(|pos, _| world.kind_at(*pos).unstable);

        // Bottom-up so a stack loses support in a single pass.
        let mut candidates: Vec<TilePos> = candidates.into_iter().collect();
        candidates.sort_by(|a, b| b.y.cmp(&a.y).then(a.x.cmp(&b.x)));
        candidates.dedup();
        for pos in candidates {
            if self.tracked.contains_key(&pos) || !world.kind_at(pos).unstable {
                continue;
            }
            if !self.is_supported(world, pos) {
                self.tracked.insert(pos, BoulderEntry::new(now));
                events.push(WorldEvent::BoulderUnstable { pos });
            }
        }

        let waiting: Vec<TilePos> = self
            .tracked
            .iter()
            .filter(|(_, entry)| !entry.falling)
            .map(|(pos, _)| *pos)
            .collect();
        for pos in waiting {
            if self.is_supported(world, pos) {
                self.tracked.remove(&pos);
                continue;
            }
            if let Some(entry) = self.tracked.get_mut(&pos) {
                if now - entry.unstable_since >= self.fall_delay {
                    entry.falling = true;
                    debug!(%pos, "Boulder falling");
                    events.push(WorldEvent::BoulderFalling { pos });
                }
            }
        }

        let mut falling: Vec<TilePos> = self
            .tracked
            .iter()
            .filter(|(_, entry)| entry.falling)
            .map(|(pos, _)| *pos)
            .collect();
        falling.sort_by(|a, b| b.y.cmp(&a.y).then(a.x.cmp(&b.x)));

        let mut impact = None;
        for pos in falling {
            match self.advance_fall(world, pos, rover_tile, now, dt) {
                FallOutcome::Continue | FallOutcome::Hold => {}
                FallOutcome::Landed(at) => {
                    debug!(pos = %at, "Boulder landed");
                    events.push(WorldEvent::BoulderLanded { pos: at });
                }
                FallOutcome::Impact(at) => {
                    info!(pos = %at, "Boulder struck the rover");
                    events.push(WorldEvent::BoulderImpact { pos: at });
                    impact.get_or_insert(at);
                }
            }
        }
        impact
    }

    fn advance_fall(
        &mut self,
        world: &mut WorldState,
        pos: TilePos,
        rover_tile: TilePos,
        now: f64,
        dt: f32,
    ) -> FallOutcome {
        let Some(mut entry) = self.tracked.get(&pos).copied() else {
            return FallOutcome::Hold;
        };
        entry.fall_offset += self.fall_speed * dt;
        if entry.fall_offset < 1.0 {
            self.tracked.insert(pos, entry);
            return FallOutcome::Continue;
        }

        let below = pos.below();
        if self.blocks_fall(world, below) {
            self.land(world, pos, now);
            return FallOutcome::Landed(pos);
        }
        if self.tracked.contains_key(&below) {
            entry.fall_offset = 1.0;
            self.tracked.insert(pos, entry);
            return FallOutcome::Hold;
        }

        // Move one row down through the world's write path.
        let boulder: TileId = world.effective_kind_at(pos);
        world.set_kind_at(pos, TILE_AIR);
        self.tracked.remove(&pos);
        entry.fall_offset -= 1.0;

        // Entering the rover's own tile is always lethal, even when the rover
        // stands on a floor; the boulder shatters and is never written there.
        if below == rover_tile {
            return FallOutcome::Impact(below);
        }
        world.set_kind_at(below, boulder);

        // Landing wins one row above the rover, so a ladder or platform in
        // the rover's tile still catches the boulder.
        if self.blocks_fall(world, below.below()) {
            self.land(world, below, now);
            return FallOutcome::Landed(below);
        }
        if below == rover_tile.above() {
            world.set_kind_at(below, TILE_AIR);
            return FallOutcome::Impact(below);
        }
        self.tracked.insert(below, entry);
        FallOutcome::Continue
    }

    fn land(&mut self, world: &WorldState, pos: TilePos, now: f64) {
        self.tracked.remove(&pos);
        if !self.is_supported(world, pos) {
            self.tracked.insert(pos, BoulderEntry::new(now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::tile::{tiles, TileCatalog};
    use std::sync::Arc;

    const DT: f32 = 0.1;

    fn world() -> WorldState {
        WorldState::new(&WorldConfig::with_seed(42), Arc::new(TileCatalog::standard()))
    }

    fn far_rover() -> TilePos {
        TilePos::new(90, 9)
    }

    /// Open sky column with a floor at row `floor`.
    fn shaft(world: &mut WorldState, x: i32, floor: i32) {
        for y in 0..floor {
            world.set_kind_at(TilePos::new(x, y), TILE_AIR);
        }
        world.set_kind_at(TilePos::new(x, floor), tiles::ROCK);
    }

    fn run(
        sim: &mut BoulderSimulator,
        world: &mut WorldState,
        candidates: &[TilePos],
        rover: TilePos,
        steps: usize,
        events: &mut Vec<WorldEvent>,
    ) -> Option<TilePos> {
        let mut impact = None;
        for step in 0..steps {
            let now = step as f64 * DT as f64;
            let hit = sim.update(world, candidates.to_vec(), rover, now, DT, events);
            impact = impact.or(hit);
        }
        impact
    }

    #[test]
    fn grounded_boulder_is_never_tracked() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(2.0, 6.0);
        world.set_kind_at(TilePos::new(5, 5), tiles::BOULDER);
        world.set_kind_at(TilePos::new(5, 6), tiles::ROCK);
        let mut events = Vec::new();
        run(&mut sim, &mut world, &[TilePos::new(5, 5)], far_rover(), 50, &mut events);
        assert_eq!(sim.tracked_count(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn unsupported_boulder_waits_then_falls_and_lands() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(2.0, 6.0);
        shaft(&mut world, 5, 8);
        world.set_kind_at(TilePos::new(5, 2), tiles::BOULDER);
        let mut events = Vec::new();

        run(&mut sim, &mut world, &[TilePos::new(5, 2)], far_rover(), 20, &mut events);
        // Timer has not elapsed at t = 1.9s.
        assert!(!sim.entry(TilePos::new(5, 2)).unwrap().falling);

        let mut now = 2.0;
        for _ in 0..40 {
            sim.update(&mut world, Vec::new(), far_rover(), now, DT, &mut events);
            now += DT as f64;
        }
        assert_eq!(world.effective_kind_at(TilePos::new(5, 7)), tiles::BOULDER);
        assert_eq!(world.effective_kind_at(TilePos::new(5, 2)), TILE_AIR);
        assert_eq!(sim.tracked_count(), 0);
        assert!(events
            .iter()
            .any(|e| *e == WorldEvent::BoulderLanded { pos: TilePos::new(5, 7) }));
    }

    #[test]
    fn ladder_neighbour_braces_boulder() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(2.0, 6.0);
        let boulder = TilePos::new(5, 4);
        shaft(&mut world, 5, 8);
        world.set_kind_at(boulder, tiles::BOULDER);
        world.set_kind_at(TilePos::new(6, 4), tiles::LADDER);
        let mut events = Vec::new();

        run(&mut sim, &mut world, &[boulder], far_rover(), 60, &mut events);
        assert!(!sim.is_tracked(boulder));

        world.set_kind_at(TilePos::new(6, 4), TILE_AIR);
        sim.update(&mut world, vec![boulder], far_rover(), 6.0, DT, &mut events);
        assert!(sim.is_tracked(boulder));
    }

    #[test]
    fn falling_boulder_is_caught_by_ladder() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(0.0, 6.0);
        shaft(&mut world, 5, 9);
        world.set_kind_at(TilePos::new(5, 1), tiles::BOULDER);
        world.set_kind_at(TilePos::new(5, 6), tiles::LADDER);
        let mut events = Vec::new();
        run(&mut sim, &mut world, &[TilePos::new(5, 1)], far_rover(), 30, &mut events);
        assert_eq!(world.effective_kind_at(TilePos::new(5, 5)), tiles::BOULDER);
        assert_eq!(world.effective_kind_at(TilePos::new(5, 6)), tiles::LADDER);
    }

    #[test]
    fn boulder_crushes_rover_below() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(0.0, 6.0);
        shaft(&mut world, 5, 9);
        world.set_kind_at(TilePos::new(5, 1), tiles::BOULDER);
        let mut events = Vec::new();
        let rover = TilePos::new(5, 8);
        let impact = run(&mut sim, &mut world, &[TilePos::new(5, 1)], rover, 30, &mut events);
        assert_eq!(impact, Some(TilePos::new(5, 7)));
        assert_eq!(world.effective_kind_at(TilePos::new(5, 7)), TILE_AIR);
        assert_eq!(sim.tracked_count(), 0);
    }

    #[test]
    fn boulder_entering_rover_tile_on_floor_is_an_impact() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(0.0, 6.0);
        shaft(&mut world, 5, 9);
        world.set_kind_at(TilePos::new(5, 7), tiles::BOULDER);
        let mut events = Vec::new();
        // Rover stands on the floor directly beneath the boulder.
        let rover = TilePos::new(5, 8);
        let impact = run(&mut sim, &mut world, &[TilePos::new(5, 7)], rover, 10, &mut events);
        assert_eq!(impact, Some(rover));
        assert_eq!(world.effective_kind_at(rover), TILE_AIR);
        assert_eq!(world.effective_kind_at(TilePos::new(5, 7)), TILE_AIR);
        assert!(!events
            .iter()
            .any(|e| matches!(e, WorldEvent::BoulderLanded { .. })));
        assert_eq!(sim.tracked_count(), 0);
    }

    #[test]
    fn stacked_boulders_fall_together() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(0.5, 6.0);
        shaft(&mut world, 5, 9);
        world.set_kind_at(TilePos::new(5, 2), tiles::BOULDER);
        world.set_kind_at(TilePos::new(5, 3), tiles::BOULDER);
        let candidates = [TilePos::new(5, 2), TilePos::new(5, 3)];
        let mut events = Vec::new();

        sim.update(&mut world, candidates.to_vec(), far_rover(), 0.0, DT, &mut events);
        assert_eq!(sim.tracked_count(), 2);

        let mut now = 0.1;
        for _ in 0..60 {
            sim.update(&mut world, Vec::new(), far_rover(), now, DT, &mut events);
            now += DT as f64;
        }
        assert_eq!(world.effective_kind_at(TilePos::new(5, 8)), tiles::BOULDER);
        assert_eq!(world.effective_kind_at(TilePos::new(5, 7)), tiles::BOULDER);
        assert_eq!(sim.tracked_count(), 0);
    }

    #[test]
    fn resting_stack_stays_put() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(0.5, 6.0);
        world.set_kind_at(TilePos::new(5, 7), tiles::BOULDER);
        world.set_kind_at(TilePos::new(5, 8), tiles::BOULDER);
        world.set_kind_at(TilePos::new(5, 9), tiles::ROCK);
        let mut events = Vec::new();
        run(
            &mut sim,
            &mut world,
            &[TilePos::new(5, 7), TilePos::new(5, 8)],
            far_rover(),
            20,
            &mut events,
        );
        assert_eq!(sim.tracked_count(), 0);
    }

    #[test]
    fn drilled_boulders_are_forgotten() {
        let mut world = world();
        let mut sim = BoulderSimulator::new(2.0, 6.0);
        shaft(&mut world, 5, 8);
        world.set_kind_at(TilePos::new(5, 2), tiles::BOULDER);
        let mut events = Vec::new();
        run(&mut sim, &mut world, &[TilePos::new(5, 2)], far_rover(), 2, &mut events);
        assert_eq!(sim.tracked_count(), 1);
        world.set_kind_at(TilePos::new(5, 2), TILE_AIR);
        sim.update(&mut world, Vec::new(), far_rover(), 1.0, DT, &mut events);
        assert_eq!(sim.tracked_count(), 0);
    }
}
