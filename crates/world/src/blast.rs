//! Explosion resolution for explosive hazard tiles.
//!
//! A blast clears drillable solid tiles within its radius. Explosive tiles
//! caught in the radius are left standing and reported as chain links; the
//! caller schedules them so the cascade unfolds over several steps.

use deepdig_core::TilePos;
use glam::Vec2;
use tracing::info;

use crate::tile::TILE_AIR;
use crate::world::WorldState;

#[derive(Debug, Clone, PartialEq)]
pub struct BlastOutcome {
    pub center: TilePos,
    pub radius: f32,
    /// Tiles turned to air, row-major.
    pub cleared: Vec<TilePos>,
    /// Explosive tiles within reach that should detonate next.
    pub chained: Vec<TilePos>,
}

/// Detonate at `center`. The center tile itself must already be cleared.
pub fn detonate(world: &mut WorldState, center: TilePos, radius: f32) -> BlastOutcome {
    let reach = radius.floor() as i32;
    let radius_sq = radius * radius;
    let mut outcome = BlastOutcome {
        center,
        radius,
        cleared: Vec::new(),
        chained: Vec::new(),
    };

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if (dx * dx + dy * dy) as f32 > radius_sq {
                continue;
            }
            let pos = center.offset(dx, dy);
            if pos == center || !world.in_bounds(pos) {
                continue;
            }
            let kind = world.kind_at(pos);
            if kind.is_explosive() {
                outcome.chained.push(pos);
            } else if kind.is_drillable() {
                world.set_kind_at(pos, TILE_AIR);
                outcome.cleared.push(pos);
            }
        }
    }

    info!(
        %center,
        radius,
        cleared = outcome.cleared.len(),
        chained = outcome.chained.len(),
        "Explosion"
    );
    outcome
}

/// Damage dealt to something at `distance` tiles from a blast center.
///
/// Full damage at the center, falling off linearly, zero beyond `radius`.
pub fn falloff_damage(damage: f32, radius: f32, distance: f32) -> f32 {
    if distance > radius {
        return 0.0;
    }
    (damage * (1.0 - distance / (radius + 1.0))).max(0.0)
}

/// Distance from the middle of `center` to a continuous position.
pub fn distance_to(center: TilePos, pos: Vec2) -> f32 {
    let mid = Vec2::new(center.x as f32 + 0.5, center.y as f32 + 0.5);
    mid.distance(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::tile::{tiles, TileCatalog};
    use std::sync::Arc;

    fn world() -> WorldState {
        WorldState::new(&WorldConfig::with_seed(42), Arc::new(TileCatalog::standard()))
    }

    fn fill(world: &mut WorldState, kind: u16) {
        for y in 5..16 {
            for x in 5..16 {
                world.set_kind_at(TilePos::new(x, y), kind);
            }
        }
    }

    #[test]
    fn clears_disc_of_radius() {
        let mut world = world();
        fill(&mut world, tiles::ROCK);
        let center = TilePos::new(10, 10);
        world.set_kind_at(center, TILE_AIR);
        let outcome = detonate(&mut world, center, 2.0);
        assert_eq!((outcome.center, outcome.radius), (center, 2.0));
        assert!(outcome.chained.is_empty());
        // 13 tiles within distance 2, minus the center.
        assert_eq!(outcome.cleared.len(), 12);
        assert_eq!(world.effective_kind_at(TilePos::new(12, 10)), TILE_AIR);
        assert_eq!(world.effective_kind_at(TilePos::new(11, 11)), TILE_AIR);
        assert_eq!(world.effective_kind_at(TilePos::new(12, 11)), tiles::ROCK);
    }

    #[test]
    fn explosive_neighbours_are_chained_not_cleared() {
        let mut world = world();
        fill(&mut world, tiles::ROCK);
        world.set_kind_at(TilePos::new(11, 10), tiles::GAS_POCKET);
        let outcome = detonate(&mut world, TilePos::new(10, 10), 2.0);
        assert_eq!(outcome.chained, vec![TilePos::new(11, 10)]);
        assert_eq!(
            world.effective_kind_at(TilePos::new(11, 10)),
            tiles::GAS_POCKET
        );
    }

    #[test]
    fn undrillable_tiles_survive() {
        let mut world = world();
        fill(&mut world, tiles::REINFORCED_ROCK);
        world.set_kind_at(TilePos::new(10, 11), tiles::LADDER);
        let outcome = detonate(&mut world, TilePos::new(10, 10), 2.0);
        assert!(outcome.cleared.is_empty());
        assert_eq!(world.effective_kind_at(TilePos::new(10, 11)), tiles::LADDER);
    }

    #[test]
    fn damage_falls_off_with_distance() {
        assert_eq!(falloff_damage(30.0, 2.0, 0.0), 30.0);
        assert!((falloff_damage(30.0, 2.0, 1.5) - 15.0).abs() < 1e-5);
        assert_eq!(falloff_damage(30.0, 2.0, 2.1), 0.0);
        assert!((distance_to(TilePos::new(1, 1), Vec2::new(1.5, 2.5)) - 1.0).abs() < 1e-6);
    }
}
