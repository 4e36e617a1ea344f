//! Authoritative tile grid: generated terrain overlaid with sparse overrides.

use crate::config::WorldConfig;
use crate::terrain::TerrainGenerator;
use crate::tile::{TileCatalog, TileId, TileKind};
use deepdig_core::TilePos;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// One persisted tile mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileOverride {
    pub x: i32,
    pub y: i32,
    pub kind: TileId,
}

/// Single write path for terrain state.
///
/// The generator is never mutated; every player-caused change lives in the
/// override map. Writes are queued in a change list so dependent caches can
/// catch up within the same step.
pub struct WorldState {
    catalog: Arc<TileCatalog>,
    generator: TerrainGenerator,
    overrides: BTreeMap<TilePos, TileId>,
    changed: Vec<TilePos>,
}

impl WorldState {
    pub fn new(config: &WorldConfig, catalog: Arc<TileCatalog>) -> Self {
        Self {
            catalog,
            generator: TerrainGenerator::new(config),
            overrides: BTreeMap::new(),
            changed: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<TileCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &WorldConfig {
        self.generator.config()
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    pub fn width(&self) -> i32 {
        self.config().width
    }

    pub fn depth(&self) -> i32 {
        self.config().depth
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width() && pos.y < self.depth()
    }

    /// Rows above the ground line, where the rover is safe.
    pub fn is_surface_zone(&self, y: i32) -> bool {
        y < self.config().surface_height
    }

    /// Override if present, otherwise the generated kind.
    pub fn effective_kind_at(&self, pos: TilePos) -> TileId {
        match self.overrides.get(&pos) {
            Some(&kind) => kind,
            None => self.generator.tile_kind_at(pos.x, pos.y),
        }
    }

    /// Catalog entry for the effective kind at `pos`.
    pub fn kind_at(&self, pos: TilePos) -> &TileKind {
        self.catalog.kind(self.effective_kind_at(pos))
    }

    /// Generated kind, ignoring overrides.
    pub fn generated_kind_at(&self, pos: TilePos) -> TileId {
        self.generator.tile_kind_at(pos.x, pos.y)
    }

    /// Out-of-bounds coordinates are an implicit wall.
    pub fn is_solid_at(&self, pos: TilePos) -> bool {
        !self.in_bounds(pos) || self.kind_at(pos).solid
    }

    /// Record an override. Returns `false` (and writes nothing) out of bounds.
    ///
    /// The override is kept even when it matches the generated kind, so a
    /// restored world reproduces exactly the mutations that were made.
    pub fn set_kind_at(&mut self, pos: TilePos, kind: TileId) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.overrides.insert(pos, kind);
        self.changed.push(pos);
        true
    }

    pub fn has_override(&self, pos: TilePos) -> bool {
        self.overrides.contains_key(&pos)
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Overrides in row-major order.
    pub fn export_overrides(&self) -> Vec<TileOverride> {
        self.overrides
            .iter()
            .map(|(pos, &kind)| TileOverride {
                x: pos.x,
                y: pos.y,
                kind,
            })
            .collect()
    }

    /// Replace the override map with saved data.
    pub fn reset_to(&mut self, saved: &[TileOverride]) {
        let previous: Vec<TilePos> = self.overrides.keys().copied().collect();
        self.overrides.clear();
        self.changed.extend(previous);
        self.import_overrides(saved);
    }

    /// Merge saved overrides into the current map.
    ///
    /// Entries that are out of bounds or reference unknown kinds are skipped.
    pub fn import_overrides(&mut self, saved: &[TileOverride]) {
        for entry in saved {
            let pos = TilePos::new(entry.x, entry.y);
            if !self.catalog.contains(entry.kind) {
                warn!(%pos, kind = entry.kind, "Skipping override with unknown tile kind");
                continue;
            }
            if !self.set_kind_at(pos, entry.kind) {
                warn!(%pos, "Skipping out-of-bounds override");
            }
        }
    }

    /// Positions written since the last drain.
    pub fn pending_changes(&self) -> &[TilePos] {
        &self.changed
    }

    /// Drain the change list.
    pub fn take_changed(&mut self) -> Vec<TilePos> {
        std::mem::take(&mut self.changed)
    }
}
