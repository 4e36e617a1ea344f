//! Chunk streaming around the rover.
//!
//! Chunks near the rover are kept active; chunks that leave the radius are
//! parked in an LRU cache and come back without regenerating.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use deepdig_core::TilePos;
use lru::LruCache;
use tracing::{debug, instrument};

use crate::chunk::{ChunkPos, DirtyFlags, TileChunk, TileRect, CHUNK_SIZE};
use crate::tile::TileId;
use crate::world::WorldState;

/// Default number of parked chunks kept for re-activation.
pub const DEFAULT_PARKED_CAPACITY: usize = 64;

/// Summary of one streaming pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkRefresh {
    /// Chunks built or pulled back from the parked cache.
    pub activated: Vec<ChunkPos>,
    /// Chunks moved out of the active set.
    pub parked: Vec<ChunkPos>,
    /// Tile writes applied to cached chunks.
    pub applied_changes: usize,
}

/// Streams regions of the world into an active working set around a focus tile.
///
/// Inactive chunks are parked in an LRU cache and re-activated without being
/// rebuilt. Uses BTreeMap for deterministic iteration order over the active set.
pub struct ChunkManager {
    view_radius: i32,
    active: BTreeMap<ChunkPos, TileChunk>,
    parked: LruCache<ChunkPos, TileChunk>,
    active_rect: Option<TileRect>,
}

impl ChunkManager {
    /// Create a manager keeping `view_radius` chunks around the focus active.
    pub fn new(view_radius: i32, parked_capacity: usize) -> Self {
        let cap = NonZeroUsize::new(parked_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            view_radius: view_radius.max(0),
            active: BTreeMap::new(),
            parked: LruCache::new(cap),
            active_rect: None,
        }
    }

    pub fn view_radius(&self) -> i32 {
        self.view_radius
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }

    pub fn is_active(&self, pos: ChunkPos) -> bool {
        self.active.contains_key(&pos)
    }

    /// Iterate over active chunk positions in sorted order.
    pub fn active_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.active.keys().copied()
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&TileChunk> {
        self.active.get(&pos)
    }

    /// Bounding rectangle of the active set, clipped to the world.
    pub fn active_tile_rect(&self) -> Option<TileRect> {
        self.active_rect
    }

    /// Cached kind for a tile in an active chunk.
    pub fn cached_kind(&self, pos: TilePos) -> Option<TileId> {
        self.active
            .get(&ChunkPos::of_tile(pos))
            .and_then(|chunk| chunk.tile(pos))
    }

    /// Every cached tile of the active set, chunk by chunk.
    pub fn active_tiles(&self) -> impl Iterator<Item = (TilePos, TileId)> + '_ {
        self.active.values().flat_map(TileChunk::iter)
    }

    /// Push pending world writes into cached chunks (active and parked).
    pub fn apply_changes(&mut self, world: &mut WorldState) -> usize {
        let changed = world.take_changed();
        for &pos in &changed {
            let kind = world.effective_kind_at(pos);
            let chunk_pos = ChunkPos::of_tile(pos);
            if let Some(chunk) = self.active.get_mut(&chunk_pos) {
                chunk.set_tile(pos, kind);
            } else if let Some(chunk) = self.parked.peek_mut(&chunk_pos) {
                chunk.set_tile(pos, kind);
            }
        }
        changed.len()
    }

    /// Apply pending changes, then stream chunks around `focus`.
    #[instrument(skip(self, world), fields(focus = %focus))]
    pub fn refresh(&mut self, world: &mut WorldState, focus: TilePos) -> ChunkRefresh {
        let applied_changes = self.apply_changes(world);
        let wanted = self.wanted_chunks(world, focus);

        let mut refresh = ChunkRefresh {
            applied_changes,
            ..ChunkRefresh::default()
        };

        let stale: Vec<ChunkPos> = self
            .active
            .keys()
            .filter(|pos| !wanted.contains(pos))
            .copied()
            .collect();
        for pos in stale {
            if let Some(chunk) = self.active.remove(&pos) {
                self.parked.push(pos, chunk);
                refresh.parked.push(pos);
            }
        }

        for pos in wanted {
            if self.active.contains_key(&pos) {
                continue;
            }
            let mut chunk = match self.parked.pop(&pos) {
                Some(chunk) => chunk,
                None => TileChunk::from_world(pos, world),
            };
            chunk.mark_dirty(DirtyFlags::all());
            self.active.insert(pos, chunk);
            refresh.activated.push(pos);
        }

        self.active_rect = self.compute_active_rect(world);

        if !refresh.activated.is_empty() || !refresh.parked.is_empty() {
            debug!(
                activated = refresh.activated.len(),
                parked = refresh.parked.len(),
                active = self.active.len(),
                "Chunk set changed"
            );
        }
        refresh
    }

    /// Mark every active chunk overlapping `rect`.
    pub fn mark_dirty_in(&mut self, rect: TileRect, flags: DirtyFlags) {
        if rect.is_empty() {
            return;
        }
        let lo = ChunkPos::of_tile(rect.min);
        let hi = ChunkPos::of_tile(rect.max);
        for (pos, chunk) in self.active.iter_mut() {
            if (lo.x..=hi.x).contains(&pos.x) && (lo.y..=hi.y).contains(&pos.y) {
                chunk.mark_dirty(flags);
            }
        }
    }

    /// Consume dirty flags of active chunks that have any set.
    pub fn take_dirty(&mut self) -> Vec<(ChunkPos, DirtyFlags)> {
        self.active
            .iter_mut()
            .filter_map(|(pos, chunk)| {
                let flags = chunk.take_dirty_flags();
                (!flags.is_empty()).then_some((*pos, flags))
            })
            .collect()
    }

    /// Drop every cached chunk, e.g. after a world reset.
    pub fn clear(&mut self) {
        self.active.clear();
        self.parked.clear();
        self.active_rect = None;
    }

    fn wanted_chunks(&self, world: &WorldState, focus: TilePos) -> Vec<ChunkPos> {
        let center = ChunkPos::of_tile(focus);
        let size = CHUNK_SIZE as i32;
        let max_x = (world.width() - 1).div_euclid(size);
        let max_y = (world.depth() - 1).div_euclid(size);
        let r = self.view_radius;

        let mut wanted = Vec::new();
        for y in (center.y - r).max(0)..=(center.y + r).min(max_y) {
            for x in (center.x - r).max(0)..=(center.x + r).min(max_x) {
                wanted.push(ChunkPos::new(x, y));
            }
        }
        wanted.sort();
        wanted
    }

    fn compute_active_rect(&self, world: &WorldState) -> Option<TileRect> {
        let first = *self.active.keys().next()?;
        let (mut lo, mut hi) = (first, first);
        for pos in self.active.keys() {
            lo = ChunkPos::new(lo.x.min(pos.x), lo.y.min(pos.y));
            hi = ChunkPos::new(hi.x.max(pos.x), hi.y.max(pos.y));
        }
        let size = CHUNK_SIZE as i32;
        let min = lo.origin();
        let max = hi.origin().offset(size - 1, size - 1);
        Some(TileRect::new(
            TilePos::new(min.x.max(0), min.y.max(0)),
            TilePos::new(max.x.min(world.width() - 1), max.y.min(world.depth() - 1)),
        ))
    }
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

    #[test]
    fn refresh_activates_chunks_around_focus() {
        let mut world = world();
        let mut chunks = ChunkManager::new(1, 8);
        let refresh = chunks.refresh(&mut world, TilePos::new(22, 9));
        // Focus chunk (1, 0): x in 0..=2, y in 0..=1 (no negative rows).
        assert_eq!(refresh.activated.len(), 6);
        assert_eq!(chunks.active_count(), 6);
        let rect = chunks.active_tile_rect().unwrap();
        assert_eq!(rect.min, TilePos::new(0, 0));
        assert_eq!(rect.max, TilePos::new(47, 31));
    }

    #[test]
    fn chunks_are_clipped_to_world_width() {
        let mut world = world();
        let mut chunks = ChunkManager::new(2, 8);
        chunks.refresh(&mut world, TilePos::new(98, 9));
        // Width 100 => last chunk column is 6.
        assert!(chunks.active_positions().all(|pos| pos.x <= 6 && pos.x >= 4));
        assert_eq!(chunks.active_tile_rect().unwrap().max.x, 99);
    }

    #[test]
    fn same_step_writes_reach_the_cache() {
        let mut world = world();
        let mut chunks = ChunkManager::new(1, 8);
        chunks.refresh(&mut world, TilePos::new(22, 9));
        chunks.take_dirty();

        let pos = TilePos::new(22, 10);
        world.set_kind_at(pos, tiles::AIR);
        assert_eq!(chunks.apply_changes(&mut world), 1);
        assert_eq!(chunks.cached_kind(pos), Some(tiles::AIR));

        let dirty = chunks.take_dirty();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].0, ChunkPos::new(1, 0));
        assert!(dirty[0].1.contains(DirtyFlags::TILES));
    }

    #[test]
    fn parked_chunks_are_reused_with_updates() {
        let mut world = world();
        let mut chunks = ChunkManager::new(0, 8);
        chunks.refresh(&mut world, TilePos::new(5, 5));
        let refresh = chunks.refresh(&mut world, TilePos::new(40, 5));
        assert_eq!(refresh.parked, vec![ChunkPos::new(0, 0)]);
        assert_eq!(chunks.parked_count(), 1);

        // A write into the parked chunk is applied without rebuilding it.
        world.set_kind_at(TilePos::new(5, 12), tiles::LADDER);
        chunks.refresh(&mut world, TilePos::new(40, 5));
        chunks.refresh(&mut world, TilePos::new(5, 5));
        assert_eq!(chunks.parked_count(), 1);
        assert_eq!(chunks.cached_kind(TilePos::new(5, 12)), Some(tiles::LADDER));
    }

    #[test]
    fn parked_cache_evicts_least_recent() {
        let mut world = world();
        let mut chunks = ChunkManager::new(0, 1);
        chunks.refresh(&mut world, TilePos::new(5, 5));
        chunks.refresh(&mut world, TilePos::new(20, 5));
        chunks.refresh(&mut world, TilePos::new(40, 5));
        assert_eq!(chunks.parked_count(), 1);
    }

    #[test]
    fn active_iteration_is_deterministic() {
        let mut world = world();
        let mut a = ChunkManager::new(2, 8);
        let mut b = ChunkManager::new(2, 8);
        a.refresh(&mut world, TilePos::new(50, 100));
        b.refresh(&mut world, TilePos::new(50, 100));
        let order_a: Vec<_> = a.active_positions().collect();
        let order_b: Vec<_> = b.active_positions().collect();
        assert_eq!(order_a, order_b);
        assert_eq!(order_a.len(), 25);
    }
}
