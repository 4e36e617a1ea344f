//! Chunk coordinates, tile rectangles and the per-chunk tile cache.

use std::fmt;

use deepdig_core::TilePos;

use crate::tile::{TileId, TILE_AIR};
use crate::world::WorldState;

/// Chunk edge length in tiles.
pub const CHUNK_SIZE: usize = 16;
/// Total tile count per chunk.
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Chunk coordinate in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then y).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a tile.
    pub fn of_tile(pos: TilePos) -> Self {
        let size = CHUNK_SIZE as i32;
        Self::new(pos.x.div_euclid(size), pos.y.div_euclid(size))
    }

    /// World-space tile at the chunk's top-left corner.
    pub fn origin(self) -> TilePos {
        let size = CHUNK_SIZE as i32;
        TilePos::new(self.x * size, self.y * size)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive tile rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min: TilePos,
    pub max: TilePos,
}

impl TileRect {
    pub fn new(min: TilePos, max: TilePos) -> Self {
        Self { min, max }
    }

    /// Square of `radius` tiles around `center`.
    pub fn around(center: TilePos, radius: i32) -> Self {
        Self::new(
            center.offset(-radius, -radius),
            center.offset(radius, radius),
        )
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| TilePos::new(x, y)))
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Dirty flags set whenever chunk data changes.
    pub struct DirtyFlags: u8 {
        const TILES = 0b0000_0001;
        const LIGHT = 0b0000_0010;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

/// Cached copy of one 16x16 region of effective tiles plus dirty flags.
///
/// Purely a presentation cache: the world state stays authoritative.
pub struct TileChunk {
    position: ChunkPos,
    tiles: Vec<TileId>,
    dirty: DirtyFlags,
}

impl TileChunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            tiles: vec![TILE_AIR; CHUNK_AREA],
            dirty: DirtyFlags::all(),
        }
    }

    /// Build a chunk from the world's effective tiles.
    pub fn from_world(position: ChunkPos, world: &WorldState) -> Self {
        let mut chunk = Self::new(position);
        let origin = position.origin();
        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let pos = origin.offset(lx as i32, ly as i32);
                chunk.tiles[Self::index(lx, ly)] = world.effective_kind_at(pos);
            }
        }
        chunk
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    fn index(x: usize, y: usize) -> usize {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE);
        y * CHUNK_SIZE + x
    }

    fn local(&self, pos: TilePos) -> Option<(usize, usize)> {
        let origin = self.position.origin();
        let lx = pos.x - origin.x;
        let ly = pos.y - origin.y;
        let size = CHUNK_SIZE as i32;
        if (0..size).contains(&lx) && (0..size).contains(&ly) {
            Some((lx as usize, ly as usize))
        } else {
            None
        }
    }

    /// Cached kind at a world position inside this chunk.
    pub fn tile(&self, pos: TilePos) -> Option<TileId> {
        self.local(pos).map(|(x, y)| self.tiles[Self::index(x, y)])
    }

    /// Update a cached tile and mark the relevant dirty flags.
    pub fn set_tile(&mut self, pos: TilePos, kind: TileId) {
        if let Some((x, y)) = self.local(pos) {
            let idx = Self::index(x, y);
            if self.tiles[idx] != kind {
                self.tiles[idx] = kind;
                self.dirty.insert(DirtyFlags::TILES | DirtyFlags::LIGHT);
            }
        }
    }

    /// Every cached tile with its world position, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (TilePos, TileId)> + '_ {
        let origin = self.position.origin();
        self.tiles.iter().enumerate().map(move |(idx, &kind)| {
            let x = (idx % CHUNK_SIZE) as i32;
            let y = (idx / CHUNK_SIZE) as i32;
            (origin.offset(x, y), kind)
        })
    }

    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty.insert(flags);
    }

    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Consume and return the current dirty flags.
    pub fn take_dirty_flags(&mut self) -> DirtyFlags {
        let flags = self.dirty;
        self.dirty = DirtyFlags::empty();
        flags
    }
}
