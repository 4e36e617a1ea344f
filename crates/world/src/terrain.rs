//! Seeded terrain generation.
//!
//! `tile_kind_at` is a pure function of `(seed, x, y)`: every coordinate hashes
//! independently, so chunks can be generated in any order and from any starting
//! point.

use crate::config::WorldConfig;
use crate::noise::{NoiseConfig, NoiseGenerator};
use crate::tile::{tiles, TileId};
use tracing::{debug, instrument};

/// Depth (rows below the ground line) from which cave pockets may appear.
pub const CAVE_MIN_DEPTH: i32 = 12;

/// Raw noise value above which a tile is carved into a cave pocket.
pub const CAVE_THRESHOLD: f64 = 0.3;

/// One vertical slice of the world with its own ore table.
#[derive(Debug, Clone, Copy)]
pub struct DepthBand {
    pub name: &'static str,
    /// First row (relative to the ground line) belonging to the band.
    pub start: i32,
    /// Kind used when no pick fires.
    pub filler: TileId,
    /// Ordered `(probability, kind)` picks, rolled cumulatively.
    pub picks: &'static [(f64, TileId)],
}

/// Depth bands from shallowest to deepest.
pub const DEPTH_BANDS: [DepthBand; 5] = [
    DepthBand {
        name: "shallow",
        start: 0,
        filler: tiles::DIRT,
        picks: &[
            (0.06, tiles::COAL),
            (0.03, tiles::COPPER),
            (0.005, tiles::BOULDER),
        ],
    },
    DepthBand {
        name: "medium",
        start: 40,
        filler: tiles::ROCK,
        picks: &[
            (0.04, tiles::COAL),
            (0.04, tiles::COPPER),
            (0.03, tiles::IRON),
            (0.005, tiles::GAS_POCKET),
            (0.01, tiles::BOULDER),
        ],
    },
    DepthBand {
        name: "deep",
        start: 120,
        filler: tiles::ROCK,
        picks: &[
            (0.04, tiles::IRON),
            (0.025, tiles::SILVER),
            (0.01, tiles::GOLD),
            (0.01, tiles::GAS_POCKET),
            (0.02, tiles::MAGMA_ROCK),
            (0.015, tiles::BOULDER),
        ],
    },
    DepthBand {
        name: "very_deep",
        start: 240,
        filler: tiles::HARD_ROCK,
        picks: &[
            (0.03, tiles::SILVER),
            (0.02, tiles::GOLD),
            (0.01, tiles::RUBY),
            (0.015, tiles::GAS_POCKET),
            (0.04, tiles::MAGMA_ROCK),
            (0.02, tiles::BOULDER),
        ],
    },
    DepthBand {
        name: "ancient",
        start: 380,
        filler: tiles::HARD_ROCK,
        picks: &[
            (0.03, tiles::GOLD),
            (0.02, tiles::RUBY),
            (0.01, tiles::DIAMOND),
            (0.003, tiles::RELIC),
            (0.05, tiles::MAGMA_ROCK),
            (0.02, tiles::GAS_POCKET),
            (0.025, tiles::BOULDER),
        ],
    },
];

/// Band containing `depth` rows below the ground line.
pub fn band_for_depth(depth: i32) -> &'static DepthBand {
    DEPTH_BANDS
        .iter()
        .rev()
        .find(|band| depth >= band.start)
        .unwrap_or(&DEPTH_BANDS[0])
}

/// Order-independent 64-bit hash of a coordinate.
pub fn coord_hash(seed: u64, x: i32, y: i32) -> u64 {
    let mut h = seed
        ^ (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

/// Coordinate hash mapped into `[0.0, 1.0)`.
pub fn coord_unit(seed: u64, x: i32, y: i32) -> f64 {
    (coord_hash(seed, x, y) >> 11) as f64 / (1u64 << 53) as f64
}

/// Deterministic generator for the base terrain layer.
pub struct TerrainGenerator {
    config: WorldConfig,
    caves: NoiseGenerator,
}

impl TerrainGenerator {
    /// Create a generator for the given world layout.
    #[instrument(skip(config), fields(seed = config.seed))]
    pub fn new(config: &WorldConfig) -> Self {
        debug!(
            width = config.width,
            depth = config.depth,
            "Creating terrain generator"
        );
        Self {
            config: config.clone(),
            caves: NoiseGenerator::new(NoiseConfig::caves(config.seed)),
        }
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Generated kind at `(x, y)`.
    ///
    /// Coordinates outside the world return air; bounds solidity belongs to the
    /// world state.
    pub fn tile_kind_at(&self, x: i32, y: i32) -> TileId {
        let cfg = &self.config;
        if x < 0 || y < 0 || x >= cfg.width || y >= cfg.depth {
            return tiles::AIR;
        }
        if y < cfg.surface_height {
            return tiles::AIR;
        }
        if y == cfg.depth - 1 {
            return tiles::BEDROCK;
        }
        if y == cfg.surface_height {
            return self.surface_row(x);
        }
        if x < cfg.town_end && y <= cfg.surface_height + cfg.protected_depth {
            return tiles::REINFORCED_ROCK;
        }

        let depth = y - cfg.surface_height;
        if depth >= CAVE_MIN_DEPTH && self.is_cave(x, y) {
            return tiles::AIR;
        }

        let band = band_for_depth(depth);
        let roll = coord_unit(cfg.seed, x, y);
        let mut cumulative = 0.0;
        for &(probability, kind) in band.picks {
            cumulative += probability;
            if roll < cumulative {
                return kind;
            }
        }
        band.filler
    }

    /// Surface row zoning: town, mining entrance, then boundary rock.
    fn surface_row(&self, x: i32) -> TileId {
        if x < self.config.town_end {
            tiles::SURFACE
        } else if x < self.config.entrance_end {
            tiles::DIRT
        } else {
            tiles::BEDROCK
        }
    }

    fn is_cave(&self, x: i32, y: i32) -> bool {
        self.caves.sample_2d(x as f64, y as f64) > CAVE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> TerrainGenerator {
        TerrainGenerator::new(&WorldConfig::with_seed(seed))
    }

    #[test]
    fn sky_is_air() {
        let gen = generator(42);
        for x in 0..100 {
            for y in 0..10 {
                assert_eq!(gen.tile_kind_at(x, y), tiles::AIR);
            }
        }
    }

    #[test]
    fn surface_row_is_zoned() {
        let gen = generator(42);
        assert_eq!(gen.tile_kind_at(5, 10), tiles::SURFACE);
        assert_eq!(gen.tile_kind_at(19, 10), tiles::SURFACE);
        assert_eq!(gen.tile_kind_at(20, 10), tiles::DIRT);
        assert_eq!(gen.tile_kind_at(22, 10), tiles::DIRT);
        assert_eq!(gen.tile_kind_at(39, 10), tiles::DIRT);
        assert_eq!(gen.tile_kind_at(40, 10), tiles::BEDROCK);
        assert_eq!(gen.tile_kind_at(99, 10), tiles::BEDROCK);
    }

    #[test]
    fn town_is_protected_from_below() {
        let gen = generator(7);
        for x in 0..20 {
            for y in 11..=13 {
                assert_eq!(gen.tile_kind_at(x, y), tiles::REINFORCED_ROCK);
            }
        }
    }

    #[test]
    fn last_row_is_bedrock() {
        let gen = generator(3);
        for x in 0..100 {
            assert_eq!(gen.tile_kind_at(x, 499), tiles::BEDROCK);
        }
    }

    #[test]
    fn out_of_bounds_is_air() {
        let gen = generator(3);
        assert_eq!(gen.tile_kind_at(-1, 50), tiles::AIR);
        assert_eq!(gen.tile_kind_at(100, 50), tiles::AIR);
        assert_eq!(gen.tile_kind_at(50, 500), tiles::AIR);
        assert_eq!(gen.tile_kind_at(50, -3), tiles::AIR);
    }

    #[test]
    fn generation_is_order_independent() {
        let a = generator(99);
        let b = generator(99);
        let forward: Vec<_> = (0..100).map(|x| a.tile_kind_at(x, 200)).collect();
        let backward: Vec<_> = (0..100).rev().map(|x| b.tile_kind_at(x, 200)).collect();
        let backward: Vec<_> = backward.into_iter().rev().collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn bands_follow_depth() {
        assert_eq!(band_for_depth(0).name, "shallow");
        assert_eq!(band_for_depth(39).name, "shallow");
        assert_eq!(band_for_depth(40).name, "medium");
        assert_eq!(band_for_depth(250).name, "very_deep");
        assert_eq!(band_for_depth(10_000).name, "ancient");
    }

    #[test]
    fn fillers_dominate_each_band() {
        let gen = generator(1234);
        let mut dirt = 0;
        for x in 20..100 {
            for y in 11..40 {
                if gen.tile_kind_at(x, y) == tiles::DIRT {
                    dirt += 1;
                }
            }
        }
        // 80x29 tiles with ~9.5% ore picks and some caves.
        assert!(dirt > 1200, "dirt count {dirt}");
    }

    #[test]
    fn pick_probabilities_stay_below_one() {
        for band in DEPTH_BANDS {
            let total: f64 = band.picks.iter().map(|(p, _)| p).sum();
            assert!(total < 0.5, "{} picks sum to {total}", band.name);
        }
    }

    #[test]
    fn coord_unit_is_in_range() {
        for x in -50..50 {
            let u = coord_unit(7, x, x * 3);
            assert!((0.0..1.0).contains(&u));
        }
    }
}
