#![warn(missing_docs)]
//! Physics primitives (2D AABB and tile-span helpers).
//!
//! All lengths are in tile units: a tile occupies `[x, x + 1) × [y, y + 1)`.

use glam::Vec2;
use std::ops::RangeInclusive;

/// Small inset used when converting box edges to tile spans so a box resting
/// exactly on a tile boundary does not count as overlapping the next tile.
pub const EDGE_EPSILON: f32 = 1e-3;

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y).
    pub min: Vec2,
    /// Maximum corner (x, y).
    pub max: Vec2,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Self { min, max }
    }

    /// Box of `size` centred on `center`.
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Box moved by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.min + delta, self.max + delta)
    }

    /// Columns overlapped by the box.
    pub fn tile_columns(&self) -> RangeInclusive<i32> {
        span(self.min.x, self.max.x)
    }

    /// Rows overlapped by the box.
    pub fn tile_rows(&self) -> RangeInclusive<i32> {
        span(self.min.y, self.max.y)
    }
}

/// Tiles covered by the open interval `(lo, hi)` on one axis.
pub fn span(lo: f32, hi: f32) -> RangeInclusive<i32> {
    let first = (lo + EDGE_EPSILON).floor() as i32;
    let last = (hi - EDGE_EPSILON).floor() as i32;
    first..=last.max(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translated(Vec2::new(-0.5, 0.0))));
    }

    #[test]
    fn span_ignores_exact_boundaries() {
        let b = Aabb::from_center(Vec2::new(2.5, 3.5), Vec2::splat(1.0));
        assert_eq!(b.tile_columns(), 2..=2);
        assert_eq!(b.tile_rows(), 3..=3);

        let wide = Aabb::from_center(Vec2::new(2.5, 3.5), Vec2::new(1.5, 0.8));
        assert_eq!(wide.tile_columns(), 1..=3);
        assert_eq!(wide.tile_rows(), 3..=3);
    }
}
