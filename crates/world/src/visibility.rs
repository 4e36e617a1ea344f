//! Fog of war: a monotonic explored set plus the current light disc.
//!
//! Tiles within the light radius of the rover's tile are visible right now and
//! get added to the explored set, which never shrinks. Everything above the
//! ground line is always visible and explored.

use std::collections::BTreeSet;

use deepdig_core::TilePos;
use serde::{Deserialize, Serialize};

use crate::chunk::TileRect;
use crate::config::WorldConfig;

/// Renderer-facing classification of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Inside the current light radius (or above the surface).
    Visible,
    /// Seen before, not lit now.
    Explored,
    Hidden,
}

/// Result of one visibility pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityUpdate {
    pub newly_explored: usize,
    /// Tiles scanned this pass (the light disc's bounding square).
    pub rect: TileRect,
}

pub struct VisibilityEngine {
    explored: BTreeSet<TilePos>,
    center: Option<TilePos>,
    light_radius: f32,
    width: i32,
    depth: i32,
    surface_height: i32,
}

impl VisibilityEngine {
    pub fn new(config: &WorldConfig, light_radius: f32) -> Self {
        Self {
            explored: BTreeSet::new(),
            center: None,
            light_radius,
            width: config.width,
            depth: config.depth,
            surface_height: config.surface_height,
        }
    }

    pub fn light_radius(&self) -> f32 {
        self.light_radius
    }

    /// Last tile the light disc was centred on.
    pub fn center(&self) -> Option<TilePos> {
        self.center
    }

    pub fn explored_count(&self) -> usize {
        self.explored.len()
    }

    /// Recentre the light disc and mark everything inside it explored.
    ///
    /// Returns `None` when neither the tile nor the radius changed.
    pub fn update(&mut self, center: TilePos, light_radius: f32) -> Option<VisibilityUpdate> {
        if self.center == Some(center) && self.light_radius == light_radius {
            return None;
        }
        self.center = Some(center);
        self.light_radius = light_radius.max(0.0);

        let reach = self.light_radius.floor() as i32;
        let rect = TileRect::around(center, reach);
        let mut newly_explored = 0;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let pos = center.offset(dx, dy);
                if !self.in_bounds(pos) || !self.within_light(center, pos) {
                    continue;
                }
                if self.explored.insert(pos) {
                    newly_explored += 1;
                }
            }
        }
        Some(VisibilityUpdate {
            newly_explored,
            rect,
        })
    }

    fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.depth
    }

    fn within_light(&self, center: TilePos, pos: TilePos) -> bool {
        let r = self.light_radius as f64;
        center.distance_sq(pos) as f64 <= r * r
    }

    fn above_surface(&self, pos: TilePos) -> bool {
        pos.y < self.surface_height
    }

    pub fn is_explored(&self, pos: TilePos) -> bool {
        self.above_surface(pos) || self.explored.contains(&pos)
    }

    pub fn classify(&self, pos: TilePos) -> Visibility {
        if self.above_surface(pos) {
            return Visibility::Visible;
        }
        if let Some(center) = self.center {
            if self.within_light(center, pos) {
                return Visibility::Visible;
            }
        }
        if self.explored.contains(&pos) {
            Visibility::Explored
        } else {
            Visibility::Hidden
        }
    }

    /// Explored tiles inside `rect`, row-major. Used by the overview map.
    pub fn explored_in_rect(&self, rect: TileRect) -> Vec<TilePos> {
        if rect.is_empty() {
            return Vec::new();
        }
        self.explored
            .range(rect.min..=TilePos::new(rect.max.x, rect.max.y))
            .filter(|pos| rect.contains(**pos))
            .copied()
            .collect()
    }

    /// Explored set in row-major order.
    pub fn export_explored(&self) -> Vec<TilePos> {
        self.explored.iter().copied().collect()
    }

    /// Merge a saved explored set (the set only grows).
    pub fn import_explored(&mut self, tiles: &[TilePos]) {
        let (width, depth) = (self.width, self.depth);
        self.explored.extend(
            tiles
                .iter()
                .copied()
                .filter(|p| p.x >= 0 && p.y >= 0 && p.x < width && p.y < depth),
        );
        self.center = None;
    }

    /// Forget the light disc so the next update rescans.
    pub fn invalidate(&mut self) {
        self.center = None;
    }
}
