//! Tile coordinates and facing.
//!
//! The world grid is addressed with `x` growing to the right and `y` growing
//! downwards (row 0 is the top of the sky). Every subsystem keys its sparse
//! state by [`TilePos`] instead of string-built keys, so ordering and hashing
//! are stable and cheap.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer tile coordinate.
///
/// Implements `Ord` (row-major by `y`, then `x`) for deterministic iteration in
/// `BTreeMap`/`BTreeSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row (grows downwards).
    pub y: i32,
}

impl TilePos {
    /// Construct a tile position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position offset by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Tile directly above.
    pub const fn above(self) -> Self {
        self.offset(0, -1)
    }

    /// Tile directly below.
    pub const fn below(self) -> Self {
        self.offset(0, 1)
    }

    /// The four orthogonal neighbours: up, down, left, right.
    pub const fn neighbors4(self) -> [TilePos; 4] {
        [
            self.offset(0, -1),
            self.offset(0, 1),
            self.offset(-1, 0),
            self.offset(1, 0),
        ]
    }

    /// Squared Euclidean distance in tiles.
    pub fn distance_sq(self, other: TilePos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Euclidean distance in tiles.
    pub fn distance(self, other: TilePos) -> f32 {
        (self.distance_sq(other) as f32).sqrt()
    }

    /// Tile containing a continuous position given in tile units.
    pub fn containing(x: f32, y: f32) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32)
    }
}

impl PartialOrd for TilePos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TilePos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal direction a rover faces or drills towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Facing {
    /// Negative X.
    Left,
    /// Positive X.
    #[default]
    Right,
    /// Negative Y.
    Up,
    /// Positive Y.
    Down,
}

impl Facing {
    /// Unit tile offset for this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Facing::Left => (-1, 0),
            Facing::Right => (1, 0),
            Facing::Up => (0, -1),
            Facing::Down => (0, 1),
        }
    }

    /// Whether the direction lies on the horizontal axis.
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Facing::Left | Facing::Right)
    }

    /// Facing for a horizontal axis value (-1 / 1); `None` for 0.
    pub fn from_horizontal(axis: i8) -> Option<Self> {
        match axis.signum() {
            -1 => Some(Facing::Left),
            1 => Some(Facing::Right),
            _ => None,
        }
    }

    /// Facing for a vertical axis value (-1 up / 1 down); `None` for 0.
    pub fn from_vertical(axis: i8) -> Option<Self> {
        match axis.signum() {
            -1 => Some(Facing::Up),
            1 => Some(Facing::Down),
            _ => None,
        }
    }
}
