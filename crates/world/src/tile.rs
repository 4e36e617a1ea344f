//! Tile catalog: immutable per-kind properties (solidity, hardness, drilling, hazards).
//!
//! The catalog is built once and shared behind an `Arc` by every subsystem that
//! needs to interpret a [`TileId`]. Nothing in the engine reaches for a global
//! table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Tile identifier referencing the catalog.
pub type TileId = u16;

/// Reserved ID for air.
pub const TILE_AIR: TileId = 0;

/// IDs of the standard catalog.
pub mod tiles {
    use super::TileId;

    pub const AIR: TileId = 0;
    pub const SURFACE: TileId = 1;
    pub const DIRT: TileId = 2;
    pub const ROCK: TileId = 3;
    pub const HARD_ROCK: TileId = 4;
    pub const REINFORCED_ROCK: TileId = 5;
    pub const BEDROCK: TileId = 6;

    // Ore tile IDs
    pub const COAL: TileId = 7;
    pub const COPPER: TileId = 8;
    pub const IRON: TileId = 9;
    pub const SILVER: TileId = 10;
    pub const GOLD: TileId = 11;
    pub const RUBY: TileId = 12;
    pub const DIAMOND: TileId = 13;
    pub const RELIC: TileId = 14;

    // Hazards
    pub const GAS_POCKET: TileId = 15;
    pub const MAGMA_ROCK: TileId = 16;
    pub const BOULDER: TileId = 17;

    // Player-placed
    pub const LADDER: TileId = 18;
    pub const PLATFORM: TileId = 19;
    pub const ELEVATOR_TOP: TileId = 20;
    pub const ELEVATOR_ROPE: TileId = 21;
    pub const ELEVATOR_CAR: TileId = 22;
    pub const ELEVATOR_BOTTOM: TileId = 23;
}

/// Hazard carried by a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    #[default]
    None,
    /// Burns the rover when drilled.
    Heat,
    /// Detonates when drilled or caught in another blast.
    Explosion,
}

/// Which piece of an elevator shaft a placed tile represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevatorPart {
    Top,
    Rope,
    Car,
    Bottom,
}

/// Immutable definition of one tile kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileKind {
    pub id: TileId,
    /// Human-readable identifier (e.g., "dirt").
    pub name: String,
    /// Blocks movement.
    pub solid: bool,
    /// Drill power required to clear the tile.
    pub hardness: u8,
    /// Base seconds to clear at speed multiplier 1.0; 0 means undrillable.
    pub drill_time: f32,
    /// Resource label granted to cargo when drilled.
    pub ore: Option<String>,
    /// Currency yield of the ore.
    pub value: u32,
    pub hazard: Hazard,
    pub hazard_damage: f32,
    /// Blast radius in tiles (explosion hazards only).
    pub hazard_radius: f32,
    pub climbable: bool,
    /// Platform passable from below only.
    pub one_way: bool,
    /// Subject to gravity.
    pub unstable: bool,
    /// Player-constructed, not terrain.
    pub placed: bool,
    pub elevator_part: Option<ElevatorPart>,
}

impl Default for TileKind {
    fn default() -> Self {
        Self::air()
    }
}

impl TileKind {
    /// Air: not solid, not drillable.
    pub fn air() -> Self {
        Self {
            id: TILE_AIR,
            name: "air".to_string(),
            solid: false,
            hardness: 0,
            drill_time: 0.0,
            ore: None,
            value: 0,
            hazard: Hazard::None,
            hazard_damage: 0.0,
            hazard_radius: 0.0,
            climbable: false,
            one_way: false,
            unstable: false,
            placed: false,
            elevator_part: None,
        }
    }

    /// Drillable solid terrain.
    pub fn terrain(id: TileId, name: &str, hardness: u8, drill_time: f32) -> Self {
        Self {
            id,
            name: name.to_string(),
            solid: true,
            hardness,
            drill_time,
            ..Self::air()
        }
    }

    /// Solid terrain that can never be drilled.
    pub fn undrillable(id: TileId, name: &str) -> Self {
        Self::terrain(id, name, 0, 0.0)
    }

    /// Ore-bearing terrain.
    pub fn ore(id: TileId, name: &str, hardness: u8, drill_time: f32, value: u32) -> Self {
        Self {
            ore: Some(name.to_string()),
            value,
            ..Self::terrain(id, name, hardness, drill_time)
        }
    }

    /// Non-solid player-placed tile.
    pub fn placed(id: TileId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            placed: true,
            ..Self::air()
        }
    }

    /// Whether drilling can ever clear this tile.
    #[inline]
    pub fn is_drillable(&self) -> bool {
        self.solid && self.drill_time > 0.0
    }

    #[inline]
    pub fn is_explosive(&self) -> bool {
        self.hazard == Hazard::Explosion
    }

    /// Solid ground that can hold an unstable tile up.
    #[inline]
    pub fn is_stable_support(&self) -> bool {
        self.solid && !self.unstable
    }
}

/// Errors emitted while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse tile catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tile id {0} is defined more than once")]
    DuplicateId(TileId),
    #[error("tile name `{0}` is defined more than once")]
    DuplicateName(String),
    #[error("tile id 0 must be a non-solid, undrillable air kind")]
    InvalidAir,
    #[error("catalog does not define tile id 0 (air)")]
    MissingAir,
    #[error("unknown tile name `{0}`")]
    UnknownName(String),
}

/// Registry storing tile kinds keyed by id.
#[derive(Debug, Clone)]
pub struct TileCatalog {
    kinds: Vec<Option<TileKind>>,
    name_to_id: HashMap<String, TileId>,
    max_hardness: u8,
    air: TileKind,
}

impl TileCatalog {
    /// Construct a catalog from the supplied kinds, validating id uniqueness and air.
    pub fn new(kinds: Vec<TileKind>) -> Result<Self, CatalogError> {
        let len = kinds.iter().map(|k| k.id as usize + 1).max().unwrap_or(0);
        let mut slots: Vec<Option<TileKind>> = vec![None; len];
        let mut name_to_id = HashMap::new();

        for kind in kinds {
            let id = kind.id;
            if slots[id as usize].is_some() {
                return Err(CatalogError::DuplicateId(id));
            }
            if name_to_id.insert(kind.name.clone(), id).is_some() {
                return Err(CatalogError::DuplicateName(kind.name));
            }
            slots[id as usize] = Some(kind);
        }

        let air = match slots.first() {
            Some(Some(air)) => air.clone(),
            _ => return Err(CatalogError::MissingAir),
        };
        if air.solid || air.drill_time != 0.0 {
            return Err(CatalogError::InvalidAir);
        }

        let max_hardness = slots.iter().flatten().map(|k| k.hardness).max().unwrap_or(0);

        Ok(Self {
            kinds: slots,
            name_to_id,
            max_hardness,
            air,
        })
    }

    /// Parse a JSON array of tile definitions.
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        let kinds: Vec<TileKind> = serde_json::from_str(input)?;
        Self::new(kinds)
    }

    /// The built-in table used by the game.
    pub fn standard() -> Self {
        use tiles::*;

        let kinds = vec![
            TileKind::air(),
            TileKind::undrillable(SURFACE, "surface"),
            TileKind::terrain(DIRT, "dirt", 1, 0.8),
            TileKind::terrain(ROCK, "rock", 2, 1.4),
            TileKind::terrain(HARD_ROCK, "hard_rock", 3, 2.2),
            TileKind::undrillable(REINFORCED_ROCK, "reinforced_rock"),
            TileKind::undrillable(BEDROCK, "bedrock"),
            TileKind::ore(COAL, "coal", 1, 1.0, 5),
            TileKind::ore(COPPER, "copper", 2, 1.4, 12),
            TileKind::ore(IRON, "iron", 2, 1.8, 25),
            TileKind::ore(SILVER, "silver", 3, 2.4, 50),
            TileKind::ore(GOLD, "gold", 3, 2.8, 100),
            TileKind::ore(RUBY, "ruby", 4, 3.2, 250),
            TileKind::ore(DIAMOND, "diamond", 4, 3.8, 500),
            TileKind::ore(RELIC, "relic", 4, 4.5, 1200),
            TileKind {
                hazard: Hazard::Explosion,
                hazard_damage: 30.0,
                hazard_radius: 2.0,
                ..TileKind::terrain(GAS_POCKET, "gas_pocket", 1, 0.6)
            },
            TileKind {
                hazard: Hazard::Heat,
                hazard_damage: 15.0,
                ..TileKind::terrain(MAGMA_ROCK, "magma_rock", 3, 2.0)
            },
            TileKind {
                unstable: true,
                ..TileKind::terrain(BOULDER, "boulder", 5, 3.0)
            },
            TileKind {
                climbable: true,
                ..TileKind::placed(LADDER, "ladder")
            },
            TileKind {
                one_way: true,
                ..TileKind::placed(PLATFORM, "platform")
            },
            TileKind {
                elevator_part: Some(ElevatorPart::Top),
                ..TileKind::placed(ELEVATOR_TOP, "elevator_top")
            },
            TileKind {
                elevator_part: Some(ElevatorPart::Rope),
                ..TileKind::placed(ELEVATOR_ROPE, "elevator_rope")
            },
            TileKind {
                elevator_part: Some(ElevatorPart::Car),
                ..TileKind::placed(ELEVATOR_CAR, "elevator_car")
            },
            TileKind {
                elevator_part: Some(ElevatorPart::Bottom),
                ..TileKind::placed(ELEVATOR_BOTTOM, "elevator_bottom")
            },
        ];

        // The table above is covered by `standard_catalog_is_valid`.
        match Self::new(kinds) {
            Ok(catalog) => catalog,
            Err(err) => unreachable!("standard tile catalog is invalid: {err}"),
        }
    }

    /// Look up a kind by numeric id.
    pub fn get(&self, id: TileId) -> Option<&TileKind> {
        self.kinds.get(id as usize).and_then(Option::as_ref)
    }

    /// Look up a kind, treating unknown ids as air.
    pub fn kind(&self, id: TileId) -> &TileKind {
        self.get(id).unwrap_or(&self.air)
    }

    /// Whether `id` names a defined kind.
    pub fn contains(&self, id: TileId) -> bool {
        self.get(id).is_some()
    }

    /// Resolve a tile id by its name.
    pub fn id_by_name(&self, name: &str) -> Option<TileId> {
        self.name_to_id.get(name).copied()
    }

    /// Resolve a tile id by its name, failing with [`CatalogError::UnknownName`].
    pub fn require(&self, name: &str) -> Result<TileId, CatalogError> {
        self.id_by_name(name)
            .ok_or_else(|| CatalogError::UnknownName(name.to_string()))
    }

    /// Highest hardness in the catalog.
    pub fn max_hardness(&self) -> u8 {
        self.max_hardness
    }

    /// The "boulder" class: unstable tiles at maximum hardness need an explosive tip.
    pub fn needs_explosive_tip(&self, id: TileId) -> bool {
        let kind = self.kind(id);
        kind.unstable && kind.hardness >= self.max_hardness
    }

    /// Id of the elevator piece tile for `part`, if the catalog defines one.
    pub fn elevator_tile(&self, part: ElevatorPart) -> Option<TileId> {
        self.iter()
            .find(|k| k.elevator_part == Some(part))
            .map(|k| k.id)
    }

    /// Iterate over every defined kind in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TileKind> + '_ {
        self.kinds.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.kinds.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
