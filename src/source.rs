//! The external game-client bridge boundary (spec 6).
//!
//! `MapDataSource` is the trait an embedder implements to hand the analyzer
//! a one-shot snapshot: grid dimensions, walkability, buildability, ground
//! height, starting locations, and neutral units. Mirrors the teacher
//! crate's `PlannerRoomDataSource` split between live game-API and offline
//! (bench/test) implementations. `StaticMapSource` is the in-memory
//! implementation built from plain arrays, for tests and for embedders that
//! already hold a snapshot.

use crate::grid::GroundHeightFlags;
use crate::neutral::NeutralKind;
use crate::position::{TilePosition, WalkPosition};

/// One static neutral unit as reported by the game client (spec 6):
/// mineral patch, vespene geyser, or static building.
#[derive(Clone, Debug)]
pub struct NeutralDescriptor {
    pub kind: NeutralKind,
    pub unit_type: String,
    pub top_left: TilePosition,
    pub size: TilePosition,
    pub initial_amount: Option<i32>,
}

impl NeutralDescriptor {
    pub fn new(
        kind: NeutralKind,
        unit_type: impl Into<String>,
        top_left: TilePosition,
        size: TilePosition,
        initial_amount: Option<i32>,
    ) -> Self {
        NeutralDescriptor {
            kind,
            unit_type: unit_type.into(),
            top_left,
            size,
            initial_amount,
        }
    }
}

/// The immutable snapshot consumed at `Initialize` (spec 1, 6). Implementations
/// exist for both a live game-client bridge (out of scope here) and the
/// offline `StaticMapSource` used by tests and embedders with an in-memory
/// snapshot already in hand.
pub trait MapDataSource {
    /// `(tileWidth, tileHeight)`.
    fn tile_size(&self) -> (i32, i32);
    fn is_walkable(&self, walk: WalkPosition) -> bool;
    fn is_buildable(&self, tile: TilePosition) -> bool;
    /// Raw ground height, `0..4` (spec 6).
    fn ground_height(&self, tile: TilePosition) -> i32;
    fn start_locations(&self) -> &[TilePosition];
    fn static_neutrals(&self) -> &[NeutralDescriptor];
}

/// An in-memory `MapDataSource` built from plain arrays. The analyzer never
/// requires this type -- any `MapDataSource` impl will do -- but it is the
/// natural vehicle for tests and for embedders who already hold a decoded
/// map snapshot.
pub struct StaticMapSource {
    tile_width: i32,
    tile_height: i32,
    walkable: Vec<bool>,
    buildable: Vec<bool>,
    ground_height: Vec<i32>,
    start_locations: Vec<TilePosition>,
    neutrals: Vec<NeutralDescriptor>,
}

impl StaticMapSource {
    /// All minitiles walkable, all tiles buildable, ground height 0 (low),
    /// no neutrals, no starting locations: the caller fills in terrain via
    /// the `set_*` methods before passing this to `Map::initialize`.
    pub fn new(tile_width: i32, tile_height: i32) -> Self {
        let walk_w = (tile_width * crate::position::MINITILES_PER_TILE) as usize;
        let walk_h = (tile_height * crate::position::MINITILES_PER_TILE) as usize;
        StaticMapSource {
            tile_width,
            tile_height,
            walkable: vec![true; walk_w * walk_h],
            buildable: vec![true; (tile_width * tile_height) as usize],
            ground_height: vec![0; (tile_width * tile_height) as usize],
            start_locations: Vec::new(),
            neutrals: Vec::new(),
        }
    }

    fn walk_width(&self) -> i32 {
        self.tile_width * crate::position::MINITILES_PER_TILE
    }

    pub fn set_walkable(&mut self, walk: WalkPosition, value: bool) {
        let w = self.walk_width();
        let idx = (walk.y * w + walk.x) as usize;
        self.walkable[idx] = value;
    }

    pub fn set_buildable(&mut self, tile: TilePosition, value: bool) {
        let idx = (tile.y * self.tile_width + tile.x) as usize;
        self.buildable[idx] = value;
    }

    pub fn set_ground_height(&mut self, tile: TilePosition, value: i32) {
        let idx = (tile.y * self.tile_width + tile.x) as usize;
        self.ground_height[idx] = value;
    }

    /// Fill a rectangular tile region (inclusive) with unwalkable minitiles
    /// and unbuildable tiles -- the usual way to carve out sea/lake/cliff in
    /// a synthetic test map.
    pub fn fill_unwalkable_tile_rect(&mut self, top_left: TilePosition, size: TilePosition) {
        for ty in top_left.y..top_left.y + size.y {
            for tx in top_left.x..top_left.x + size.x {
                self.set_buildable(TilePosition::new(tx, ty), false);
                let base = TilePosition::new(tx, ty).to_walk_position();
                for dy in 0..crate::position::MINITILES_PER_TILE {
                    for dx in 0..crate::position::MINITILES_PER_TILE {
                        self.set_walkable(WalkPosition::new(base.x + dx, base.y + dy), false);
                    }
                }
            }
        }
    }

    pub fn add_start_location(&mut self, tile: TilePosition) {
        self.start_locations.push(tile);
    }

    pub fn add_neutral(&mut self, neutral: NeutralDescriptor) {
        self.neutrals.push(neutral);
    }
}

impl MapDataSource for StaticMapSource {
    fn tile_size(&self) -> (i32, i32) {
        (self.tile_width, self.tile_height)
    }

    fn is_walkable(&self, walk: WalkPosition) -> bool {
        let w = self.walk_width();
        if walk.x < 0 || walk.y < 0 || walk.x >= w {
            return false;
        }
        let idx = (walk.y * w + walk.x) as usize;
        self.walkable.get(idx).copied().unwrap_or(false)
    }

    fn is_buildable(&self, tile: TilePosition) -> bool {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.tile_width {
            return false;
        }
        let idx = (tile.y * self.tile_width + tile.x) as usize;
        self.buildable.get(idx).copied().unwrap_or(false)
    }

    fn ground_height(&self, tile: TilePosition) -> i32 {
        let idx = (tile.y * self.tile_width + tile.x) as usize;
        self.ground_height.get(idx).copied().unwrap_or(0)
    }

    fn start_locations(&self) -> &[TilePosition] {
        &self.start_locations
    }

    fn static_neutrals(&self) -> &[NeutralDescriptor] {
        &self.neutrals
    }
}

/// Unit-type name for the map special case (spec 6): this building's
/// top-left is shifted +1 tile in X at ingestion.
pub const SPECIAL_RIGHT_PIT_DOOR: &str = "Special_Right_Pit_Door";
/// Unit-type name for eggs that must be ignored unless they wrap a Pit-Door
/// special building (spec 6).
pub const ZERG_EGG: &str = "Zerg_Egg";

pub(crate) fn ground_height_flags(raw: i32) -> (GroundHeightFlags, bool) {
    let level = (raw / 2).clamp(0, 2) as u8;
    let doodad = raw % 2 != 0;
    (GroundHeightFlags::from_bits_truncate(level), doodad)
}
