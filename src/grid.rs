//! Dense minitile/tile grids and the per-cell data carried on them.
//!
//! Mirrors the teacher crate's `RoomDataArray<T>`: a flat `Vec<T>` addressed
//! by `(x, y)`, generalized from a fixed 50x50 room to the analyzer's
//! variable map dimensions.

use crate::position::{TilePosition, WalkPosition};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// `areaId` sentinel meaning "blocked by a blocking neutral" (`INT16_MIN`, spec 3).
pub const BLOCKED_AREA_ID: i16 = i16::MIN;
/// `altitude` sentinel meaning "sea-or-lake, not yet classified" (spec 3/4.2).
pub const SEA_OR_LAKE_ALTITUDE: i16 = 1;
/// Altitude value for sea.
pub const SEA_ALTITUDE: i16 = 0;

bitflags! {
    /// Tile ground-height classification (spec 3: `groundHeight in {low, high, veryHigh}`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct GroundHeightFlags: u8 {
        const LOW = 0;
        const HIGH = 1;
        const VERY_HIGH = 2;
    }
}

/// A 2-D grid of `T`, addressed `(x, y)` row-major, analogous to the
/// teacher's `RoomDataArray<T>` but sized to the map at hand rather than a
/// fixed 50x50 room.
#[derive(Clone, Serialize, Deserialize)]
pub struct Grid<T: Clone> {
    width: i32,
    height: i32,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: i32, height: i32, initial: T) -> Self {
        Grid {
            width,
            height,
            data: vec![initial; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> &T {
        let i = self.index(x, y);
        &self.data[i]
    }

    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32) -> &mut T {
        let i = self.index(x, y);
        &mut self.data[i]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(i, v)| {
            let x = (i as i32) % width;
            let y = (i as i32) / width;
            ((x, y), v)
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = ((i32, i32), &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(i, v)| {
            let x = (i as i32) % width;
            let y = (i as i32) / width;
            ((x, y), v)
        })
    }
}

/// An 8x8-pixel cell: the unit of walkability, altitude, and area segmentation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MiniTile {
    pub walkable: bool,
    /// Pixel distance to nearest sea minitile. 0 = sea, 1 = transient
    /// sea-or-lake marker, >1 = terrain/lake.
    pub altitude: i16,
    /// 0 = sea/lake unreachable; >0 = concrete area; <0 = too-small walkable
    /// fragment; `BLOCKED_AREA_ID` = blocked by a blocking neutral.
    pub area_id: i16,
}

impl Default for MiniTile {
    fn default() -> Self {
        MiniTile {
            walkable: false,
            altitude: SEA_OR_LAKE_ALTITUDE,
            area_id: 0,
        }
    }
}

impl MiniTile {
    #[inline]
    pub fn is_sea(&self) -> bool {
        self.altitude == SEA_ALTITUDE
    }

    #[inline]
    pub fn is_lake(&self) -> bool {
        !self.walkable && self.altitude > SEA_ALTITUDE
    }

    #[inline]
    pub fn is_terrain(&self) -> bool {
        self.walkable
    }

    #[inline]
    pub fn has_area(&self) -> bool {
        self.area_id > 0
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.area_id == BLOCKED_AREA_ID
    }
}

/// A 32x32-pixel cell, covering 4x4 minitiles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tile {
    pub buildable: bool,
    pub doodad: bool,
    pub ground_height: GroundHeightFlags,
    /// 0 if no sub-minitile belongs to any area; the unique sub-area id if
    /// all walkable sub-minitiles agree; -1 if they disagree (spec 3).
    pub area_id: i16,
    /// Minimum altitude over the 16 sub-minitiles.
    pub min_altitude: i16,
    /// Index into the neutral registry of the bottom of the stack occupying
    /// this tile, if any.
    pub neutral: Option<usize>,
}

impl Default for Tile {
    fn default() -> Self {
        Tile {
            buildable: false,
            doodad: false,
            ground_height: GroundHeightFlags::LOW,
            area_id: 0,
            min_altitude: 0,
            neutral: None,
        }
    }
}

/// Tags a tile-space aggregate area id as ambiguous (sub-minitiles disagree).
pub const AMBIGUOUS_TILE_AREA: i16 = -1;

/// The minitile and tile grids, plus the raw walkability/buildability the
/// grids were seeded from. Owned by `Map` after ingestion (spec 4.1).
#[derive(Clone, Serialize, Deserialize)]
pub struct MapGrid {
    pub minitiles: Grid<MiniTile>,
    pub tiles: Grid<Tile>,
    tile_width: i32,
    tile_height: i32,
}

impl MapGrid {
    pub fn new(tile_width: i32, tile_height: i32) -> Self {
        let walk_width = tile_width * MINITILES_PER_TILE;
        let walk_height = tile_height * MINITILES_PER_TILE;
        MapGrid {
            minitiles: Grid::new(walk_width, walk_height, MiniTile::default()),
            tiles: Grid::new(tile_width, tile_height, Tile::default()),
            tile_width,
            tile_height,
        }
    }

    #[inline]
    pub fn tile_width(&self) -> i32 {
        self.tile_width
    }

    #[inline]
    pub fn tile_height(&self) -> i32 {
        self.tile_height
    }

    #[inline]
    pub fn walk_width(&self) -> i32 {
        self.minitiles.width()
    }

    #[inline]
    pub fn walk_height(&self) -> i32 {
        self.minitiles.height()
    }

    #[inline]
    pub fn minitile_in_bounds(&self, p: WalkPosition) -> bool {
        self.minitiles.in_bounds(p.x, p.y)
    }

    #[inline]
    pub fn tile_in_bounds(&self, p: TilePosition) -> bool {
        self.tiles.in_bounds(p.x, p.y)
    }

    #[inline]
    pub fn get_minitile(&self, p: WalkPosition) -> &MiniTile {
        self.minitiles.get(p.x, p.y)
    }

    #[inline]
    pub fn get_minitile_mut(&mut self, p: WalkPosition) -> &mut MiniTile {
        self.minitiles.get_mut(p.x, p.y)
    }

    #[inline]
    pub fn get_tile(&self, p: TilePosition) -> &Tile {
        self.tiles.get(p.x, p.y)
    }

    #[inline]
    pub fn get_tile_mut(&mut self, p: TilePosition) -> &mut Tile {
        self.tiles.get_mut(p.x, p.y)
    }

    /// Recompute the aggregate `Tile.area_id` (spec 3) for every minitile's
    /// owning tile. Called once after area building, and again over a single
    /// footprint when a blocking neutral is destroyed (spec 4.9).
    pub fn recompute_tile_area_ids(&mut self) {
        for ty in 0..self.tile_height {
            for tx in 0..self.tile_width {
                self.recompute_tile_area_id(TilePosition::new(tx, ty));
            }
        }
    }

    /// Recompute the aggregate area id for a single tile.
    ///
    /// Open question (spec 9): when sub-minitiles span >=2 areas the source
    /// returns the first-seen positive id in scan order, not a majority
    /// vote. That behavior is preserved here deliberately.
    pub fn recompute_tile_area_id(&mut self, tp: TilePosition) {
        let base = tp.to_walk_position();
        let mut first_seen: Option<i16> = None;
        let mut disagreement = false;
        let mut min_altitude = i16::MAX;

        for dy in 0..MINITILES_PER_TILE {
            for dx in 0..MINITILES_PER_TILE {
                let mt = self
                    .minitiles
                    .get(base.x + dx, base.y + dy);
                if mt.altitude < min_altitude {
                    min_altitude = mt.altitude;
                }
                if mt.walkable && mt.area_id > 0 {
                    match first_seen {
                        None => first_seen = Some(mt.area_id),
                        Some(seen) if seen != mt.area_id => disagreement = true,
                        _ => {}
                    }
                }
            }
        }

        let tile = self.tiles.get_mut(tp.x, tp.y);
        tile.min_altitude = if min_altitude == i16::MAX {
            0
        } else {
            min_altitude
        };
        tile.area_id = if disagreement {
            AMBIGUOUS_TILE_AREA
        } else {
            first_seen.unwrap_or(0)
        };
    }
}

use crate::position::MINITILES_PER_TILE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_roundtrip_get_set() {
        let mut g: Grid<i32> = Grid::new(4, 3, 0);
        g.set(2, 1, 42);
        assert_eq!(*g.get(2, 1), 42);
        assert_eq!(*g.get(0, 0), 0);
    }

    #[test]
    fn minitile_default_is_unwalkable_sea_or_lake() {
        let mt = MiniTile::default();
        assert!(!mt.walkable);
        assert_eq!(mt.altitude, SEA_OR_LAKE_ALTITUDE);
        assert_eq!(mt.area_id, 0);
    }

    #[test]
    fn tile_area_aggregation_first_seen_on_disagreement() {
        let mut grid = MapGrid::new(2, 2);
        let tp = TilePosition::new(0, 0);
        let base = tp.to_walk_position();
        {
            let mt = grid.get_minitile_mut(base);
            mt.walkable = true;
            mt.area_id = 5;
        }
        {
            let mt = grid.get_minitile_mut(WalkPosition::new(base.x + 1, base.y));
            mt.walkable = true;
            mt.area_id = 7;
        }
        grid.recompute_tile_area_id(tp);
        assert_eq!(grid.get_tile(tp).area_id, AMBIGUOUS_TILE_AREA);
    }

    #[test]
    fn tile_area_aggregation_unanimous() {
        let mut grid = MapGrid::new(2, 2);
        let tp = TilePosition::new(1, 1);
        let base = tp.to_walk_position();
        for dy in 0..4 {
            for dx in 0..4 {
                let mt = grid.get_minitile_mut(WalkPosition::new(base.x + dx, base.y + dy));
                mt.walkable = true;
                mt.area_id = 3;
            }
        }
        grid.recompute_tile_area_id(tp);
        assert_eq!(grid.get_tile(tp).area_id, 3);
    }
}
