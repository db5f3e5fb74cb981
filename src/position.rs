//! The three position scales used throughout the analyzer.
//!
//! Brood War maps are addressed at three resolutions: pixels, minitiles
//! (8px, the walkability/altitude/area grid) and tiles (32px, the
//! buildability/ground-height grid; 4x4 minitiles per tile). Keeping these
//! as distinct newtypes -- rather than passing bare `i32` pairs around --
//! makes the scale of a coordinate part of its type instead of a comment.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Pixel-scale position (1px per unit).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Minitile-scale position (8px per unit). The unit used for walkability,
/// altitude, and area segmentation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Default)]
pub struct WalkPosition {
    pub x: i32,
    pub y: i32,
}

/// Tile-scale position (32px per unit). The unit used for buildability and
/// most placement queries.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Default)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

/// Minitiles per tile, on one axis.
pub const MINITILES_PER_TILE: i32 = 4;
/// Pixels per minitile.
pub const PIXELS_PER_MINITILE: i32 = 8;
/// Pixels per tile.
pub const PIXELS_PER_TILE: i32 = 32;

macro_rules! position_impl {
    ($t:ty) => {
        impl $t {
            #[inline]
            pub fn new(x: i32, y: i32) -> Self {
                Self { x, y }
            }

            /// Chebyshev ("queen-wise") distance: `max(|dx|, |dy|)`.
            #[inline]
            pub fn queen_wise_distance(self, other: Self) -> i32 {
                (self.x - other.x).abs().max((self.y - other.y).abs())
            }
        }

        impl Add for $t {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self::new(self.x + rhs.x, self.y + rhs.y)
            }
        }

        impl Sub for $t {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self::new(self.x - rhs.x, self.y - rhs.y)
            }
        }
    };
}

position_impl!(Position);
position_impl!(WalkPosition);
position_impl!(TilePosition);

impl WalkPosition {
    #[inline]
    pub fn to_position(self) -> Position {
        Position::new(self.x * PIXELS_PER_MINITILE, self.y * PIXELS_PER_MINITILE)
    }

    #[inline]
    pub fn to_tile_position(self) -> TilePosition {
        TilePosition::new(
            self.x.div_euclid(MINITILES_PER_TILE),
            self.y.div_euclid(MINITILES_PER_TILE),
        )
    }

    /// Euclidean pixel distance to another minitile, as an `f64`.
    #[inline]
    pub fn pixel_distance(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64 * PIXELS_PER_MINITILE as f64;
        let dy = (self.y - other.y) as f64 * PIXELS_PER_MINITILE as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl TilePosition {
    #[inline]
    pub fn to_position(self) -> Position {
        Position::new(self.x * PIXELS_PER_TILE, self.y * PIXELS_PER_TILE)
    }

    #[inline]
    pub fn to_walk_position(self) -> WalkPosition {
        WalkPosition::new(self.x * MINITILES_PER_TILE, self.y * MINITILES_PER_TILE)
    }
}

impl Position {
    #[inline]
    pub fn to_walk_position(self) -> WalkPosition {
        WalkPosition::new(
            self.x.div_euclid(PIXELS_PER_MINITILE),
            self.y.div_euclid(PIXELS_PER_MINITILE),
        )
    }

    #[inline]
    pub fn to_tile_position(self) -> TilePosition {
        TilePosition::new(
            self.x.div_euclid(PIXELS_PER_TILE),
            self.y.div_euclid(PIXELS_PER_TILE),
        )
    }

    #[inline]
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The 8 symmetric neighbour offsets, in the order BWEM-derived analyzers
/// conventionally walk them (N, NE, E, SE, S, SW, W, NW).
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// The 4 cardinal neighbour offsets (N, E, S, W).
pub const NEIGHBORS_4: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_to_tile_rounds_down() {
        assert_eq!(
            WalkPosition::new(7, 7).to_tile_position(),
            TilePosition::new(1, 1)
        );
        assert_eq!(
            WalkPosition::new(4, 0).to_tile_position(),
            TilePosition::new(1, 0)
        );
    }

    #[test]
    fn queen_wise_distance_is_chebyshev() {
        assert_eq!(
            TilePosition::new(0, 0).queen_wise_distance(TilePosition::new(3, 1)),
            3
        );
        assert_eq!(
            TilePosition::new(0, 0).queen_wise_distance(TilePosition::new(1, 5)),
            5
        );
    }

    #[test]
    fn round_trip_tile_walk_position() {
        let t = TilePosition::new(12, 34);
        assert_eq!(t.to_walk_position().to_tile_position(), t);
    }
}
