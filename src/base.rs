//! Base placement output (spec 3, 4.8): a suggested command-center tile
//! position in some area with resources assigned exclusively to it.

use crate::position::{Position, TilePosition};
use serde::{Deserialize, Serialize};

/// A suggested command-center location with its exclusively-assigned
/// resources (spec 3, 4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Base {
    pub id: usize,
    pub area_id: i16,
    /// Tile position of the command center's top-left corner.
    pub location: TilePosition,
    /// Pixel-space centre of the command-center footprint.
    pub center: Position,
    /// Neutral-registry indices of minerals assigned exclusively to this base.
    pub minerals: Vec<usize>,
    /// Neutral-registry indices of geysers assigned exclusively to this base.
    pub geysers: Vec<usize>,
    /// Low-amount minerals overlapping the location (spec 4.8 step 4).
    pub blocking_minerals: Vec<usize>,
    /// Whether a starting location was attached here (spec 4.9).
    pub starting: bool,
}
