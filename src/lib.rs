//! A one-shot Brood War tile-map analyzer: derives Areas, ChokePoints and
//! Bases from a raw tile/minitile snapshot, and the all-pairs ChokePoint
//! distance/path matrices between them (spec 1, 2).
//!
//! `map::Map` is the query façade embedders reach for; everything else is
//! either data it owns (`area`, `chokepoint`, `base`, `grid`, `neutral`,
//! `position`) or the pipeline that fills it in once (`pipeline`).

pub mod area;
pub mod base;
pub mod chokepoint;
pub mod config;
pub mod error;
pub mod grid;
pub mod map;
pub mod neutral;
pub mod pipeline;
pub mod position;
pub mod source;

pub use area::Area;
pub use base::Base;
pub use chokepoint::{ChokeNode, ChokePoint};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use grid::{MapGrid, MiniTile, Tile};
pub use map::Map;
pub use neutral::{Neutral, NeutralKind, NeutralRegistry};
pub use position::{Position, TilePosition, WalkPosition};
pub use source::{MapDataSource, NeutralDescriptor, StaticMapSource};
