//! The one-shot analysis pipeline (spec 2, 5): ingestion, sea/lake
//! classification, altitude, blocking detection, area building, chokepoint
//! extraction, chokepoint distances/paths, and base placement, run in that
//! order to completion. There are no suspension points (spec 5) -- unlike
//! the teacher crate's tick-based `PlanningState` (budgeted, resumable
//! across game ticks), this pipeline is a single synchronous call: the
//! whole point of a one-shot analyzer is that `Initialize` either finishes
//! or it doesn't run at all.

pub mod altitude;
pub mod bases;
pub mod blocking;
pub mod distances;
pub mod ingest;
pub mod sealake;

use crate::area::Area;
use crate::base::Base;
use crate::chokepoint::ChokePoint;
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::grid::MapGrid;
use crate::neutral::NeutralRegistry;
use crate::pipeline::distances::DistanceMatrices;
use crate::position::TilePosition;
use crate::source::MapDataSource;

/// Everything produced by running the pipeline once (spec 2, 9): the grid,
/// the neutral registry, and the Area/ChokePoint/Base graph with its
/// distance matrices. `Map` (in `crate::map`) wraps this as the query
/// façade's backing store.
pub struct AnalysisResultData {
    pub grid: MapGrid,
    pub registry: NeutralRegistry,
    pub areas: Vec<Area>,
    pub chokepoints: Vec<ChokePoint>,
    pub matrices: DistanceMatrices,
    pub bases: Vec<Base>,
}

/// Run the full pipeline against a snapshot (spec 4.1-4.8). `start_locations`
/// feeds both the area-building merge predicate (spec 4.5) and, separately,
/// `Map::find_bases_for_starting_locations` (spec 4.9) once this returns.
pub fn analyze(source: &dyn MapDataSource, config: &AnalysisConfig) -> AnalysisResult<AnalysisResultData> {
    let (mut grid, mut registry) = ingest::ingest(source)?;

    let start_locations: Vec<TilePosition> = source.start_locations().to_vec();

    sealake::classify_sea_and_lakes(&mut grid, config);
    altitude::compute_altitude(&mut grid);
    blocking::detect_blocking_neutrals(&mut grid, &mut registry, config);

    let (mut areas, frontier) = crate::area::build_areas(&mut grid, config, &start_locations);

    assign_resources_to_areas(&grid, &registry, &mut areas);

    let chokepoints = crate::chokepoint::extract_chokepoints(&grid, &registry, &mut areas, &frontier, config);

    let matrices = distances::compute_chokepoint_distances(&grid, &mut areas, &chokepoints, config);

    let bases = bases::place_bases(&grid, &registry, &mut areas, config);

    log::debug!(
        "analysis complete: {} areas, {} chokepoints, {} bases",
        areas.len(),
        chokepoints.len(),
        bases.len()
    );

    Ok(AnalysisResultData {
        grid,
        registry,
        areas,
        chokepoints,
        matrices,
        bases,
    })
}

/// Attach every mineral/geyser to the area owning its top-left tile (spec 9:
/// `mainArea` is the first positive area id seen, which for a resource's
/// single footprint tile is simply that tile's aggregate area id).
fn assign_resources_to_areas(grid: &MapGrid, registry: &NeutralRegistry, areas: &mut [Area]) {
    for (idx, neutral) in registry.iter() {
        if !neutral.is_resource() {
            continue;
        }
        let area_id = grid.get_tile(neutral.top_left).area_id;
        if area_id <= 0 {
            continue;
        }
        let Some(area) = areas.get_mut((area_id - 1) as usize) else {
            continue;
        };
        if neutral.is_mineral() {
            area.minerals.push(idx);
        } else {
            area.geysers.push(idx);
        }
    }
}
