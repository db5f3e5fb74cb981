//! Tunable policy constants (spec 4.2-4.8), gathered into one struct so
//! tests can perturb thresholds without patching source. `Default`
//! reproduces the literals from `spec.md` exactly -- these are load-bearing
//! (spec 4.3, 4.5: they fix frontier/area boundaries) and must not drift.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Sea/lake (spec 4.2): a component re-tags to lake if its minitile
    /// count is <= this value...
    pub lake_max_minitiles: u32,
    /// ...and it spans <= this many minitiles on both axes...
    pub lake_max_span: i32,
    /// ...and its bounding box is >= this many minitiles from every map edge.
    pub lake_min_edge_distance: i32,

    /// Blocking detection (spec 4.4): visit limit for a static building's door flood.
    pub true_door_limit_building: u32,
    /// Visit limit for a mineral's door flood.
    pub true_door_limit_mineral: u32,

    /// Area building (spec 4.5): minimum `TempArea` size to merge without question.
    pub merge_small_size: u32,
    /// Minimum highest-altitude to merge without question.
    pub merge_small_altitude: i16,
    /// Ratio threshold for the altitude-proportion merge tests.
    pub merge_altitude_ratio: f64,
    /// Tile radius around a starting-location-derived point that forces a merge.
    pub merge_start_location_radius: i32,
    /// Minimum `TempArea` size to become a real (positive-id) area.
    pub min_real_area_size: u32,

    /// ChokePoint extraction (spec 4.6): cluster distance threshold under Chebyshev metric.
    pub cluster_distance_threshold: i32,

    /// ChokePoint distances (spec 4.7): orthogonal and diagonal minitile edge weights.
    pub dijkstra_orthogonal_weight: i32,
    pub dijkstra_diagonal_weight: i32,

    /// Base placement (spec 4.8): minimum resource amounts to be considered "remaining".
    pub min_mineral_amount: i32,
    pub min_geyser_amount: i32,
    /// Command-center footprint size, in tiles (3x2 per spec 4.8 step 3).
    pub cc_size: i32,
    /// Extra clearance margin added around a resource footprint for the potential field.
    pub potential_field_margin: i32,
    /// Half-width of the "forbidden" clearance square stamped around each resource (7x7).
    pub resource_clearance_radius: i32,
    /// Minimum `initialAmount` for a mineral in a base's halo to block rather
    /// than merely register as a `blockingMineral`.
    pub blocking_mineral_amount_threshold: i32,
    /// Minimum tile distance between two bases in the same area.
    pub min_base_spacing_tiles: i32,
    /// Resource assignment radius, in pixels (10 tiles).
    pub resource_assignment_radius_px: i32,

    /// Starting-location attachment distance (spec 4.9), in queen-wise tiles.
    pub starting_location_attach_distance: i32,

    /// Whether `on_blocking_neutral_destroyed` re-runs the chokepoint
    /// distance/path computation automatically (spec 4.9, 3 scenario 3).
    pub auto_update_paths: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            lake_max_minitiles: 300,
            lake_max_span: 32,
            lake_min_edge_distance: 2,

            true_door_limit_building: 10,
            true_door_limit_mineral: 400,

            merge_small_size: 80,
            merge_small_altitude: 80,
            merge_altitude_ratio: 0.90,
            merge_start_location_radius: 3,
            min_real_area_size: 64,

            cluster_distance_threshold: 17, // floor(sqrt(300))

            dijkstra_orthogonal_weight: 10_000,
            dijkstra_diagonal_weight: 14_142,

            min_mineral_amount: 40,
            min_geyser_amount: 300,
            cc_size: 3,
            potential_field_margin: 10,
            resource_clearance_radius: 3,
            blocking_mineral_amount_threshold: 8,
            min_base_spacing_tiles: 10,
            resource_assignment_radius_px: 10 * crate::position::PIXELS_PER_TILE,

            starting_location_attach_distance: 3,

            auto_update_paths: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_distance_threshold_matches_floor_sqrt_300() {
        assert_eq!(AnalysisConfig::default().cluster_distance_threshold, 17);
        assert_eq!((300f64).sqrt().floor() as i32, 17);
    }
}
