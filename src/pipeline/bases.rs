//! Base placement (spec 4.8): per area, iteratively score command-center
//! candidates with a potential field built from remaining resources, pick
//! the best, validate it, and assign resources exclusively to it.
//!
//! The potential field is a sparse `FnvHashMap<TilePosition, i32>` rather
//! than a grid the size of the whole map: areas are typically a small
//! fraction of a map's tiles, and resources cluster tightly, so the
//! teacher's dense `RoomDataArray` convention (see `grid.rs`'s `Grid<T>`)
//! would waste far more than it saves here.

use crate::area::Area;
use crate::base::Base;
use crate::config::AnalysisConfig;
use crate::grid::MapGrid;
use crate::neutral::{Neutral, NeutralKind, NeutralRegistry};
use crate::pipeline::altitude::round_half_away_from_zero;
use crate::position::{Position, TilePosition};
use fnv::FnvHashMap;

/// Command-center footprint, in tiles (spec 4.8 step 3: "3x2 CC footprint").
const CC_WIDTH: i32 = 3;
const CC_HEIGHT: i32 = 2;

fn footprint_bounds(n: &Neutral) -> (TilePosition, TilePosition) {
    let max = TilePosition::new(n.top_left.x + n.size.x - 1, n.top_left.y + n.size.y - 1);
    (n.top_left, max)
}

fn rects_overlap(a_min: TilePosition, a_max: TilePosition, b_min: TilePosition, b_max: TilePosition) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

/// Pixel-space Euclidean distance from a point to the nearest point of a
/// tile-space rectangle (0 if the point lies inside it).
fn dist_point_to_tile_rect(p: Position, rect_min: TilePosition, rect_max: TilePosition) -> f64 {
    let rx0 = (rect_min.x * 32) as f64;
    let ry0 = (rect_min.y * 32) as f64;
    let rx1 = ((rect_max.x + 1) * 32) as f64;
    let ry1 = ((rect_max.y + 1) * 32) as f64;
    let cx = (p.x as f64).clamp(rx0, rx1);
    let cy = (p.y as f64).clamp(ry0, ry1);
    let dx = p.x as f64 - cx;
    let dy = p.y as f64 - cy;
    (dx * dx + dy * dy).sqrt()
}

/// Euclidean distance between two tile positions, in tile units.
fn tile_euclidean_distance(a: TilePosition, b: TilePosition) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Build the potential field over the tiles within reach of `remaining`
/// resources (spec 4.8 step 2), returning the field plus the candidate
/// search bounding box (the remaining resources' bounds expanded by
/// `cc_size + potential_field_margin`).
fn build_potential_field(
    registry: &NeutralRegistry,
    remaining: &[usize],
    config: &AnalysisConfig,
) -> (FnvHashMap<TilePosition, i32>, TilePosition, TilePosition) {
    let mut field: FnvHashMap<TilePosition, i32> = FnvHashMap::default();
    let mut bbox_min = TilePosition::new(i32::MAX, i32::MAX);
    let mut bbox_max = TilePosition::new(i32::MIN, i32::MIN);
    let expand = config.cc_size + config.potential_field_margin;

    for &idx in remaining {
        let n = registry.get(idx);
        let (rmin, rmax) = footprint_bounds(n);
        let fmin = TilePosition::new(rmin.x - expand, rmin.y - expand);
        let fmax = TilePosition::new(rmax.x + expand, rmax.y + expand);
        bbox_min.x = bbox_min.x.min(fmin.x);
        bbox_min.y = bbox_min.y.min(fmin.y);
        bbox_max.x = bbox_max.x.max(fmax.x);
        bbox_max.y = bbox_max.y.max(fmax.y);

        let weight_multiplier = if n.is_geyser() { 3 } else { 1 };
        for ty in fmin.y..=fmax.y {
            for tx in fmin.x..=fmax.x {
                let tp = TilePosition::new(tx, ty);
                let center = Position::new(tx * 32 + 16, ty * 32 + 16);
                let dist = dist_point_to_tile_rect(center, rmin, rmax);
                let raw = 10 + 3 - round_half_away_from_zero((dist + 16.0) / 32.0) as i32;
                let value = raw.max(0) * weight_multiplier;
                *field.entry(tp).or_insert(0) += value;
            }
        }
    }

    // Overwrite the clearance square around every remaining resource with
    // the forbidden sentinel (spec 4.8 step 2, after the additive pass).
    let half = config.resource_clearance_radius;
    for &idx in remaining {
        let n = registry.get(idx);
        let (rmin, rmax) = footprint_bounds(n);
        let cx = (rmin.x + rmax.x) / 2;
        let cy = (rmin.y + rmax.y) / 2;
        for ty in (cy - half)..=(cy + half) {
            for tx in (cx - half)..=(cx + half) {
                field.insert(TilePosition::new(tx, ty), -1);
            }
        }
    }

    (field, bbox_min, bbox_max)
}

/// Score a candidate CC top-left (spec 4.8 step 3). `None` if any sub-tile
/// is non-buildable, forbidden, belongs to a different area, or holds a
/// static building.
fn score_candidate(
    grid: &MapGrid,
    registry: &NeutralRegistry,
    field: &FnvHashMap<TilePosition, i32>,
    area_id: i16,
    top_left: TilePosition,
) -> Option<i32> {
    let mut sum = 0i32;
    for dy in 0..CC_HEIGHT {
        for dx in 0..CC_WIDTH {
            let tp = TilePosition::new(top_left.x + dx, top_left.y + dy);
            if !grid.tile_in_bounds(tp) {
                return None;
            }
            let tile = grid.get_tile(tp);
            if !tile.buildable || tile.area_id != area_id {
                return None;
            }
            if let Some(neutral_idx) = tile.neutral {
                if registry.get(neutral_idx).kind == NeutralKind::StaticBuilding {
                    return None;
                }
            }
            let value = field.get(&tp).copied().unwrap_or(0);
            if value < 0 {
                return None;
            }
            sum += value;
        }
    }
    Some(sum)
}

/// Run base placement over every area (spec 4.8). Mutates `areas[*].bases`
/// with indices into the returned `Vec<Base>`.
pub fn place_bases(
    grid: &MapGrid,
    registry: &NeutralRegistry,
    areas: &mut [Area],
    config: &AnalysisConfig,
) -> Vec<Base> {
    let mut bases: Vec<Base> = Vec::new();

    for area_idx in 0..areas.len() {
        let area_id = areas[area_idx].id;

        let mut remaining: Vec<usize> = Vec::new();
        for &m in &areas[area_idx].minerals {
            if registry.get(m).initial_amount.unwrap_or(0) >= config.min_mineral_amount {
                remaining.push(m);
            }
        }
        for &g in &areas[area_idx].geysers {
            if registry.get(g).initial_amount.unwrap_or(0) >= config.min_geyser_amount {
                remaining.push(g);
            }
        }

        loop {
            if remaining.is_empty() {
                break;
            }

            let (field, bbox_min, bbox_max) = build_potential_field(registry, &remaining, config);

            let mut best: Option<(TilePosition, i32)> = None;
            let mut ty = bbox_min.y;
            while ty + CC_HEIGHT - 1 <= bbox_max.y {
                let mut tx = bbox_min.x;
                while tx + CC_WIDTH - 1 <= bbox_max.x {
                    let top_left = TilePosition::new(tx, ty);
                    if let Some(score) = score_candidate(grid, registry, &field, area_id, top_left) {
                        if best.map(|(_, s)| score > s).unwrap_or(true) {
                            best = Some((top_left, score));
                        }
                    }
                    tx += 1;
                }
                ty += 1;
            }

            let Some((candidate, score)) = best else {
                break;
            };
            if score <= 0 {
                break;
            }

            let clearance = config.resource_clearance_radius;
            let halo_min = TilePosition::new(candidate.x - clearance, candidate.y - clearance);
            let halo_max = TilePosition::new(
                candidate.x + CC_WIDTH - 1 + clearance,
                candidate.y + CC_HEIGHT - 1 + clearance,
            );

            let mut blocking_minerals: Vec<usize> = Vec::new();
            let mut rejected = false;
            for &idx in &remaining {
                let n = registry.get(idx);
                let (rmin, rmax) = footprint_bounds(n);
                if !rects_overlap(rmin, rmax, halo_min, halo_max) {
                    continue;
                }
                if n.is_geyser() {
                    rejected = true;
                    break;
                }
                if n.initial_amount.unwrap_or(0) > config.blocking_mineral_amount_threshold {
                    rejected = true;
                    break;
                }
                blocking_minerals.push(idx);
            }
            if rejected {
                break;
            }

            let too_close = areas[area_idx].bases.iter().any(|&base_idx| {
                let existing = &bases[base_idx];
                let rounded =
                    round_half_away_from_zero(tile_euclidean_distance(candidate, existing.location));
                (rounded as i32) < config.min_base_spacing_tiles
            });
            if too_close {
                break;
            }

            let center = Position::new(
                candidate.x * 32 + (CC_WIDTH * 32) / 2,
                candidate.y * 32 + (CC_HEIGHT * 32) / 2,
            );

            let mut minerals = Vec::new();
            let mut geysers = Vec::new();
            let mut assigned = Vec::new();
            for &idx in &remaining {
                let n = registry.get(idx);
                let (rmin, rmax) = footprint_bounds(n);
                let dist = dist_point_to_tile_rect(center, rmin, rmax);
                if dist + 2.0 <= config.resource_assignment_radius_px as f64 {
                    if n.is_mineral() {
                        minerals.push(idx);
                    } else {
                        geysers.push(idx);
                    }
                    assigned.push(idx);
                }
            }

            let base_id = bases.len();
            bases.push(Base {
                id: base_id,
                area_id,
                location: candidate,
                center,
                minerals,
                geysers,
                blocking_minerals,
                starting: false,
            });
            areas[area_idx].bases.push(base_id);

            remaining.retain(|idx| !assigned.contains(idx));
        }
    }

    log::debug!("base placement: {} bases placed", bases.len());
    bases
}
