//! Grid ingestion (spec 4.1): load walkability/buildability/ground height
//! from the `MapDataSource` snapshot, enforce the `buildable => walkable`
//! invariant, and register neutral units.

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::MapGrid;
use crate::neutral::{Neutral, NeutralRegistry};
use crate::position::{TilePosition, WalkPosition, MINITILES_PER_TILE, NEIGHBORS_8};
use crate::source::{ground_height_flags, MapDataSource, SPECIAL_RIGHT_PIT_DOOR, ZERG_EGG};

/// Build the minitile/tile grids and the neutral registry from a snapshot
/// (spec 4.1, 6). Returns `InvalidDimensions` for a non-positive map and
/// logs (never rejects) stacking mismatches per spec 7.2.
pub fn ingest(source: &dyn MapDataSource) -> AnalysisResult<(MapGrid, NeutralRegistry)> {
    let (tile_w, tile_h) = source.tile_size();
    if tile_w <= 0 || tile_h <= 0 {
        return Err(AnalysisError::InvalidDimensions {
            width: tile_w,
            height: tile_h,
        });
    }

    let mut grid = MapGrid::new(tile_w, tile_h);

    // Raw walkability, before the unwalkable-neighbour forcing pass.
    let walk_w = grid.walk_width();
    let walk_h = grid.walk_height();
    let mut raw_walkable = vec![false; (walk_w * walk_h) as usize];
    for y in 0..walk_h {
        for x in 0..walk_w {
            let p = WalkPosition::new(x, y);
            let v = source.is_walkable(p);
            raw_walkable[(y * walk_w + x) as usize] = v;
            grid.get_minitile_mut(p).walkable = v;
        }
    }

    // Force unwalkable on all 8 neighbours of every originally-unwalkable minitile.
    for y in 0..walk_h {
        for x in 0..walk_w {
            if raw_walkable[(y * walk_w + x) as usize] {
                continue;
            }
            for (dx, dy) in NEIGHBORS_8 {
                let nx = x + dx;
                let ny = y + dy;
                if grid.minitile_in_bounds(WalkPosition::new(nx, ny)) {
                    grid.get_minitile_mut(WalkPosition::new(nx, ny)).walkable = false;
                }
            }
        }
    }

    // Tile buildability and ground height; buildable tiles force all 16
    // sub-minitiles walkable (buildable => walkable, spec 4.1).
    for ty in 0..tile_h {
        for tx in 0..tile_w {
            let tp = TilePosition::new(tx, ty);
            let buildable = source.is_buildable(tp);
            let raw_height = source.ground_height(tp);
            let (height, doodad) = ground_height_flags(raw_height);

            {
                let tile = grid.get_tile_mut(tp);
                tile.buildable = buildable;
                tile.doodad = doodad;
                tile.ground_height = height;
            }

            if buildable {
                let base = tp.to_walk_position();
                for dy in 0..MINITILES_PER_TILE {
                    for dx in 0..MINITILES_PER_TILE {
                        grid.get_minitile_mut(WalkPosition::new(base.x + dx, base.y + dy))
                            .walkable = true;
                    }
                }
            }
        }
    }

    let registry = ingest_neutrals(source, &mut grid);

    Ok((grid, registry))
}

fn ingest_neutrals(source: &dyn MapDataSource, grid: &mut MapGrid) -> NeutralRegistry {
    let mut registry = NeutralRegistry::new();
    let mut pit_door_top_lefts: Vec<TilePosition> = Vec::new();
    let mut pending_eggs: Vec<(usize, TilePosition)> = Vec::new();

    for descriptor in source.static_neutrals() {
        if descriptor.unit_type == ZERG_EGG {
            // Deferred: only ingested if it wraps a Pit-Door special building
            // (spec 6), checked once every other neutral has been ingested.
            pending_eggs.push((pending_eggs.len(), descriptor.top_left));
            continue;
        }

        let mut top_left = descriptor.top_left;
        if descriptor.unit_type == SPECIAL_RIGHT_PIT_DOOR {
            top_left = TilePosition::new(top_left.x + 1, top_left.y);
            pit_door_top_lefts.push(top_left);
        }

        let neutral = Neutral::new(
            descriptor.kind,
            descriptor.unit_type.clone(),
            top_left,
            descriptor.size,
            descriptor.initial_amount,
        );
        stamp_and_add(grid, &mut registry, neutral);
    }

    for (_, egg_top_left) in pending_eggs {
        if pit_door_top_lefts.contains(&egg_top_left) {
            let neutral = Neutral::new(
                NeutralKind::StaticBuilding,
                ZERG_EGG,
                egg_top_left,
                TilePosition::new(1, 1),
                None,
            );
            stamp_and_add(grid, &mut registry, neutral);
        } else {
            log::debug!(
                "ignoring Zerg_Egg at {:?}: does not wrap a pit-door special building",
                egg_top_left
            );
        }
    }

    registry
}

fn stamp_and_add(grid: &mut MapGrid, registry: &mut NeutralRegistry, neutral: Neutral) {
    let footprint: Vec<TilePosition> = neutral.footprint().collect();
    let top_left = neutral.top_left;

    match registry.add(neutral) {
        Some(index) => {
            // Only stamp `Tile.neutral` for the bottom of the stack (spec 3).
            let is_root = registry
                .stack_roots()
                .iter()
                .any(|&root| root == index);
            if is_root {
                for tp in footprint {
                    if grid.tile_in_bounds(tp) {
                        grid.get_tile_mut(tp).neutral = Some(index);
                    }
                }
            }
        }
        None => {
            log::warn!("dropped neutral at {:?}: stacking mismatch (spec 7.2)", top_left);
        }
    }
}

use crate::neutral::NeutralKind;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::TilePosition;

    #[test]
    fn rejects_nonpositive_dimensions() {
        let src = crate::source::StaticMapSource::new(0, 4);
        let err = ingest(&src).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDimensions { .. }));
    }

    #[test]
    fn buildable_forces_walkable() {
        let mut src = crate::source::StaticMapSource::new(4, 4);
        let tp = TilePosition::new(1, 1);
        src.set_buildable(tp, true);
        let base = tp.to_walk_position();
        src.set_walkable(base, false);
        let (grid, _) = ingest(&src).unwrap();
        assert!(grid.get_minitile(base).walkable);
    }

    #[test]
    fn unwalkable_forces_neighbours_unwalkable() {
        let mut src = crate::source::StaticMapSource::new(4, 4);
        let center = WalkPosition::new(8, 8);
        src.set_walkable(center, false);
        let (grid, _) = ingest(&src).unwrap();
        assert!(!grid.get_minitile(WalkPosition::new(9, 9)).walkable);
    }
}
