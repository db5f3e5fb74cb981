//! Blocking-neutral detection (spec 4.4): for each stack-root neutral,
//! determine whether it partitions its local neighbourhood into >= 2 "true
//! doors" -- sufficiently large walkable pockets -- and if so mark it (and
//! everything stacked on it) as `blocking`, stamping the blocked-area
//! sentinel onto its footprint so the area builder never merges across it.

use crate::config::AnalysisConfig;
use crate::grid::{MapGrid, BLOCKED_AREA_ID};
use crate::neutral::NeutralRegistry;
use crate::position::{TilePosition, WalkPosition, NEIGHBORS_4};
use fnv::FnvHashSet;
use std::collections::VecDeque;

fn occupied(grid: &MapGrid, p: WalkPosition) -> bool {
    grid.get_tile(p.to_tile_position()).neutral.is_some()
}

/// The minitiles forming a one-cell-thick ring directly around a tile-space
/// footprint, in map bounds, walkable, and not already occupied by another
/// neutral (spec 4.4 step 1).
fn outer_border(grid: &MapGrid, top_left: TilePosition, size: TilePosition) -> Vec<WalkPosition> {
    let wx0 = top_left.x * crate::position::MINITILES_PER_TILE;
    let wy0 = top_left.y * crate::position::MINITILES_PER_TILE;
    let wx1 = wx0 + size.x * crate::position::MINITILES_PER_TILE - 1;
    let wy1 = wy0 + size.y * crate::position::MINITILES_PER_TILE - 1;

    let mut border = Vec::new();
    for y in (wy0 - 1)..=(wy1 + 1) {
        for x in (wx0 - 1)..=(wx1 + 1) {
            let inside = x >= wx0 && x <= wx1 && y >= wy0 && y <= wy1;
            if inside {
                continue;
            }
            let p = WalkPosition::new(x, y);
            if !grid.minitile_in_bounds(p) {
                continue;
            }
            let mt = grid.get_minitile(p);
            if !mt.walkable || occupied(grid, p) {
                continue;
            }
            border.push(p);
        }
    }
    border
}

/// A minitile qualifies as part of a "door corridor" if it is walkable,
/// unoccupied, and 8-adjacent to a lake or to any neutral's footprint
/// (spec 4.4 step 2).
fn is_door_corridor(grid: &MapGrid, p: WalkPosition) -> bool {
    let mt = grid.get_minitile(p);
    if !mt.walkable || occupied(grid, p) {
        return false;
    }
    for (dx, dy) in crate::position::NEIGHBORS_8 {
        let np = WalkPosition::new(p.x + dx, p.y + dy);
        if !grid.minitile_in_bounds(np) {
            continue;
        }
        let nmt = grid.get_minitile(np);
        if nmt.is_lake() || occupied(grid, np) {
            return true;
        }
    }
    false
}

/// Cluster the border positions into doors by 4-flooding through the door
/// corridor (spec 4.4 step 2). Each resulting group is one door.
fn compute_doors(grid: &MapGrid, border: &[WalkPosition]) -> Vec<Vec<WalkPosition>> {
    let mut remaining: FnvHashSet<WalkPosition> = border.iter().copied().collect();
    let mut doors = Vec::new();

    while let Some(&seed) = remaining.iter().next() {
        let mut door = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(seed);
        remaining.remove(&seed);

        while let Some(p) = queue.pop_front() {
            door.push(p);
            for (dx, dy) in NEIGHBORS_4 {
                let np = WalkPosition::new(p.x + dx, p.y + dy);
                if remaining.contains(&np) && is_door_corridor(grid, np) {
                    remaining.remove(&np);
                    queue.push_back(np);
                }
            }
        }
        doors.push(door);
    }
    doors
}

/// 4-flood through free (walkable, unoccupied) minitiles starting from a
/// door's positions, capped at `limit` visited cells. A door is "true" if
/// the flood reaches the cap (spec 4.4 step 3).
fn door_is_true(grid: &MapGrid, door: &[WalkPosition], limit: u32) -> bool {
    let mut visited: FnvHashSet<WalkPosition> = FnvHashSet::default();
    let mut queue = VecDeque::new();
    for &p in door {
        if visited.insert(p) {
            queue.push_back(p);
        }
    }

    while let Some(p) = queue.pop_front() {
        if visited.len() as u32 >= limit {
            return true;
        }
        for (dx, dy) in NEIGHBORS_4 {
            let np = WalkPosition::new(p.x + dx, p.y + dy);
            if !grid.minitile_in_bounds(np) || visited.contains(&np) {
                continue;
            }
            let mt = grid.get_minitile(np);
            if mt.walkable && !occupied(grid, np) {
                visited.insert(np);
                queue.push_back(np);
            }
        }
    }
    visited.len() as u32 >= limit
}

/// Run blocking-neutral detection over every stack-root neutral, mutating
/// both the registry (`blocking`, `blocked_areas`) and the grid (stamping
/// `BLOCKED_AREA_ID` onto the footprint's walkable minitiles). The true-door
/// visit limits come from `config` (spec 4.4 step 3: 10 for buildings, 400
/// for minerals).
pub fn detect_blocking_neutrals(
    grid: &mut MapGrid,
    registry: &mut NeutralRegistry,
    config: &AnalysisConfig,
) -> u32 {
    let mut blocking_count = 0u32;

    for root_index in registry.stack_roots() {
        let (top_left, size, is_building) = {
            let n = registry.get(root_index);
            (n.top_left, n.size, n.kind == crate::neutral::NeutralKind::StaticBuilding)
        };

        let border = outer_border(grid, top_left, size);
        if border.is_empty() {
            continue;
        }
        let doors = compute_doors(grid, &border);
        if doors.len() < 2 {
            continue;
        }

        let limit = if is_building {
            config.true_door_limit_building
        } else {
            config.true_door_limit_mineral
        };

        let true_doors: Vec<Vec<WalkPosition>> = doors
            .into_iter()
            .filter(|door| door_is_true(grid, door, limit))
            .collect();

        if true_doors.len() < 2 {
            continue;
        }

        blocking_count += 1;
        let representative_positions: Vec<WalkPosition> =
            true_doors.iter().filter_map(|d| d.first().copied()).collect();

        for stack_index in registry.stack_from(root_index) {
            let n = registry.get_mut(stack_index);
            n.blocking = true;
            n.blocked_areas = representative_positions.clone();
        }

        stamp_blocked_footprint(grid, top_left, size);
    }

    log::debug!("blocking detection: {} blocking neutrals", blocking_count);
    blocking_count
}

fn stamp_blocked_footprint(grid: &mut MapGrid, top_left: TilePosition, size: TilePosition) {
    let base = top_left.to_walk_position();
    let w = size.x * crate::position::MINITILES_PER_TILE;
    let h = size.y * crate::position::MINITILES_PER_TILE;
    for dy in 0..h {
        for dx in 0..w {
            let p = WalkPosition::new(base.x + dx, base.y + dy);
            if grid.minitile_in_bounds(p) && grid.get_minitile(p).walkable {
                grid.get_minitile_mut(p).area_id = BLOCKED_AREA_ID;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neutral::{Neutral, NeutralKind};

    /// A 2x2-tile building sitting across a corridor, open only to its left
    /// and right, must be detected as blocking with exactly two true doors.
    #[test]
    fn building_wall_splits_corridor_into_two_true_doors() {
        let mut grid = MapGrid::new(6, 6);
        for y in 8..16 {
            for x in 0..8 {
                grid.get_minitile_mut(WalkPosition::new(x, y)).walkable = true;
            }
            for x in 16..24 {
                grid.get_minitile_mut(WalkPosition::new(x, y)).walkable = true;
            }
        }

        let mut registry = NeutralRegistry::new();
        let neutral = Neutral::new(
            NeutralKind::StaticBuilding,
            "Terran_Barracks",
            TilePosition::new(2, 2),
            TilePosition::new(2, 2),
            None,
        );
        let idx = registry.add(neutral).unwrap();
        for ty in 2..4 {
            for tx in 2..4 {
                grid.get_tile_mut(TilePosition::new(tx, ty)).neutral = Some(idx);
            }
        }

        let config = AnalysisConfig::default();
        let count = detect_blocking_neutrals(&mut grid, &mut registry, &config);

        assert_eq!(count, 1);
        assert!(registry.get(idx).blocking);
        assert_eq!(registry.get(idx).blocked_areas.len(), 2);
        let footprint_center = WalkPosition::new(8, 8);
        assert_eq!(
            grid.get_minitile(WalkPosition::new(footprint_center.x - 1, footprint_center.y))
                .area_id,
            BLOCKED_AREA_ID
        );
    }

    /// A building standing alone in open terrain has a single, unbroken
    /// border ring -- one door, not blocking.
    #[test]
    fn isolated_building_in_open_field_is_not_blocking() {
        let mut grid = MapGrid::new(6, 6);
        for y in 0..24 {
            for x in 0..24 {
                grid.get_minitile_mut(WalkPosition::new(x, y)).walkable = true;
            }
        }

        let mut registry = NeutralRegistry::new();
        let neutral = Neutral::new(
            NeutralKind::StaticBuilding,
            "Terran_Barracks",
            TilePosition::new(2, 2),
            TilePosition::new(2, 2),
            None,
        );
        let idx = registry.add(neutral).unwrap();
        for ty in 2..4 {
            for tx in 2..4 {
                grid.get_tile_mut(TilePosition::new(tx, ty)).neutral = Some(idx);
            }
        }

        let config = AnalysisConfig::default();
        let count = detect_blocking_neutrals(&mut grid, &mut registry, &config);

        assert_eq!(count, 0);
        assert!(!registry.get(idx).blocking);
    }
}
