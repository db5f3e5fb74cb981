//! ChokePoint extraction (spec 4.6): buckets the raw area-building frontier
//! by unordered area pair, clusters each bucket into chokepoints under the
//! queen-wise cluster distance threshold, and selects the three
//! representative nodes (end1/middle/end2) per chokepoint. Also synthesizes
//! one pseudo-chokepoint per unordered area pair that a blocking neutral
//! separates.

use crate::area::{Area, FrontierEntry};
use crate::config::AnalysisConfig;
use crate::grid::MapGrid;
use crate::neutral::NeutralRegistry;
use crate::position::WalkPosition;
use fnv::FnvHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One of the three representative nodes of a chokepoint's geometry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ChokeNode {
    End1,
    Middle,
    End2,
}

/// A frontier between two neighbouring areas (spec 3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChokePoint {
    pub index: usize,
    pub area_a: i16,
    pub area_b: i16,
    /// Non-empty, ordered by descending altitude, monotone along the frontier.
    pub geometry: Vec<WalkPosition>,
    pub end1: WalkPosition,
    pub middle: WalkPosition,
    pub end2: WalkPosition,
    /// `node -> area -> nearest walkable minitile of that area`, found by
    /// BFS. Nested rather than a single `(node, area)`-keyed map so the
    /// whole `ChokePoint` stays representable as JSON (a tuple key has no
    /// JSON object-key encoding; a unit enum variant and an integer both do).
    pub pos_in_area: FnvHashMap<ChokeNode, FnvHashMap<i16, WalkPosition>>,
    pub blocked: bool,
    /// Set only for pseudo-chokepoints (spec 3).
    pub blocking_neutral: Option<usize>,
}

impl ChokePoint {
    pub fn other_area(&self, area: i16) -> i16 {
        if area == self.area_a {
            self.area_b
        } else {
            self.area_a
        }
    }

    pub fn is_pseudo(&self) -> bool {
        self.blocking_neutral.is_some()
    }
}

/// Cluster a bucket's positions (already monotone descending in altitude,
/// spec 4.6) into one deque per chokepoint, under the queen-wise distance
/// threshold.
fn cluster_bucket(positions: &[WalkPosition], threshold: i32) -> Vec<VecDeque<WalkPosition>> {
    let mut clusters: Vec<VecDeque<WalkPosition>> = Vec::new();

    'next_position: for &p in positions {
        for cluster in clusters.iter_mut() {
            let front = *cluster.front().unwrap();
            let back = *cluster.back().unwrap();
            let d_front = p.queen_wise_distance(front);
            let d_back = p.queen_wise_distance(back);
            if d_front <= threshold || d_back <= threshold {
                if d_front < d_back {
                    cluster.push_front(p);
                } else {
                    cluster.push_back(p);
                }
                continue 'next_position;
            }
        }
        let mut fresh = VecDeque::new();
        fresh.push_back(p);
        clusters.push(fresh);
    }

    clusters
}

/// Every chokepoint index touching `area.id` (as either `area_a` or
/// `area_b`), deduplicated. Shared by chokepoint distance computation
/// (spec 4.7) and the `Map::get_path` façade (spec 4.9).
pub fn chokepoints_of_area(area: &Area) -> Vec<usize> {
    area.neighbour_chokepoints
        .values()
        .flat_map(|v| v.iter().copied())
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Hill-climb from the geometry's middle index, moving one step at a time
/// toward whichever adjacent entry has a strictly higher altitude, until
/// neither neighbour is higher (spec 4.6).
fn hill_climb_middle(geometry: &[WalkPosition], grid: &MapGrid) -> usize {
    let mut idx = geometry.len() / 2;
    loop {
        let cur = grid.get_minitile(geometry[idx]).altitude;
        if idx > 0 && grid.get_minitile(geometry[idx - 1]).altitude > cur {
            idx -= 1;
            continue;
        }
        if idx + 1 < geometry.len() && grid.get_minitile(geometry[idx + 1]).altitude > cur {
            idx += 1;
            continue;
        }
        break;
    }
    idx
}

/// BFS (8-connected) from `start` for the nearest walkable minitile whose
/// owning tile has no neutral and, if `target_area` is given, whose area id
/// matches it (otherwise the first minitile with any positive area id).
/// Passes through `BLOCKED_AREA_ID` minitiles when `allow_blocked` is set
/// (spec 4.6: true for pseudo-chokepoint construction).
fn nearest_matching_minitile(
    grid: &MapGrid,
    start: WalkPosition,
    target_area: Option<i16>,
    allow_blocked: bool,
) -> Option<(WalkPosition, i16)> {
    let accept = |p: WalkPosition| -> Option<i16> {
        if !grid.minitile_in_bounds(p) {
            return None;
        }
        let mt = grid.get_minitile(p);
        if !mt.walkable || mt.area_id <= 0 {
            return None;
        }
        if let Some(target) = target_area {
            if mt.area_id != target {
                return None;
            }
        }
        if grid.get_tile(p.to_tile_position()).neutral.is_some() {
            return None;
        }
        Some(mt.area_id)
    };

    if let Some(area) = accept(start) {
        return Some((start, area));
    }

    let mut visited = fnv::FnvHashSet::default();
    visited.insert(start);
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(p) = queue.pop_front() {
        for (dx, dy) in crate::position::NEIGHBORS_8 {
            let np = WalkPosition::new(p.x + dx, p.y + dy);
            if !grid.minitile_in_bounds(np) || visited.contains(&np) {
                continue;
            }
            visited.insert(np);

            if let Some(area) = accept(np) {
                return Some((np, area));
            }

            let mt = grid.get_minitile(np);
            let passable = mt.walkable || (allow_blocked && mt.is_blocked());
            if passable {
                queue.push_back(np);
            }
        }
    }
    None
}

fn build_pos_in_area(
    grid: &MapGrid,
    end1: WalkPosition,
    middle: WalkPosition,
    end2: WalkPosition,
    area_a: i16,
    area_b: i16,
    allow_blocked: bool,
) -> FnvHashMap<ChokeNode, FnvHashMap<i16, WalkPosition>> {
    let mut map: FnvHashMap<ChokeNode, FnvHashMap<i16, WalkPosition>> = FnvHashMap::default();
    for (node, pos) in [
        (ChokeNode::End1, end1),
        (ChokeNode::Middle, middle),
        (ChokeNode::End2, end2),
    ] {
        for area in [area_a, area_b] {
            if let Some((found, _)) = nearest_matching_minitile(grid, pos, Some(area), allow_blocked) {
                map.entry(node).or_default().insert(area, found);
            }
        }
    }
    map
}

/// Build every regular chokepoint from the collapsed area-building frontier
/// and every pseudo-chokepoint from blocking neutrals, updating each
/// `Area.neighbour_chokepoints` map in place.
pub fn extract_chokepoints(
    grid: &MapGrid,
    registry: &NeutralRegistry,
    areas: &mut [Area],
    frontier: &[FrontierEntry],
    config: &AnalysisConfig,
) -> Vec<ChokePoint> {
    let mut buckets: FnvHashMap<(i16, i16), Vec<WalkPosition>> = FnvHashMap::default();
    for entry in frontier {
        let key = (entry.area_a.min(entry.area_b), entry.area_a.max(entry.area_b));
        buckets.entry(key).or_default().push(entry.pos);
    }

    let mut chokepoints = Vec::new();

    let mut bucket_keys: Vec<(i16, i16)> = buckets.keys().copied().collect();
    bucket_keys.sort();

    for key in bucket_keys {
        let positions = &buckets[&key];
        let clusters = cluster_bucket(positions, config.cluster_distance_threshold);

        for cluster in clusters {
            let geometry: Vec<WalkPosition> = cluster.into_iter().collect();
            let middle_idx = hill_climb_middle(&geometry, grid);
            let end1 = geometry[0];
            let end2 = *geometry.last().unwrap();
            let middle = geometry[middle_idx];

            let pos_in_area = build_pos_in_area(grid, end1, middle, end2, key.0, key.1, false);

            let index = chokepoints.len();
            chokepoints.push(ChokePoint {
                index,
                area_a: key.0,
                area_b: key.1,
                geometry,
                end1,
                middle,
                end2,
                pos_in_area,
                blocked: false,
                blocking_neutral: None,
            });

            for area_id in [key.0, key.1] {
                if let Some(area) = areas.get_mut((area_id - 1) as usize) {
                    area.neighbour_chokepoints.entry(area_id_other(key, area_id)).or_default().push(index);
                }
            }
        }
    }

    for root_index in registry.stack_roots() {
        let neutral = registry.get(root_index);
        if !neutral.blocking {
            continue;
        }

        let center = neutral.center_position().to_walk_position();
        let Some((geometry_pos, _)) = nearest_matching_minitile(grid, center, None, true) else {
            log::warn!("blocking neutral at {:?} has no reachable minitile for its pseudo-chokepoint", neutral.top_left);
            continue;
        };

        let mut door_areas: Vec<i16> = Vec::new();
        for &door in &neutral.blocked_areas {
            if let Some((_, area)) = nearest_matching_minitile(grid, door, None, true) {
                if !door_areas.contains(&area) {
                    door_areas.push(area);
                }
            }
        }

        for i in 0..door_areas.len() {
            for j in (i + 1)..door_areas.len() {
                let a = door_areas[i].min(door_areas[j]);
                let b = door_areas[i].max(door_areas[j]);

                let pos_in_area =
                    build_pos_in_area(grid, geometry_pos, geometry_pos, geometry_pos, a, b, true);

                let index = chokepoints.len();
                chokepoints.push(ChokePoint {
                    index,
                    area_a: a,
                    area_b: b,
                    geometry: vec![geometry_pos],
                    end1: geometry_pos,
                    middle: geometry_pos,
                    end2: geometry_pos,
                    pos_in_area,
                    blocked: true,
                    blocking_neutral: Some(root_index),
                });

                for area_id in [a, b] {
                    if let Some(area) = areas.get_mut((area_id - 1) as usize) {
                        area.neighbour_chokepoints.entry(area_id_other((a, b), area_id)).or_default().push(index);
                    }
                }
            }
        }
    }

    log::debug!("chokepoint extraction: {} chokepoints", chokepoints.len());
    chokepoints
}

fn area_id_other(pair: (i16, i16), one: i16) -> i16 {
    if pair.0 == one {
        pair.1
    } else {
        pair.0
    }
}
