//! The top-level query façade (spec 4.9). `Map` is an explicit owning value
//! -- there is no embedder-visible global singleton, unlike the teacher
//! crate's per-room `RoomDataArray`s reached through the game's room cache.
//! `Map::new` starts uninitialized; `initialize` runs the one-shot pipeline
//! (spec 2, 5) and every other method returns `AnalysisError::Uninitialized`
//! until it has completed.

use crate::area::Area;
use crate::base::Base;
use crate::chokepoint::{chokepoints_of_area, ChokeNode, ChokePoint};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::{MapGrid, MiniTile, Tile};
use crate::neutral::NeutralRegistry;
use crate::pipeline::{self, distances::DistanceMatrices};
use crate::position::{Position, TilePosition, WalkPosition, MINITILES_PER_TILE, NEIGHBORS_8};
use crate::source::MapDataSource;

struct MapState {
    grid: MapGrid,
    registry: NeutralRegistry,
    areas: Vec<Area>,
    chokepoints: Vec<ChokePoint>,
    matrices: DistanceMatrices,
    bases: Vec<Base>,
    start_locations: Vec<TilePosition>,
    config: AnalysisConfig,
}

/// The analyzed map: terrain grid, Area/ChokePoint/Base graph, and the
/// chokepoint distance/path matrices, plus the incremental update hooks
/// that keep them current as the embedder destroys neutrals (spec 4.9).
#[derive(Default)]
pub struct Map {
    state: Option<MapState>,
}

impl Map {
    pub fn new() -> Self {
        Map { state: None }
    }

    /// Run the full analysis pipeline against `source` (spec 1, 2, 5). Not
    /// idempotent -- a second call replaces the previous analysis outright.
    pub fn initialize(&mut self, source: &dyn MapDataSource, config: AnalysisConfig) -> AnalysisResult<()> {
        let result = pipeline::analyze(source, &config)?;
        self.state = Some(MapState {
            grid: result.grid,
            registry: result.registry,
            areas: result.areas,
            chokepoints: result.chokepoints,
            matrices: result.matrices,
            bases: result.bases,
            start_locations: source.start_locations().to_vec(),
            config,
        });
        Ok(())
    }

    fn state(&self) -> AnalysisResult<&MapState> {
        self.state.as_ref().ok_or(AnalysisError::Uninitialized)
    }

    fn state_mut(&mut self) -> AnalysisResult<&mut MapState> {
        self.state.as_mut().ok_or(AnalysisError::Uninitialized)
    }

    pub fn get_tile(&self, tile: TilePosition) -> AnalysisResult<&Tile> {
        Ok(self.state()?.grid.get_tile(tile))
    }

    pub fn get_minitile(&self, walk: WalkPosition) -> AnalysisResult<&MiniTile> {
        Ok(self.state()?.grid.get_minitile(walk))
    }

    pub fn areas(&self) -> AnalysisResult<&[Area]> {
        Ok(&self.state()?.areas)
    }

    pub fn chokepoints(&self) -> AnalysisResult<&[ChokePoint]> {
        Ok(&self.state()?.chokepoints)
    }

    pub fn bases(&self) -> AnalysisResult<&[Base]> {
        Ok(&self.state()?.bases)
    }

    pub fn neutrals(&self) -> AnalysisResult<&NeutralRegistry> {
        Ok(&self.state()?.registry)
    }

    pub fn get_area(&self, id: i16) -> AnalysisResult<Option<&Area>> {
        let s = self.state()?;
        Ok(if id > 0 {
            s.areas.get((id - 1) as usize)
        } else {
            None
        })
    }

    /// BFS (8-connected, unbounded by terrain) for the nearest minitile with
    /// a positive area id, starting from `walk` (spec 4.9: used when a query
    /// point lands on sea, a fragment, or a blocked minitile).
    pub fn get_nearest_area(&self, walk: WalkPosition) -> AnalysisResult<Option<&Area>> {
        let s = self.state()?;
        let id = nearest_positive_area_id(&s.grid, walk);
        Ok(id.and_then(|id| s.areas.get((id - 1) as usize)))
    }

    /// Attach each starting location to the closest base within
    /// `config.starting_location_attach_distance` queen-wise tiles,
    /// promoting it to `starting = true` and overriding its location to the
    /// starting location itself (spec 4.9). Returns whether at least one
    /// starting location found no match (spec 7.3).
    pub fn find_bases_for_starting_locations(&mut self) -> AnalysisResult<bool> {
        let (starts, attach_distance) = {
            let s = self.state()?;
            (s.start_locations.clone(), s.config.starting_location_attach_distance)
        };
        let s = self.state_mut()?;

        let mut any_unmatched = false;
        for start in starts {
            let mut best: Option<(usize, i32)> = None;
            for (i, base) in s.bases.iter().enumerate() {
                let d = base.location.queen_wise_distance(start);
                if d > attach_distance {
                    continue;
                }
                if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((i, d));
                }
            }
            match best {
                Some((i, _)) => {
                    s.bases[i].starting = true;
                    s.bases[i].location = start;
                }
                None => any_unmatched = true,
            }
        }
        Ok(any_unmatched)
    }

    /// Shortest chokepoint-mediated path between two pixel positions (spec
    /// 4.9, 7.5, 8). Same-area positions return an empty chokepoint list and
    /// the straight-line pixel distance. Disconnected positions return an
    /// empty path and length `-1`.
    pub fn get_path(&self, from: Position, to: Position) -> AnalysisResult<(Vec<usize>, i32)> {
        let s = self.state()?;

        let area_from = nearest_positive_area_id(&s.grid, from.to_walk_position());
        let area_to = nearest_positive_area_id(&s.grid, to.to_walk_position());
        let (Some(area_from), Some(area_to)) = (area_from, area_to) else {
            return Ok((Vec::new(), -1));
        };

        if area_from == area_to {
            return Ok((Vec::new(), round_pixels(from.distance_to(to))));
        }

        let area_a = &s.areas[(area_from - 1) as usize];
        let area_b = &s.areas[(area_to - 1) as usize];
        if area_a.group_id != area_b.group_id {
            return Ok((Vec::new(), -1));
        }

        let cps_a = chokepoints_of_area(area_a);
        let cps_b = chokepoints_of_area(area_b);

        let mut best: Option<(usize, usize, f64)> = None;
        for &ca in &cps_a {
            let Some(&pa) = s.chokepoints[ca]
                .pos_in_area
                .get(&ChokeNode::Middle)
                .and_then(|by_area| by_area.get(&area_from))
            else {
                continue;
            };
            let pa_px = pa.to_position();
            for &cb in &cps_b {
                let cp_distance = s.matrices.distance(ca, cb);
                if cp_distance < 0 {
                    continue;
                }
                let Some(&pb) = s.chokepoints[cb]
                    .pos_in_area
                    .get(&ChokeNode::Middle)
                    .and_then(|by_area| by_area.get(&area_to))
                else {
                    continue;
                };
                let pb_px = pb.to_position();
                let total = from.distance_to(pa_px) + cp_distance as f64 + pb_px.distance_to(to);
                if best.map(|(_, _, bt)| total < bt).unwrap_or(true) {
                    best = Some((ca, cb, total));
                }
            }
        }

        match best {
            Some((ca, cb, total)) => Ok((s.matrices.path(ca, cb), round_pixels(total))),
            None => Ok((Vec::new(), -1)),
        }
    }

    /// Drop a mineral from its area and any base it was assigned to (spec
    /// 4.9). The registry entry's id stays valid; only the cross-references
    /// are removed. A blocking mineral (spec 3: the pseudo-chokepoint case)
    /// also runs the `on_blocking_neutral_destroyed` topology update.
    pub fn on_mineral_destroyed(&mut self, neutral_index: usize) -> AnalysisResult<()> {
        let was_blocking = self.state()?.registry.get(neutral_index).blocking;

        let s = self.state_mut()?;
        for area in s.areas.iter_mut() {
            area.minerals.retain(|&i| i != neutral_index);
        }
        for base in s.bases.iter_mut() {
            base.minerals.retain(|&i| i != neutral_index);
            base.blocking_minerals.retain(|&i| i != neutral_index);
        }

        if was_blocking {
            self.on_blocking_neutral_destroyed(neutral_index)?;
        }
        Ok(())
    }

    /// Clear a destroyed static building's tile occupancy (spec 4.9). If it
    /// was blocking, delegates to `on_blocking_neutral_destroyed` for the
    /// topology update.
    pub fn on_static_building_destroyed(&mut self, neutral_index: usize) -> AnalysisResult<()> {
        let was_blocking = self.state()?.registry.get(neutral_index).blocking;

        {
            let s = self.state_mut()?;
            let (top_left, size) = {
                let n = s.registry.get(neutral_index);
                (n.top_left, n.size)
            };
            for ty in top_left.y..top_left.y + size.y {
                for tx in top_left.x..top_left.x + size.x {
                    let tp = TilePosition::new(tx, ty);
                    if s.grid.tile_in_bounds(tp) && s.grid.get_tile(tp).neutral == Some(neutral_index) {
                        s.grid.get_tile_mut(tp).neutral = None;
                    }
                }
            }
        }

        if was_blocking {
            self.on_blocking_neutral_destroyed(neutral_index)?;
        }
        Ok(())
    }

    /// Handle a blocking neutral's destruction (spec 4.9): if another
    /// neutral remains stacked at its footprint, that survivor inherits the
    /// blocking status already stamped on the shared pseudo-chokepoints and
    /// nothing else changes. Otherwise, unblock every pseudo-chokepoint tied
    /// to this footprint, clear the `BLOCKED_AREA_ID` sentinel from its
    /// minitiles, recompute the footprint's aggregate tile area ids, and (if
    /// `config.auto_update_paths`) rerun the chokepoint distance/path
    /// computation of spec 4.7.
    ///
    /// A pseudo-chokepoint's `blocking_neutral` is fixed at extraction time
    /// to whichever neutral was the stack's root then (spec 4.6), which may
    /// no longer be `neutral_index` by the time the stack is fully consumed
    /// one destruction at a time -- so the match is by footprint, not by the
    /// specific index passed in.
    pub fn on_blocking_neutral_destroyed(&mut self, neutral_index: usize) -> AnalysisResult<()> {
        let auto_update = self.state()?.config.auto_update_paths;
        let s = self.state_mut()?;

        let footprint = s.registry.get(neutral_index).top_left;
        let size = s.registry.get(neutral_index).size;
        s.registry.remove_from_stack(neutral_index);

        if s.registry.has_any_at(footprint) {
            // A survivor shares the same footprint and already carries the
            // blocking flag and blocked-area list; the pseudo-chokepoints
            // reference the stack root by index, which the survivor now is.
            return Ok(());
        }

        clear_blocked_footprint(&mut s.grid, footprint, size);

        for cp in s.chokepoints.iter_mut() {
            if let Some(bn) = cp.blocking_neutral {
                if s.registry.get(bn).top_left == footprint {
                    cp.blocked = false;
                }
            }
        }

        if auto_update {
            let matrices =
                crate::pipeline::distances::compute_chokepoint_distances(&s.grid, &mut s.areas, &s.chokepoints, &s.config);
            s.matrices = matrices;
        }

        Ok(())
    }
}

fn round_pixels(d: f64) -> i32 {
    crate::pipeline::altitude::round_half_away_from_zero(d) as i32
}

/// BFS (8-connected) from `start` for the nearest minitile with a positive
/// area id, with no terrain restriction on which minitiles may be crossed
/// (spec 4.9: the starting point itself may be sea, a fragment, or blocked).
fn nearest_positive_area_id(grid: &MapGrid, start: WalkPosition) -> Option<i16> {
    if grid.minitile_in_bounds(start) {
        let id = grid.get_minitile(start).area_id;
        if id > 0 {
            return Some(id);
        }
    }

    let mut visited = fnv::FnvHashSet::default();
    visited.insert(start);
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(start);

    while let Some(p) = queue.pop_front() {
        for (dx, dy) in NEIGHBORS_8 {
            let np = WalkPosition::new(p.x + dx, p.y + dy);
            if !grid.minitile_in_bounds(np) || visited.contains(&np) {
                continue;
            }
            visited.insert(np);
            let id = grid.get_minitile(np).area_id;
            if id > 0 {
                return Some(id);
            }
            queue.push_back(np);
        }
    }
    None
}

/// Clear the `BLOCKED_AREA_ID` sentinel from every minitile of a destroyed
/// neutral's footprint and recompute the aggregate tile area id for each
/// tile it spans (spec 4.9). Cleared minitiles revert to area id 0 rather
/// than being re-grown into a neighbouring area: area building is not
/// re-run incrementally.
fn clear_blocked_footprint(grid: &mut MapGrid, top_left: TilePosition, size: TilePosition) {
    let base = top_left.to_walk_position();
    let w = size.x * MINITILES_PER_TILE;
    let h = size.y * MINITILES_PER_TILE;
    for dy in 0..h {
        for dx in 0..w {
            let p = WalkPosition::new(base.x + dx, base.y + dy);
            if grid.minitile_in_bounds(p) && grid.get_minitile(p).is_blocked() {
                grid.get_minitile_mut(p).area_id = 0;
            }
        }
    }
    for ty in top_left.y..top_left.y + size.y {
        for tx in top_left.x..top_left.x + size.x {
            let tp = TilePosition::new(tx, ty);
            if grid.tile_in_bounds(tp) {
                grid.recompute_tile_area_id(tp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neutral::NeutralKind;
    use crate::source::{NeutralDescriptor, StaticMapSource};

    #[test]
    fn queries_before_initialize_return_uninitialized() {
        let map = Map::new();
        assert!(matches!(map.get_tile(TilePosition::new(0, 0)), Err(AnalysisError::Uninitialized)));
    }

    #[test]
    fn open_plain_has_one_area_no_chokepoints_no_bases() {
        let src = StaticMapSource::new(16, 16);
        let mut map = Map::new();
        map.initialize(&src, AnalysisConfig::default()).unwrap();

        assert_eq!(map.areas().unwrap().len(), 1);
        assert!(map.chokepoints().unwrap().is_empty());
        assert!(map.bases().unwrap().is_empty());
    }

    #[test]
    fn same_area_path_is_empty_with_straight_line_length() {
        let src = StaticMapSource::new(16, 16);
        let mut map = Map::new();
        map.initialize(&src, AnalysisConfig::default()).unwrap();

        let (path, length) = map
            .get_path(Position::new(0, 0), Position::new(32, 0))
            .unwrap();
        assert!(path.is_empty());
        assert_eq!(length, 32);
    }

    #[test]
    fn disconnected_islands_have_no_path() {
        let mut src = StaticMapSource::new(40, 10);
        src.fill_unwalkable_tile_rect(TilePosition::new(15, 0), TilePosition::new(10, 10));
        let mut map = Map::new();
        map.initialize(&src, AnalysisConfig::default()).unwrap();

        assert_eq!(map.areas().unwrap().len(), 2);
        let (path, length) = map
            .get_path(Position::new(16, 16), Position::new(39 * 32 + 16, 16))
            .unwrap();
        assert!(path.is_empty());
        assert_eq!(length, -1);
    }

    #[test]
    fn destroying_a_mineral_removes_it_from_its_area() {
        let mut src = StaticMapSource::new(20, 20);
        src.add_neutral(NeutralDescriptor::new(
            NeutralKind::Mineral,
            "Resource_Mineral_Field",
            TilePosition::new(5, 5),
            TilePosition::new(2, 1),
            Some(1500),
        ));
        let mut map = Map::new();
        map.initialize(&src, AnalysisConfig::default()).unwrap();

        let area_id = map.get_tile(TilePosition::new(5, 5)).unwrap().area_id;
        assert!(area_id > 0);
        let area = map.get_area(area_id).unwrap().unwrap();
        assert_eq!(area.minerals.len(), 1);
        let mineral_index = area.minerals[0];

        map.on_mineral_destroyed(mineral_index).unwrap();
        let area = map.get_area(area_id).unwrap().unwrap();
        assert!(area.minerals.is_empty());
    }
}
