//! Altitude field (spec 4.3): multi-source weighted Dijkstra over an
//! 8-neighbour grid, seeded from every "seaside" minitile (non-sea, with a
//! sea minitile -- or the map edge, treated as sea -- among its 4
//! neighbours).
//!
//! The precomputed `(delta, weight)` list is sorted *stably* by weight and
//! the seed-inactivation rule (`currentWeight - lastAssigned >= 16`) is
//! preserved exactly: both are load-bearing per spec 4.3, fixing the order
//! in which equal-distance minitiles receive an altitude, which in turn
//! fixes area frontiers downstream. The trivial zero delta `(0, 0)` is
//! dropped from the precomputed list: probing it only ever re-targets the
//! seed's own position, and assigning that position altitude 0 would
//! violate the `walkable => altitude > 0` invariant (spec 3, 8). Every seed
//! instead receives its altitude from a neighbouring seed's first real
//! probe, which is exactly the weight-8 (or weight-11 diagonal) step --
//! consistent with "distance in pixels to the nearest sea minitile".

use crate::grid::{MapGrid, SEA_OR_LAKE_ALTITUDE};
use crate::position::{WalkPosition, NEIGHBORS_4};

/// A seed becomes inactive once it has gone this many altitude-units
/// without successfully assigning a new minitile (spec 4.3).
const INACTIVITY_GAP: i32 = 16;

/// `round-half-away-from-zero`, as spec 4.3 and 4.8 require (spec 9, open
/// question on rounding): `0.5 + x` truncation for non-negative `x`.
pub fn round_half_away_from_zero(x: f64) -> i64 {
    if x >= 0.0 {
        (x + 0.5).floor() as i64
    } else {
        (x - 0.5).ceil() as i64
    }
}

struct Seed {
    pos: WalkPosition,
    last_assigned: i32,
    active: bool,
}

/// The 8 symmetric reflections of a delta `(dx, dy)` with `0 <= dy <= dx`,
/// deduplicated.
fn reflections(dx: i32, dy: i32) -> Vec<(i32, i32)> {
    let candidates = [
        (dx, dy),
        (dx, -dy),
        (-dx, dy),
        (-dx, -dy),
        (dy, dx),
        (dy, -dx),
        (-dy, dx),
        (-dy, -dx),
    ];
    let mut out: Vec<(i32, i32)> = Vec::with_capacity(8);
    for c in candidates {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Compute `MiniTile.altitude` for every non-sea minitile. Returns the
/// map-wide maximum altitude reached.
pub fn compute_altitude(grid: &mut MapGrid) -> i16 {
    let w = grid.walk_width();
    let h = grid.walk_height();
    let range = w.max(h) / 2 + 3;

    let mut deltas: Vec<(i32, i32, i32)> = Vec::new();
    for dy in 0..=range {
        for dx in dy..=range {
            if dx == 0 && dy == 0 {
                continue;
            }
            let norm = ((dx * dx + dy * dy) as f64).sqrt();
            let weight = round_half_away_from_zero(norm * 8.0) as i32;
            deltas.push((dx, dy, weight));
        }
    }
    // `sort_by_key` is a stable sort (spec 4.3: load-bearing).
    deltas.sort_by_key(|&(_, _, weight)| weight);

    let mut seeds = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let p = WalkPosition::new(x, y);
            if grid.get_minitile(p).is_sea() {
                continue;
            }
            let mut seaside = false;
            for (dx, dy) in NEIGHBORS_4 {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    seaside = true;
                    break;
                }
                if grid.get_minitile(WalkPosition::new(nx, ny)).is_sea() {
                    seaside = true;
                    break;
                }
            }
            if seaside {
                seeds.push(Seed {
                    pos: p,
                    last_assigned: 0,
                    active: true,
                });
            }
        }
    }

    let mut max_altitude: i16 = 0;

    'weights: for &(dx, dy, weight) in &deltas {
        let reflected = reflections(dx, dy);
        let mut any_active = false;

        for seed in seeds.iter_mut() {
            if !seed.active {
                continue;
            }
            any_active = true;
            let mut produced = false;

            for &(rx, ry) in &reflected {
                let px = seed.pos.x + rx;
                let py = seed.pos.y + ry;
                if px < 0 || py < 0 || px >= w || py >= h {
                    continue;
                }
                let target = WalkPosition::new(px, py);
                let mt = grid.get_minitile_mut(target);
                if mt.altitude == SEA_OR_LAKE_ALTITUDE {
                    mt.altitude = weight as i16;
                    if mt.altitude > max_altitude {
                        max_altitude = mt.altitude;
                    }
                    produced = true;
                }
            }

            if produced {
                seed.last_assigned = weight;
            }
            if weight - seed.last_assigned >= INACTIVITY_GAP {
                seed.active = false;
            }
        }

        if !any_active {
            break 'weights;
        }
    }

    log::debug!(
        "altitude field: {} seaside seeds, max altitude {}",
        seeds.len(),
        max_altitude
    );
    max_altitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::TilePosition;
    use crate::source::StaticMapSource;

    #[test]
    fn round_half_away_from_zero_matches_spec_examples() {
        assert_eq!(round_half_away_from_zero(2.5), 3);
        assert_eq!(round_half_away_from_zero(2.4), 2);
        assert_eq!(round_half_away_from_zero(-2.5), -3);
    }

    #[test]
    fn every_walkable_minitile_gets_positive_altitude() {
        let mut src = StaticMapSource::new(20, 20);
        src.fill_unwalkable_tile_rect(TilePosition::new(0, 0), TilePosition::new(20, 2));
        let (mut grid, _) = crate::pipeline::ingest::ingest(&src).unwrap();
        crate::pipeline::sealake::classify_sea_and_lakes(&mut grid, &crate::config::AnalysisConfig::default());
        compute_altitude(&mut grid);

        for y in 0..grid.walk_height() {
            for x in 0..grid.walk_width() {
                let mt = grid.get_minitile(WalkPosition::new(x, y));
                if mt.walkable {
                    assert!(mt.altitude > 0, "walkable minitile at ({x},{y}) has altitude {}", mt.altitude);
                }
            }
        }
    }

    #[test]
    fn altitude_increases_away_from_sea() {
        let mut src = StaticMapSource::new(20, 20);
        src.fill_unwalkable_tile_rect(TilePosition::new(0, 0), TilePosition::new(20, 2));
        let (mut grid, _) = crate::pipeline::ingest::ingest(&src).unwrap();
        crate::pipeline::sealake::classify_sea_and_lakes(&mut grid, &crate::config::AnalysisConfig::default());
        compute_altitude(&mut grid);

        let near = grid.get_minitile(WalkPosition::new(10, 8)).altitude;
        let far = grid.get_minitile(WalkPosition::new(10, 70)).altitude;
        assert!(far > near);
    }
}
