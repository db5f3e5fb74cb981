//! Sea/lake classification (spec 4.2).
//!
//! Flood-fills unwalkable minitile components in row-major scan order. A
//! component re-tags to lake -- and gets an altitude from the engine like
//! any terrain minitile -- when it is small and away from every map edge;
//! otherwise it remains sea (altitude pinned to 0). The size/span/edge
//! constants are policy (`AnalysisConfig`) but the literals must match
//! `spec.md` exactly: they are load-bearing for downstream connectivity.

use crate::config::AnalysisConfig;
use crate::grid::{MapGrid, SEA_ALTITUDE, SEA_OR_LAKE_ALTITUDE};
use crate::position::{WalkPosition, NEIGHBORS_4};

/// Summary counts for the one-line `debug!` log (spec 10.1).
pub struct SeaLakeSummary {
    pub sea_components: u32,
    pub lake_components: u32,
}

pub fn classify_sea_and_lakes(grid: &mut MapGrid, config: &AnalysisConfig) -> SeaLakeSummary {
    let w = grid.walk_width();
    let h = grid.walk_height();
    let mut visited = vec![false; (w * h) as usize];
    let mut summary = SeaLakeSummary {
        sea_components: 0,
        lake_components: 0,
    };

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if visited[idx] {
                continue;
            }
            let seed = WalkPosition::new(x, y);
            let mt = grid.get_minitile(seed);
            if mt.walkable || mt.altitude != SEA_OR_LAKE_ALTITUDE {
                visited[idx] = true;
                continue;
            }

            let mut component = Vec::new();
            let mut stack = vec![(x, y)];
            visited[idx] = true;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

            while let Some((cx, cy)) = stack.pop() {
                component.push((cx, cy));
                min_x = min_x.min(cx);
                max_x = max_x.max(cx);
                min_y = min_y.min(cy);
                max_y = max_y.max(cy);

                for (dx, dy) in NEIGHBORS_4 {
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if visited[nidx] {
                        continue;
                    }
                    let nmt = grid.get_minitile(WalkPosition::new(nx, ny));
                    if !nmt.walkable && nmt.altitude == SEA_OR_LAKE_ALTITUDE {
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            let span_x = max_x - min_x + 1;
            let span_y = max_y - min_y + 1;
            let is_lake = component.len() as u32 <= config.lake_max_minitiles
                && span_x <= config.lake_max_span
                && span_y <= config.lake_max_span
                && min_x >= config.lake_min_edge_distance
                && min_y >= config.lake_min_edge_distance
                && (w - 1 - max_x) >= config.lake_min_edge_distance
                && (h - 1 - max_y) >= config.lake_min_edge_distance;

            if is_lake {
                summary.lake_components += 1;
                // Leave altitude at the transient marker; the altitude
                // engine treats it like any non-sea minitile.
            } else {
                summary.sea_components += 1;
                for &(cx, cy) in &component {
                    grid.get_minitile_mut(WalkPosition::new(cx, cy)).altitude = SEA_ALTITUDE;
                }
            }
        }
    }

    log::debug!(
        "sea/lake classification: {} sea components, {} lake components",
        summary.sea_components,
        summary.lake_components
    );
    summary
}
