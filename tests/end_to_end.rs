//! The six literal end-to-end scenarios of spec 8, one test each, plus the
//! idempotence property (spec 8: re-running `Initialize` on the same input
//! produces structurally equal output).

use bwmap_analyzer::{AnalysisConfig, Map, NeutralDescriptor, NeutralKind, StaticMapSource, TilePosition, WalkPosition};
use std::sync::Once;

static LOGGER: Once = Once::new();

/// `cargo test -- --nocapture` then shows `debug!` lines from the pipeline,
/// the same convention the teacher crate's own tests use for env_logger.
fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::try_init();
    });
}

#[test]
fn single_open_plain_is_one_area_with_no_chokepoints_or_bases() {
    init_logger();
    let src = StaticMapSource::new(64, 64);
    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let areas = map.areas().unwrap();
    assert_eq!(areas.len(), 1);
    assert!(map.chokepoints().unwrap().is_empty());
    assert!(map.bases().unwrap().is_empty());
    assert!(areas[0].max_altitude > 0);

    for y in 0..(64 * 4) {
        for x in 0..(64 * 4) {
            let mt = map.get_minitile(WalkPosition::new(x, y)).unwrap();
            if mt.walkable {
                assert_eq!(mt.area_id, areas[0].id);
            }
        }
    }
}

#[test]
fn two_rooms_joined_by_corridor_have_one_chokepoint_and_single_hop_path() {
    // Two 32x32-tile rooms separated by a wall column, with a single open
    // row (one tile, i.e. four minitiles tall) forming the corridor.
    let mut src = StaticMapSource::new(65, 32);
    for ty in 0..32 {
        if ty == 16 {
            continue;
        }
        src.fill_unwalkable_tile_rect(TilePosition::new(32, ty), TilePosition::new(1, 1));
    }

    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let areas = map.areas().unwrap();
    assert_eq!(areas.len(), 2);

    let chokepoints = map.chokepoints().unwrap();
    assert_eq!(chokepoints.len(), 1);
    // The corridor is exactly one tile (four minitiles) wide, so the
    // frontier between the two rooms can't exceed four positions.
    assert!(!chokepoints[0].geometry.is_empty());
    assert!(chokepoints[0].geometry.len() <= 4);

    let left_room = TilePosition::new(5, 16).to_position();
    let right_room = TilePosition::new(60, 16).to_position();
    let (path, length) = map.get_path(left_room, right_room).unwrap();
    assert_eq!(path.len(), 1);
    assert!(length > 0);
}

#[test]
fn mineral_line_blocks_corridor_until_fully_destroyed() {
    let mut src = StaticMapSource::new(42, 20);
    for ty in 0..20 {
        if ty == 10 {
            continue;
        }
        src.fill_unwalkable_tile_rect(TilePosition::new(20, ty), TilePosition::new(1, 1));
    }
    // Nine 8-amount mineral patches stacked at the single corridor tile:
    // together they occupy the only walkable gap in the wall.
    for _ in 0..9 {
        src.add_neutral(NeutralDescriptor::new(
            NeutralKind::Mineral,
            "Resource_Mineral_Field",
            TilePosition::new(20, 10),
            TilePosition::new(1, 1),
            Some(8),
        ));
    }

    let mut config = AnalysisConfig::default();
    config.auto_update_paths = true;
    let mut map = Map::new();
    map.initialize(&src, config).unwrap();

    assert_eq!(map.areas().unwrap().len(), 2);

    let blocking_cp_index = map
        .chokepoints()
        .unwrap()
        .iter()
        .position(|cp| cp.is_pseudo())
        .expect("expected a pseudo-chokepoint for the blocking mineral line");
    assert!(map.chokepoints().unwrap()[blocking_cp_index].blocked);

    let area_a = map.chokepoints().unwrap()[blocking_cp_index].area_a;
    let area_b = map.chokepoints().unwrap()[blocking_cp_index].area_b;
    assert!(!map
        .get_area(area_a)
        .unwrap()
        .unwrap()
        .accessible_neighbours
        .contains(&area_b));

    let mineral_indices: Vec<usize> = map
        .neutrals()
        .unwrap()
        .iter()
        .filter(|(_, n)| n.top_left == TilePosition::new(20, 10))
        .map(|(idx, _)| idx)
        .collect();
    assert_eq!(mineral_indices.len(), 9);

    for &idx in &mineral_indices[..8] {
        map.on_mineral_destroyed(idx).unwrap();
        assert!(
            map.chokepoints().unwrap()[blocking_cp_index].blocked,
            "corridor must stay blocked while any mineral in the line survives"
        );
    }

    map.on_mineral_destroyed(mineral_indices[8]).unwrap();
    assert!(!map.chokepoints().unwrap()[blocking_cp_index].blocked);

    let left_room = TilePosition::new(5, 5).to_position();
    let right_room = TilePosition::new(35, 5).to_position();
    let (_, length) = map.get_path(left_room, right_room).unwrap();
    assert!(length >= 0, "auto_update_paths should repopulate the distance once unblocked");
}

#[test]
fn destroying_the_tail_of_a_mineral_stack_leaves_the_root_still_blocking() {
    let mut src = StaticMapSource::new(42, 20);
    for ty in 0..20 {
        if ty == 10 {
            continue;
        }
        src.fill_unwalkable_tile_rect(TilePosition::new(20, ty), TilePosition::new(1, 1));
    }
    for _ in 0..9 {
        src.add_neutral(NeutralDescriptor::new(
            NeutralKind::Mineral,
            "Resource_Mineral_Field",
            TilePosition::new(20, 10),
            TilePosition::new(1, 1),
            Some(8),
        ));
    }

    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let blocking_cp_index = map
        .chokepoints()
        .unwrap()
        .iter()
        .position(|cp| cp.is_pseudo())
        .expect("expected a pseudo-chokepoint for the blocking mineral line");

    let mineral_indices: Vec<usize> = map
        .neutrals()
        .unwrap()
        .iter()
        .filter(|(_, n)| n.top_left == TilePosition::new(20, 10))
        .map(|(idx, _)| idx)
        .collect();
    assert_eq!(mineral_indices.len(), 9);

    // Destroy the tail of the stack (added last) while the root (added
    // first) and every other stacked mineral still stand. The footprint is
    // still fully occupied, so the pseudo-chokepoint must stay blocked.
    map.on_mineral_destroyed(mineral_indices[8]).unwrap();
    assert!(
        map.chokepoints().unwrap()[blocking_cp_index].blocked,
        "destroying the tail of the stack must not unblock the shared footprint \
         while the root and other members still occupy it"
    );

    map.on_mineral_destroyed(mineral_indices[0]).unwrap();
    assert!(
        map.chokepoints().unwrap()[blocking_cp_index].blocked,
        "destroying the root must not unblock the footprint while other stacked minerals survive"
    );
}

#[test]
fn four_symmetric_starting_locations_each_get_one_base_with_full_cluster() {
    let mut src = StaticMapSource::new(60, 60);

    let quadrants = [
        TilePosition::new(2, 2),
        TilePosition::new(42, 2),
        TilePosition::new(2, 42),
        TilePosition::new(42, 42),
    ];

    for &origin in &quadrants {
        for i in 0..6 {
            src.add_neutral(NeutralDescriptor::new(
                NeutralKind::Mineral,
                "Resource_Mineral_Field",
                TilePosition::new(origin.x + i * 2, origin.y),
                TilePosition::new(2, 1),
                Some(1500),
            ));
        }
        src.add_neutral(NeutralDescriptor::new(
            NeutralKind::Geyser,
            "Resource_Vespene_Geyser",
            TilePosition::new(origin.x + 2, origin.y + 4),
            TilePosition::new(4, 2),
            Some(5000),
        ));
        src.add_start_location(TilePosition::new(origin.x + 5, origin.y + 2));
    }

    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let any_failed = map.find_bases_for_starting_locations().unwrap();
    assert!(!any_failed, "every starting location should attach to a base");

    let starting_bases: Vec<_> = map.bases().unwrap().iter().filter(|b| b.starting).collect();
    assert_eq!(starting_bases.len(), 4);
    for base in starting_bases {
        assert_eq!(base.minerals.len(), 6);
        assert_eq!(base.geysers.len(), 1);
    }
}

#[test]
fn lake_and_sea_are_classified_distinctly() {
    let mut src = StaticMapSource::new(16, 16);
    src.fill_unwalkable_tile_rect(TilePosition::new(6, 6), TilePosition::new(5, 5));
    src.fill_unwalkable_tile_rect(TilePosition::new(0, 0), TilePosition::new(16, 1));

    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let lake_center = TilePosition::new(8, 8).to_walk_position();
    let lake_mt = map.get_minitile(lake_center).unwrap();
    assert!(lake_mt.altitude > 0);

    let sea_center = TilePosition::new(8, 0).to_walk_position();
    let sea_mt = map.get_minitile(sea_center).unwrap();
    assert_eq!(sea_mt.altitude, 0);

    // Terrain next to the lake should sit at a smaller altitude than
    // terrain next to the (much larger) sea strip's shore.
    let near_lake = map
        .get_minitile(WalkPosition::new(lake_center.x, lake_center.y - 4))
        .unwrap();
    let near_sea = map
        .get_minitile(WalkPosition::new(sea_center.x, sea_center.y + 2))
        .unwrap();
    assert!(near_lake.altitude > 0);
    assert!(near_sea.altitude > 0);
}

#[test]
fn disconnected_islands_get_distinct_groups_and_no_path() {
    let mut src = StaticMapSource::new(40, 10);
    src.fill_unwalkable_tile_rect(TilePosition::new(15, 0), TilePosition::new(10, 10));

    let mut map = Map::new();
    map.initialize(&src, AnalysisConfig::default()).unwrap();

    let areas = map.areas().unwrap();
    assert_eq!(areas.len(), 2);
    assert_ne!(areas[0].group_id, areas[1].group_id);

    let left = TilePosition::new(5, 5).to_position();
    let right = TilePosition::new(35, 5).to_position();
    let (path, length) = map.get_path(left, right).unwrap();
    assert!(path.is_empty());
    assert_eq!(length, -1);
}

#[test]
fn reinitializing_the_same_source_produces_structurally_equal_output() {
    let mut src = StaticMapSource::new(42, 20);
    for ty in 0..20 {
        if ty == 10 {
            continue;
        }
        src.fill_unwalkable_tile_rect(TilePosition::new(20, ty), TilePosition::new(1, 1));
    }
    src.add_neutral(NeutralDescriptor::new(
        NeutralKind::Mineral,
        "Resource_Mineral_Field",
        TilePosition::new(20, 10),
        TilePosition::new(1, 1),
        Some(1500),
    ));

    let mut first = Map::new();
    first.initialize(&src, AnalysisConfig::default()).unwrap();
    let mut second = Map::new();
    second.initialize(&src, AnalysisConfig::default()).unwrap();

    assert_eq!(
        serde_json::to_string(first.areas().unwrap()).unwrap(),
        serde_json::to_string(second.areas().unwrap()).unwrap(),
    );
    assert_eq!(
        serde_json::to_string(first.chokepoints().unwrap()).unwrap(),
        serde_json::to_string(second.chokepoints().unwrap()).unwrap(),
    );
    assert_eq!(
        serde_json::to_string(first.bases().unwrap()).unwrap(),
        serde_json::to_string(second.bases().unwrap()).unwrap(),
    );
}

