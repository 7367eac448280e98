//! Property tests comparing the A* planner against breadth-first search.

use bridgehead_core::config::SimConfig;
use bridgehead_core::pathfinding::find_path;
use bridgehead_core::simulation::Simulation;
use bridgehead_core::terrain::Grid;
use bridgehead_test_utils::determinism::strategies::{
    arb_grid, arb_grid_with_endpoints, arb_wild_pixel,
};
use bridgehead_test_utils::oracle::{bfs_distance, is_valid_path};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Path length matches BFS exactly, and unreachable goals give nothing.
    #[test]
    fn prop_path_is_shortest((grid, start, goal) in arb_grid_with_endpoints(9, 9, 30)) {
        let path = find_path(&grid, start, goal);

        if start == goal {
            prop_assert!(path.is_empty());
        } else {
            match bfs_distance(&grid, start, goal) {
                Some(distance) => {
                    prop_assert!(is_valid_path(&grid, &path, start, goal), "{:?}", path);
                    prop_assert_eq!(path.len() - 1, distance);
                }
                None => prop_assert!(path.is_empty()),
            }
        }
    }

    /// Same inputs, same path.
    #[test]
    fn prop_planner_is_deterministic((grid, start, goal) in arb_grid_with_endpoints(12, 12, 25)) {
        prop_assert_eq!(find_path(&grid, start, goal), find_path(&grid, start, goal));
    }

    /// A tile to itself is always the empty sequence.
    #[test]
    fn prop_same_tile_is_empty((grid, start, _goal) in arb_grid_with_endpoints(10, 10, 40)) {
        prop_assert!(find_path(&grid, start, start).is_empty());
    }

    /// Any pixel target, however wild, clamps onto the grid.
    #[test]
    fn prop_targets_clamp_into_grid(grid in arb_grid(12, 12, 20), target in arb_wild_pixel()) {
        let (w, h) = (grid.width(), grid.height());
        let mut sim = Simulation::from_grid(SimConfig::default(), grid).unwrap();
        let id = sim.spawn_unit(bridgehead_core::math::Vec2Fixed::from_int(16, 16));
        sim.set_unit_target(id, target).unwrap();

        let destination = sim.unit(id).unwrap().destination().unwrap();
        prop_assert!(destination.x < w && destination.y < h);
    }
}

#[test]
fn test_open_grid_paths_are_manhattan() {
    let grid = Grid::new(15, 15);
    for (sx, sy, gx, gy) in [(0, 0, 14, 14), (3, 9, 12, 2), (7, 7, 7, 0)] {
        let start = bridgehead_core::terrain::TilePos::new(sx, sy);
        let goal = bridgehead_core::terrain::TilePos::new(gx, gy);
        let path = find_path(&grid, start, goal);
        assert_eq!(path.len() - 1, start.manhattan(goal) as usize);
    }
}
