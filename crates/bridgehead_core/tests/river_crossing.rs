//! End-to-end crossing tests on generated islands.
//!
//! A river splits every generated map. Paths and units may only cross it
//! at one of its bridges.

use bridgehead_core::config::SimConfig;
use bridgehead_core::pathfinding::find_path;
use bridgehead_core::simulation::Simulation;
use bridgehead_core::terrain::{generate_terrain, TerrainConfig, Tile, TilePos};
use bridgehead_test_utils::fixtures::{tile_center, vertical_river_terrain};
use bridgehead_test_utils::oracle::{bfs_distance, is_valid_path};

#[test]
fn test_path_crosses_vertical_river_at_bridge() {
    for seed in 0..50 {
        let terrain = vertical_river_terrain(seed);
        let river = terrain.river.as_ref().expect("classic map has a river");
        let c = river.offset;
        let bridges = river.bridge_tiles();
        assert_eq!(bridges.len(), 2);

        let start = TilePos::new(c - 1, 5);
        let goal = TilePos::new(c + 1, 5);
        let path = find_path(&terrain.grid, start, goal);

        assert!(is_valid_path(&terrain.grid, &path, start, goal), "seed {seed}: {path:?}");
        assert_eq!(
            Some(path.len() - 1),
            bfs_distance(&terrain.grid, start, goal),
            "seed {seed}: not a shortest path"
        );

        let crossings: Vec<TilePos> = path.iter().copied().filter(|p| p.x == c).collect();
        assert!(!crossings.is_empty(), "seed {seed}: path never reached the river column");
        for tile in crossings {
            assert!(
                bridges.contains(&tile),
                "seed {seed}: crossed column {c} at {tile}, bridges are {bridges:?}"
            );
        }
    }
}

#[test]
fn test_unit_walks_over_bridge() {
    for seed in [1, 17, 42] {
        let terrain = vertical_river_terrain(seed);
        let river = terrain.river.clone().expect("classic map has a river");
        let c = river.offset;
        let bridges = river.bridge_tiles();

        let mut sim = Simulation::from_grid(SimConfig::default(), terrain.grid).unwrap();
        let id = sim.spawn_unit(tile_center(c - 1, 5));
        let outcome = sim.set_unit_target(id, tile_center(c + 1, 5)).unwrap();
        assert!(outcome.is_routed(), "seed {seed}: {outcome:?}");

        let mut ticks = 0;
        while sim.unit(id).unwrap().is_moving() {
            sim.tick();
            ticks += 1;
            assert!(ticks < 5_000, "seed {seed}: unit never arrived");

            let tile = sim.unit(id).unwrap().tile(sim.grid(), 32);
            if tile.x == c {
                assert!(bridges.contains(&tile), "seed {seed}: unit stood in the river at {tile}");
            }
        }

        assert_eq!(sim.unit(id).unwrap().position(), tile_center(c + 1, 5));
    }
}

#[test]
fn test_random_islands_only_cross_at_bridges() {
    for seed in 0..40 {
        let terrain = generate_terrain(&TerrainConfig::classic().with_seed(seed)).unwrap();
        let grid = &terrain.grid;
        let river = terrain.river.as_ref().expect("classic map has a river");
        let bridges = river.bridge_tiles();

        // Every river tile is water unless it is a bridge.
        for (pos, tile) in grid.iter().filter(|(pos, _)| river.covers(*pos)) {
            let expected = if bridges.contains(&pos) { Tile::Bridge } else { Tile::Water };
            assert_eq!(tile, expected, "seed {seed}: river tile {pos}");
        }

        // Walk between the first and last grass tiles on the map.
        let grass: Vec<TilePos> = grid
            .iter()
            .filter(|&(_, tile)| tile == Tile::Grass)
            .map(|(pos, _)| pos)
            .collect();
        let (start, goal) = (grass[0], grass[grass.len() - 1]);
        let path = find_path(grid, start, goal);

        match bfs_distance(grid, start, goal) {
            Some(distance) => {
                assert_eq!(path.len() - 1, distance, "seed {seed}");
                for tile in path.iter().filter(|p| river.covers(**p)) {
                    assert!(bridges.contains(tile), "seed {seed}: waded across at {tile}");
                }
            }
            None => assert!(path.is_empty(), "seed {seed}"),
        }
    }
}
