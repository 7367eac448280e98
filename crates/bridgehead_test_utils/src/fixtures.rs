//! Test fixtures and helpers.
//!
//! Grids are written as ASCII art so tests read like the map they build:
//!
//! ```text
//! ~~~~~~~
//! ~..=..~
//! ~~~~~~~
//! ```

use bridgehead_core::config::SimConfig;
use bridgehead_core::math::{Fixed, Vec2Fixed};
use bridgehead_core::simulation::Simulation;
use bridgehead_core::structures::StructureKind;
use bridgehead_core::terrain::{
    generate_terrain, GeneratedTerrain, Grid, LakeConfig, RiverOrientation, TerrainConfig, Tile,
    TilePos,
};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Pixel centre of a tile at the default 32 px tile size.
#[must_use]
pub fn tile_center(x: u32, y: u32) -> Vec2Fixed {
    TilePos::new(x, y).center(SimConfig::default().tile_size)
}

/// Map a fixture glyph to a tile.
///
/// `.` grass, `~` water, `=` bridge, `#` occupied.
#[must_use]
pub fn tile_from_glyph(glyph: char) -> Option<Tile> {
    match glyph {
        '.' => Some(Tile::Grass),
        '~' => Some(Tile::Water),
        '=' => Some(Tile::Bridge),
        '#' => Some(Tile::Occupied),
        _ => None,
    }
}

/// Build a grid from ASCII rows. Blank lines and surrounding whitespace
/// are ignored.
///
/// # Panics
///
/// Panics on unknown glyphs or ragged rows.
#[must_use]
pub fn grid_from_ascii(art: &str) -> Grid {
    let rows: Vec<&str> = art
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    assert!(!rows.is_empty(), "fixture grid is empty");

    let width = rows[0].chars().count();
    let mut tiles = Vec::with_capacity(width * rows.len());
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.chars().count(), width, "row {y} has a different width");
        for glyph in row.chars() {
            tiles.push(
                tile_from_glyph(glyph).unwrap_or_else(|| panic!("unknown glyph {glyph:?} in row {y}")),
            );
        }
    }

    Grid::from_tiles(width as u32, rows.len() as u32, tiles).expect("fixture dimensions are consistent")
}

/// Simulation with default config over an all-grass grid.
#[must_use]
pub fn open_sim(width: u32, height: u32) -> Simulation {
    Simulation::from_grid(SimConfig::default(), Grid::new(width, height)).expect("default config is valid")
}

/// Simulation with default config over an ASCII fixture grid.
#[must_use]
pub fn sim_from_ascii(art: &str) -> Simulation {
    Simulation::from_grid(SimConfig::default(), grid_from_ascii(art)).expect("default config is valid")
}

/// Classic 40x25 terrain with a vertical river and no lakes.
#[must_use]
pub fn vertical_river_terrain(seed: u64) -> GeneratedTerrain {
    let config = TerrainConfig::classic()
        .with_seed(seed)
        .with_river(RiverOrientation::Vertical)
        .with_lakes(LakeConfig::none());
    generate_terrain(&config).expect("classic config is valid")
}

/// The opening position of the classic game: two units on a seeded
/// 40x25 island.
#[must_use]
pub fn classic_start(seed: u64) -> Simulation {
    let mut sim = Simulation::new(SimConfig::default(), &TerrainConfig::classic().with_seed(seed))
        .expect("classic config is valid");
    sim.spawn_unit(Vec2Fixed::from_int(100, 100));
    sim.spawn_unit(Vec2Fixed::from_int(200, 150));
    sim
}

/// A busy scenario: several units crossing an open field toward each
/// other, plus a barracks training two units.
#[must_use]
pub fn crowded_field() -> Simulation {
    let mut sim = open_sim(24, 16);
    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(sim.spawn_unit(tile_center(2, 2 + i * 2)));
        ids.push(sim.spawn_unit(tile_center(21, 2 + i * 2)));
    }
    for (n, id) in ids.iter().enumerate() {
        let target = if n % 2 == 0 { tile_center(20, 8) } else { tile_center(3, 8) };
        sim.set_unit_target(*id, target).expect("unit exists");
    }

    let barracks = sim
        .place_structure(TilePos::new(11, 6), StructureKind::Barracks)
        .expect("field is open grass");
    sim.queue_unit(barracks).expect("structure exists");
    sim.queue_unit(barracks).expect("structure exists");
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_ascii() {
        let grid = grid_from_ascii(
            "
            ~~~~
            ~.=~
            ~#.~
            ~~~~
            ",
        );
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.tile(TilePos::new(2, 1)), Some(Tile::Bridge));
        assert_eq!(grid.tile(TilePos::new(1, 2)), Some(Tile::Occupied));
        assert_eq!(grid.count(Tile::Water), 12);
    }

    #[test]
    #[should_panic(expected = "unknown glyph")]
    fn test_grid_from_ascii_rejects_unknown() {
        let _ = grid_from_ascii("..x");
    }

    #[test]
    fn test_vertical_river_fixture() {
        let terrain = vertical_river_terrain(5);
        let river = terrain.river.expect("river");
        assert_eq!(river.orientation, RiverOrientation::Vertical);
        assert!(terrain.lakes.is_empty());
    }

    #[test]
    fn test_crowded_field_setup() {
        let sim = crowded_field();
        assert_eq!(sim.units().len(), 12);
        assert_eq!(sim.structures()[0].queued(), 2);
    }
}
