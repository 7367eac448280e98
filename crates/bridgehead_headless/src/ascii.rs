//! ASCII map renderer for quick terminal review.
//!
//! One character per tile:
//!
//! | Glyph | Meaning |
//! |-------|---------|
//! | `.` | grass |
//! | `~` | water |
//! | `=` | bridge |
//! | `#` | occupied (built over) |
//! | `u` | unit |
//! | `U` | selected unit |

use std::fmt::Write as _;

use bridgehead_core::simulation::Simulation;
use bridgehead_core::terrain::{Grid, Tile};

/// ASCII rendering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsciiConfig {
    /// Draw units over the terrain.
    pub show_units: bool,
    /// Append a legend and summary line.
    pub show_legend: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_units: true,
            show_legend: true,
        }
    }
}

/// Glyph for a terrain tile.
#[must_use]
pub const fn tile_char(tile: Tile) -> char {
    match tile {
        Tile::Grass => '.',
        Tile::Water => '~',
        Tile::Bridge => '=',
        Tile::Occupied => '#',
    }
}

fn terrain_rows(grid: &Grid) -> Vec<Vec<char>> {
    grid.tiles()
        .chunks(grid.width() as usize)
        .map(|row| row.iter().map(|&tile| tile_char(tile)).collect())
        .collect()
}

fn join_rows(rows: &[Vec<char>]) -> String {
    let mut out = String::with_capacity(rows.iter().map(|r| r.len() + 1).sum());
    for row in rows {
        out.extend(row.iter());
        out.push('\n');
    }
    out
}

/// Render terrain only.
#[must_use]
pub fn render_grid(grid: &Grid) -> String {
    join_rows(&terrain_rows(grid))
}

/// Render a simulation: terrain, units, and an optional legend.
///
/// Selected units win over unselected ones sharing a tile.
#[must_use]
pub fn render_simulation(sim: &Simulation, config: AsciiConfig) -> String {
    let grid = sim.grid();
    let mut rows = terrain_rows(grid);

    if config.show_units {
        let tile_size = sim.config().tile_size;
        for unit in sim.units() {
            let tile = unit.tile(grid, tile_size);
            let cell = &mut rows[tile.y as usize][tile.x as usize];
            if unit.is_selected() {
                *cell = 'U';
            } else if *cell != 'U' {
                *cell = 'u';
            }
        }
    }

    let mut out = join_rows(&rows);
    if config.show_legend {
        out.push_str(". grass  ~ water  = bridge  # occupied  u unit  U selected\n");
        let _ = writeln!(
            out,
            "tick {} | units {} | structures {}",
            sim.current_tick(),
            sim.units().len(),
            sim.structures().len()
        );
    }
    out
}
