//! Hand editing of terrain before a game starts.

use crate::terrain::{Grid, Tile, TilePos};

/// Editable terrain, starting as open grass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEditor {
    grid: Grid,
}

impl MapEditor {
    /// Blank all-grass map.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
        }
    }

    /// Start from an existing grid.
    #[must_use]
    pub fn from_grid(grid: Grid) -> Self {
        Self { grid }
    }

    /// Current terrain.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Cycle a tile Grass -> Water -> Bridge -> Grass.
    ///
    /// Any other tile resets to grass. Returns the new tile, or `None` off-grid.
    pub fn cycle_tile(&mut self, pos: TilePos) -> Option<Tile> {
        let next = match self.grid.tile(pos)? {
            Tile::Grass => Tile::Water,
            Tile::Water => Tile::Bridge,
            Tile::Bridge | Tile::Occupied => Tile::Grass,
        };
        self.grid.set_tile(pos, next);
        Some(next)
    }

    /// Reset a tile to grass. Returns `false` off-grid.
    pub fn reset_tile(&mut self, pos: TilePos) -> bool {
        self.grid.set_tile(pos, Tile::Grass)
    }

    /// Finish editing.
    #[must_use]
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_blank() {
        let editor = MapEditor::new(8, 6);
        assert_eq!(editor.grid().count(Tile::Grass), 48);
    }

    #[test]
    fn test_cycle_order() {
        let mut editor = MapEditor::new(4, 4);
        let pos = TilePos::new(1, 2);
        assert_eq!(editor.cycle_tile(pos), Some(Tile::Water));
        assert_eq!(editor.cycle_tile(pos), Some(Tile::Bridge));
        assert_eq!(editor.cycle_tile(pos), Some(Tile::Grass));
        assert_eq!(editor.cycle_tile(TilePos::new(4, 0)), None);
    }

    #[test]
    fn test_occupied_cycles_to_grass() {
        let mut grid = Grid::new(3, 3);
        grid.set_tile(TilePos::new(0, 0), Tile::Occupied);
        let mut editor = MapEditor::from_grid(grid);
        assert_eq!(editor.cycle_tile(TilePos::new(0, 0)), Some(Tile::Grass));
    }

    #[test]
    fn test_reset_tile() {
        let mut editor = MapEditor::new(4, 4);
        let pos = TilePos::new(3, 3);
        editor.cycle_tile(pos);
        editor.cycle_tile(pos);
        assert!(editor.reset_tile(pos));
        assert!(!editor.reset_tile(TilePos::new(9, 9)));

        let grid = editor.into_grid();
        assert_eq!(grid.tile(pos), Some(Tile::Grass));
    }
}
