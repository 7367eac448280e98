//! Tile grid and procedural terrain generation.
//!
//! Generates island maps with:
//! - A ring of sea around the border
//! - A few round lakes
//! - One straight river crossing the whole map, with bridges
//!
//! Generation is reproducible: every random draw comes from a seeded
//! ChaCha stream owned by the caller or built from [`TerrainConfig::seed`].

use std::fmt;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{Fixed, Vec2Fixed};

// ============================================================================
// Tiles
// ============================================================================

/// Terrain classification of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tile {
    /// Open ground. Walkable and buildable.
    #[default]
    Grass,
    /// Sea, lake, or river. Impassable.
    Water,
    /// Crossing carved through a river. Walkable, not buildable.
    Bridge,
    /// Ground under a structure footprint. Walkable, not buildable.
    Occupied,
}

impl Tile {
    /// Returns true if units may path across this tile.
    ///
    /// Built-over ground stays navigable.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Grass | Self::Bridge | Self::Occupied)
    }

    /// Returns true if a structure footprint may cover this tile.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Grass)
    }
}

/// Integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TilePos {
    /// Create a tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two tiles.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Offset by a signed delta, returning `None` below zero.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self::new(x, y))
    }

    /// Pixel position of this tile's centre.
    ///
    /// The pixel coordinate must fit in an `i32`; `SimConfig::validate_extent`
    /// guarantees this for every tile of a simulation's grid.
    #[must_use]
    pub fn center(self, tile_size: u32) -> Vec2Fixed {
        let half = tile_size / 2;
        Vec2Fixed::new(
            Fixed::from_num(self.x * tile_size + half),
            Fixed::from_num(self.y * tile_size + half),
        )
    }

    /// Pixel position of this tile's top-left corner.
    #[must_use]
    pub fn corner(self, tile_size: u32) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(self.x * tile_size),
            Fixed::from_num(self.y * tile_size),
        )
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Fixed-size terrain grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    /// Grid width in tiles.
    width: u32,
    /// Grid height in tiles.
    height: u32,
    /// Tile data stored in row-major order.
    tiles: Vec<Tile>,
}

impl Grid {
    /// Create a grid with every tile set to grass.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "Grid width must be positive");
        assert!(height > 0, "Grid height must be positive");

        Self {
            width,
            height,
            tiles: vec![Tile::Grass; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid from row-major tile data.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfig(format!(
                "grid dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = (width as usize) * (height as usize);
        if tiles.len() != expected {
            return Err(SimError::InvalidConfig(format!(
                "expected {expected} tiles for a {width}x{height} grid, got {}",
                tiles.len()
            )));
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, pos: TilePos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Check if a tile coordinate is within grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Get the tile at a coordinate, or `None` if out of bounds.
    #[must_use]
    pub fn tile(&self, pos: TilePos) -> Option<Tile> {
        if self.in_bounds(pos) {
            Some(self.tiles[self.index(pos)])
        } else {
            None
        }
    }

    /// Overwrite one tile. Returns `false` if out of bounds.
    pub(crate) fn set_tile(&mut self, pos: TilePos, tile: Tile) -> bool {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.tiles[index] = tile;
            true
        } else {
            false
        }
    }

    /// Check if a tile is in bounds and walkable.
    #[must_use]
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(Tile::is_walkable)
    }

    /// Terrain that lies under a tile, looking through structure footprints.
    ///
    /// Footprints are only ever accepted over grass, so an occupied tile
    /// always sits on grass.
    #[must_use]
    pub fn terrain_under(&self, pos: TilePos) -> Option<Tile> {
        self.tile(pos).map(|tile| match tile {
            Tile::Occupied => Tile::Grass,
            other => other,
        })
    }

    /// Row-major view of every tile.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Iterate over every coordinate and its tile in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TilePos, Tile)> + '_ {
        let width = self.width;
        self.tiles.iter().enumerate().map(move |(i, &tile)| {
            let i = i as u32;
            (TilePos::new(i % width, i / width), tile)
        })
    }

    /// Count tiles of a given kind.
    #[must_use]
    pub fn count(&self, kind: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == kind).count()
    }

    /// Tile containing a pixel position, clamped into the grid.
    #[must_use]
    pub fn tile_at_pixel(&self, pos: Vec2Fixed, tile_size: u32) -> TilePos {
        let size = Fixed::from_num(tile_size);
        let x = (pos.x / size).floor().to_num::<i64>();
        let y = (pos.y / size).floor().to_num::<i64>();
        TilePos::new(
            x.clamp(0, i64::from(self.width) - 1) as u32,
            y.clamp(0, i64::from(self.height) - 1) as u32,
        )
    }
}

// ============================================================================
// Generation config
// ============================================================================

/// Orientation of the generated river.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiverOrientation {
    /// Runs left to right along one row.
    Horizontal,
    /// Runs top to bottom along one column.
    Vertical,
}

/// Lake generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Minimum number of lakes.
    pub min_count: u32,
    /// Maximum number of lakes (inclusive).
    pub max_count: u32,
    /// Minimum lake radius in tiles.
    pub min_radius: u32,
    /// Maximum lake radius in tiles (inclusive).
    pub max_radius: u32,
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            min_count: 2,
            max_count: 3,
            min_radius: 2,
            max_radius: 3,
        }
    }
}

impl LakeConfig {
    /// No lakes at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            min_count: 0,
            max_count: 0,
            min_radius: 0,
            max_radius: 0,
        }
    }
}

/// Terrain configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Lake parameters.
    #[serde(default)]
    pub lakes: LakeConfig,
    /// Forced river orientation; `None` picks one uniformly.
    #[serde(default)]
    pub river: Option<RiverOrientation>,
    /// Tiles kept clear of the river on each side of the map.
    #[serde(default = "default_river_margin")]
    pub river_margin: u32,
    /// Number of distinct bridge cells cut into the river.
    #[serde(default = "default_bridge_count")]
    pub bridge_count: u32,
}

const fn default_river_margin() -> u32 {
    3
}

const fn default_bridge_count() -> u32 {
    2
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl TerrainConfig {
    /// The 40x25 island.
    #[must_use]
    pub fn classic() -> Self {
        Self {
            width: 40,
            height: 25,
            seed: 12345,
            lakes: LakeConfig::default(),
            river: None,
            river_margin: default_river_margin(),
            bridge_count: default_bridge_count(),
        }
    }

    /// Set the map dimensions.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Force the river orientation.
    #[must_use]
    pub const fn with_river(mut self, orientation: RiverOrientation) -> Self {
        self.river = Some(orientation);
        self
    }

    /// Replace the lake parameters.
    #[must_use]
    pub const fn with_lakes(mut self, lakes: LakeConfig) -> Self {
        self.lakes = lakes;
        self
    }

    /// Check ranges before generating.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimError::InvalidConfig(format!(
                "terrain dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.lakes.min_count > self.lakes.max_count {
            return Err(SimError::InvalidConfig(
                "lake min_count exceeds max_count".into(),
            ));
        }
        if self.lakes.min_radius > self.lakes.max_radius {
            return Err(SimError::InvalidConfig(
                "lake min_radius exceeds max_radius".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Generated output
// ============================================================================

/// A lake carved during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lake {
    /// Lake centre.
    pub center: TilePos,
    /// Radius in tiles.
    pub radius: u32,
}

/// The river carved during generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct River {
    /// Direction of flow across the map.
    pub orientation: RiverOrientation,
    /// Column (vertical) or row (horizontal) of the river.
    pub offset: u32,
    /// Positions along the river that became bridges, ascending.
    pub bridges: Vec<u32>,
}

impl River {
    /// Tile coordinates of every bridge.
    #[must_use]
    pub fn bridge_tiles(&self) -> Vec<TilePos> {
        self.bridges
            .iter()
            .map(|&along| match self.orientation {
                RiverOrientation::Vertical => TilePos::new(self.offset, along),
                RiverOrientation::Horizontal => TilePos::new(along, self.offset),
            })
            .collect()
    }

    /// Whether a tile lies on the river line.
    #[must_use]
    pub fn covers(&self, pos: TilePos) -> bool {
        match self.orientation {
            RiverOrientation::Vertical => pos.x == self.offset,
            RiverOrientation::Horizontal => pos.y == self.offset,
        }
    }
}

/// Generated terrain plus the features that shaped it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTerrain {
    /// Configuration used.
    pub config: TerrainConfig,
    /// The finished grid.
    pub grid: Grid,
    /// Lakes in generation order.
    pub lakes: Vec<Lake>,
    /// The river, if the map was large enough to hold one.
    pub river: Option<River>,
}

// ============================================================================
// Generation
// ============================================================================

/// Generate terrain from a configuration, seeding a fresh RNG.
pub fn generate_terrain(config: &TerrainConfig) -> Result<GeneratedTerrain> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    generate_terrain_with(config, &mut rng)
}

/// Generate a `width` x `height` grid with default lake and river settings.
///
/// # Panics
///
/// Panics if `width` or `height` is zero.
#[must_use]
pub fn generate<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Grid {
    assert!(width > 0 && height > 0, "terrain dimensions must be positive");
    let config = TerrainConfig::classic().with_size(width, height);
    let mut grid = Grid::new(width, height);
    carve_seashore(&mut grid);
    carve_lakes(&config, &mut grid, rng);
    carve_river(&config, &mut grid, rng);
    grid
}

/// Generate terrain drawing from an injected random source.
///
/// Steps run in a fixed order: grass fill, seashore, lakes, river. Later
/// steps overwrite earlier ones where they overlap.
pub fn generate_terrain_with<R: Rng + ?Sized>(
    config: &TerrainConfig,
    rng: &mut R,
) -> Result<GeneratedTerrain> {
    config.validate()?;

    let mut grid = Grid::new(config.width, config.height);
    carve_seashore(&mut grid);
    let lakes = carve_lakes(config, &mut grid, rng);
    let river = carve_river(config, &mut grid, rng);

    tracing::info!(
        width = config.width,
        height = config.height,
        seed = config.seed,
        lakes = lakes.len(),
        river = ?river.as_ref().map(|r| (r.orientation, r.offset)),
        water = grid.count(Tile::Water),
        "Generated terrain"
    );

    Ok(GeneratedTerrain {
        config: config.clone(),
        grid,
        lakes,
        river,
    })
}

fn carve_seashore(grid: &mut Grid) {
    let (w, h) = (grid.width(), grid.height());
    for x in 0..w {
        grid.set_tile(TilePos::new(x, 0), Tile::Water);
        grid.set_tile(TilePos::new(x, h - 1), Tile::Water);
    }
    for y in 0..h {
        grid.set_tile(TilePos::new(0, y), Tile::Water);
        grid.set_tile(TilePos::new(w - 1, y), Tile::Water);
    }
}

fn carve_lakes<R: Rng + ?Sized>(config: &TerrainConfig, grid: &mut Grid, rng: &mut R) -> Vec<Lake> {
    let (w, h) = (grid.width(), grid.height());
    // Centres stay off the one-tile border.
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let count = rng.gen_range(config.lakes.min_count..=config.lakes.max_count);
    let mut lakes = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let center = TilePos::new(rng.gen_range(1..w - 1), rng.gen_range(1..h - 1));
        let radius = rng.gen_range(config.lakes.min_radius..=config.lakes.max_radius);
        let r = radius as i32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let Some(pos) = center.offset(dx, dy) else {
                    continue;
                };
                // Strictly inside the seashore ring.
                if pos.x >= 1 && pos.y >= 1 && pos.x < w - 1 && pos.y < h - 1 {
                    grid.set_tile(pos, Tile::Water);
                }
            }
        }

        lakes.push(Lake { center, radius });
    }

    lakes
}

fn carve_river<R: Rng + ?Sized>(
    config: &TerrainConfig,
    grid: &mut Grid,
    rng: &mut R,
) -> Option<River> {
    let orientation = config.river.unwrap_or_else(|| {
        if rng.gen_bool(0.5) {
            RiverOrientation::Vertical
        } else {
            RiverOrientation::Horizontal
        }
    });

    let (w, h) = (grid.width(), grid.height());
    // `across` is the axis the offset is chosen on, `along` the axis the river spans.
    let (across, along) = match orientation {
        RiverOrientation::Vertical => (w, h),
        RiverOrientation::Horizontal => (h, w),
    };

    let margin = config.river_margin;
    if across <= margin * 2 {
        return None;
    }
    let offset = rng.gen_range(margin..across - margin);

    let at = |i: u32| match orientation {
        RiverOrientation::Vertical => TilePos::new(offset, i),
        RiverOrientation::Horizontal => TilePos::new(i, offset),
    };

    for i in 0..along {
        grid.set_tile(at(i), Tile::Water);
    }

    // Bridges avoid the seashore cells at either end of the river.
    let interior = along.saturating_sub(2);
    let count = config.bridge_count.min(interior);
    let mut bridges: Vec<u32> = index::sample(rng, interior as usize, count as usize)
        .into_iter()
        .map(|i| i as u32 + 1)
        .collect();
    bridges.sort_unstable();

    for &i in &bridges {
        grid.set_tile(at(i), Tile::Bridge);
    }

    Some(River {
        orientation,
        offset,
        bridges,
    })
}
