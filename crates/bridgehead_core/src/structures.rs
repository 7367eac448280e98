//! Structures: footprint placement and unit production.
//!
//! A structure covers a square block of tiles. Placement is validated
//! against the terrain and every existing footprint before anything is
//! mutated. Production-capable structures count down a training timer for
//! each queued unit and pick a spawn point next to their footprint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::PlacementError;
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::terrain::{Grid, Tile, TilePos};

/// Unique identifier for a structure. Assigned in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub u32);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "structure#{}", self.0)
    }
}

/// Closed set of structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Trains units.
    Barracks,
    /// Storage.
    Depot,
    /// Static defence.
    Tower,
}

impl StructureKind {
    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Barracks => "Barracks",
            Self::Depot => "Depot",
            Self::Tower => "Tower",
        }
    }

    /// Only production-capable kinds accept queued units.
    #[must_use]
    pub const fn is_production_capable(self) -> bool {
        matches!(self, Self::Barracks)
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Neighbour offsets tried when choosing a spawn tile: E, W, S, N, SE, NW, SW, NE.
const SPAWN_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];

/// A placed structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Structure {
    id: StructureId,
    kind: StructureKind,
    /// Top-left footprint tile.
    origin: TilePos,
    /// Footprint edge length in tiles.
    size_tiles: u32,
    /// Footprint in pixels.
    rect: Rect,
    /// Units waiting to be trained.
    queued: u32,
    /// Ticks spent on the unit currently in training.
    timer: u32,
}

impl Structure {
    /// Create a structure over an already-validated footprint.
    #[must_use]
    pub fn new(
        id: StructureId,
        kind: StructureKind,
        origin: TilePos,
        size_tiles: u32,
        tile_size: u32,
    ) -> Self {
        Self {
            id,
            kind,
            origin,
            size_tiles,
            rect: footprint_rect(origin, size_tiles, tile_size),
            queued: 0,
            timer: 0,
        }
    }

    /// Structure id.
    #[must_use]
    pub const fn id(&self) -> StructureId {
        self.id
    }

    /// Structure kind.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.kind
    }

    /// Top-left footprint tile.
    #[must_use]
    pub const fn origin(&self) -> TilePos {
        self.origin
    }

    /// Footprint edge length in tiles.
    #[must_use]
    pub const fn size_tiles(&self) -> u32 {
        self.size_tiles
    }

    /// Footprint in pixels.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Units waiting to be trained.
    #[must_use]
    pub const fn queued(&self) -> u32 {
        self.queued
    }

    /// Training progress in ticks.
    #[must_use]
    pub const fn timer(&self) -> u32 {
        self.timer
    }

    /// Every tile under the footprint, row-major.
    pub fn footprint_tiles(&self) -> impl Iterator<Item = TilePos> {
        footprint_tiles(self.origin, self.size_tiles)
    }

    /// Tile at the middle of the footprint.
    #[must_use]
    pub const fn center_tile(&self) -> TilePos {
        let half = self.size_tiles / 2;
        TilePos::new(self.origin.x + half, self.origin.y + half)
    }

    /// Add one unit to the training queue.
    ///
    /// Returns `false` and changes nothing for kinds that cannot produce.
    pub fn queue_unit(&mut self) -> bool {
        if !self.kind.is_production_capable() {
            return false;
        }
        self.queued += 1;
        true
    }

    /// Advance training by one tick.
    ///
    /// Returns the spawn point when a unit finishes.
    pub fn advance(&mut self, grid: &Grid, config: &SimConfig) -> Option<Vec2Fixed> {
        if !self.kind.is_production_capable() || self.queued == 0 {
            return None;
        }

        self.timer += 1;
        if self.timer < config.train_ticks {
            return None;
        }

        self.timer = 0;
        self.queued -= 1;
        Some(self.spawn_point(grid, config.tile_size))
    }

    /// Where a newly trained unit appears.
    ///
    /// The first grass neighbour of the centre tile, falling back to the
    /// centre of the footprint when every neighbour is blocked.
    #[must_use]
    pub fn spawn_point(&self, grid: &Grid, tile_size: u32) -> Vec2Fixed {
        let center = self.center_tile();
        SPAWN_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| center.offset(dx, dy))
            .find(|&pos| grid.tile(pos) == Some(Tile::Grass))
            .map_or_else(|| self.rect.center(), |pos| pos.center(tile_size))
    }
}

fn footprint_rect(origin: TilePos, size_tiles: u32, tile_size: u32) -> Rect {
    let corner = origin.corner(tile_size);
    let edge = Fixed::from_num(size_tiles * tile_size);
    Rect::new(corner.x, corner.y, edge, edge)
}

fn footprint_tiles(origin: TilePos, size_tiles: u32) -> impl Iterator<Item = TilePos> {
    (0..size_tiles).flat_map(move |dy| {
        (0..size_tiles).map(move |dx| TilePos::new(origin.x + dx, origin.y + dy))
    })
}

/// Check whether a footprint may be built at `origin`.
///
/// Checks run in order: the footprint fits on the grid, every covered tile
/// is grass, and the pixel rectangle misses every existing structure. On
/// success the footprint rectangle is returned; nothing is mutated either way.
pub fn validate_placement(
    grid: &Grid,
    existing: &[Structure],
    origin: TilePos,
    size_tiles: u32,
    tile_size: u32,
) -> Result<Rect, PlacementError> {
    let fits = |start: u32, limit: u32| {
        start
            .checked_add(size_tiles)
            .is_some_and(|end| end <= limit)
    };
    if size_tiles == 0 || !fits(origin.x, grid.width()) || !fits(origin.y, grid.height()) {
        return Err(PlacementError::OffGrid);
    }

    if let Some(tile) =
        footprint_tiles(origin, size_tiles).find(|&pos| !grid.tile(pos).is_some_and(Tile::is_buildable))
    {
        return Err(PlacementError::NonGrassTerrain { tile });
    }

    let rect = footprint_rect(origin, size_tiles, tile_size);
    if let Some(other) = existing.iter().find(|s| s.rect.intersects(&rect)) {
        return Err(PlacementError::Overlap { existing: other.id });
    }

    Ok(rect)
}

/// Mark every footprint tile as built over.
pub(crate) fn occupy_footprint(grid: &mut Grid, structure: &Structure) {
    for pos in structure.footprint_tiles() {
        grid.set_tile(pos, Tile::Occupied);
    }
}
