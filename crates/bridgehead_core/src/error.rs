//! Error types for the simulation.
//!
//! Unreachable targets and stalled units are not errors: they surface as
//! [`RouteOutcome`](crate::units::RouteOutcome) values and motion events.
//! Only lookups of unknown ids, rejected placements, and bad configuration
//! are reported through these types.

use thiserror::Error;

use crate::structures::StructureId;
use crate::terrain::TilePos;
use crate::units::UnitId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for simulation operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// No unit with this id exists.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// No structure with this id exists.
    #[error("Structure not found: {0}")]
    StructureNotFound(StructureId),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Reason a structure placement was rejected.
///
/// Rejections are all-or-nothing: the grid and structure list are left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Part of the footprint lies outside the grid.
    #[error("Footprint extends off the grid")]
    OffGrid,

    /// A covered tile is not grass.
    #[error("Cannot build on non-grass terrain at ({}, {})", tile.x, tile.y)]
    NonGrassTerrain {
        /// First offending tile in row-major scan order.
        tile: TilePos,
    },

    /// The footprint intersects an existing structure.
    #[error("Footprint overlaps structure {existing}")]
    Overlap {
        /// The structure that was hit first.
        existing: StructureId,
    },
}
