//! # Bridgehead Core
//!
//! Deterministic simulation core for a tile-grid real-time strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness (generation takes a seed or an injected RNG)
//! - No floating-point math (uses fixed-point)
//!
//! Presentation and input live in the caller, which reads state between
//! ticks and applies mutations synchronously.
//!
//! ## Crate Structure
//!
//! - [`terrain`] - Tile grid and procedural island generation
//! - [`pathfinding`] - 4-directional A* over the grid
//! - [`units`] - Units and the waypoint motion model
//! - [`collision`] - Pairwise overlap correction
//! - [`structures`] - Placement validation and unit production
//! - [`simulation`] - World state and the tick loop
//! - [`editor`] - Hand editing of terrain
//! - [`config`] - Tuning values
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod collision;
pub mod config;
pub mod editor;
pub mod error;
pub mod math;
pub mod pathfinding;
pub mod simulation;
pub mod structures;
pub mod terrain;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SimConfig, UnitTemplate};
    pub use crate::editor::MapEditor;
    pub use crate::error::{PlacementError, Result, SimError};
    pub use crate::math::{Fixed, Rect, Vec2Fixed};
    pub use crate::pathfinding::find_path;
    pub use crate::simulation::{Produced, Simulation, TickEvents};
    pub use crate::structures::{Structure, StructureId, StructureKind};
    pub use crate::terrain::{
        generate_terrain, Grid, RiverOrientation, TerrainConfig, Tile, TilePos,
    };
    pub use crate::units::{MotionEvent, MotionState, RouteOutcome, Unit, UnitId};
}
