//! JSON protocol for headless simulation control.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Simulation state and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers each command with one or more responses
//! 4. `quit` (or end of input) ends the session with `{"type":"bye"}`
//!
//! Pixel coordinates travel as JSON numbers and are converted to fixed-point
//! on entry. Tile coordinates are unsigned integers.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"width":40,"height":25}
//! -> {"cmd":"spawn","x":100,"y":100}
//! <- {"type":"spawned","unit_id":0}
//! -> {"cmd":"move","unit_id":0,"x":400,"y":300}
//! <- {"type":"route","unit_id":0,"outcome":"routed","steps":14}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"ticked","tick":60,"produced":[],"replans":0,"collisions":0}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":60,"units":[...],"structures":[...],"hash":...}
//! ```

use bridgehead_core::structures::StructureKind;
use bridgehead_core::units::RouteOutcome;
use serde::{Deserialize, Serialize};

/// Protocol version reported in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current state without advancing time.
    Query,

    /// Spawn a unit at a pixel position.
    Spawn { x: f64, y: f64 },

    /// Spawn a unit on a random grass tile.
    SpawnRandom,

    /// Send one unit toward a pixel target.
    Move { unit_id: u32, x: f64, y: f64 },

    /// Send every selected unit toward a pixel target.
    MoveSelected { x: f64, y: f64 },

    /// Toggle selection of one unit.
    Select { unit_id: u32 },

    /// Click-select the unit under a point.
    SelectAt {
        x: f64,
        y: f64,
        #[serde(default)]
        additive: bool,
    },

    /// Drag-select every unit touching a rectangle.
    SelectRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        additive: bool,
    },

    /// Place a structure with its top-left corner on a tile.
    Place {
        kind: StructureKindName,
        tile_x: u32,
        tile_y: u32,
    },

    /// Queue one unit at a structure.
    Queue { structure_id: u32 },

    /// Report the current state hash.
    Hash,

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

/// Wire name of a structure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKindName {
    /// Trains units.
    Barracks,
    /// Storage building.
    Depot,
    /// Static defence.
    Tower,
}

impl From<StructureKindName> for StructureKind {
    fn from(name: StructureKindName) -> Self {
        match name {
            StructureKindName::Barracks => Self::Barracks,
            StructureKindName::Depot => Self::Depot,
            StructureKindName::Tower => Self::Tower,
        }
    }
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        tick: u64,
        width: u32,
        height: u32,
    },

    /// Acknowledgment of a command with no other payload.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Summary of one or more ticks.
    Ticked {
        tick: u64,
        produced: Vec<ProducedState>,
        replans: u32,
        collisions: u32,
    },

    /// Current simulation state.
    State {
        tick: u64,
        units: Vec<UnitState>,
        structures: Vec<StructureState>,
        hash: u64,
    },

    /// A unit was spawned.
    Spawned { unit_id: u32 },

    /// Result of routing one unit.
    Route {
        unit_id: u32,
        outcome: RouteStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        steps: Option<u32>,
    },

    /// Ids of the selected units after a selection change.
    Selection { selected: Vec<u32> },

    /// A structure was placed.
    Placed { structure_id: u32 },

    /// Result of a queue request.
    Queued {
        structure_id: u32,
        accepted: bool,
        queued: u32,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub tile_x: u32,
    pub tile_y: u32,
    pub selected: bool,
    pub moving: bool,
    /// Remaining waypoints.
    pub waypoints: usize,
}

/// State of a single structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    pub id: u32,
    pub kind: String,
    pub tile_x: u32,
    pub tile_y: u32,
    pub queued: u32,
    pub timer: u32,
}

/// A unit trained during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducedState {
    pub structure_id: u32,
    pub unit_id: u32,
    pub tick: u64,
}

/// Wire form of a route outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Routed,
    AlreadyThere,
    Unreachable,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, width: u32, height: u32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            width,
            height,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a route response from a core outcome.
    pub fn route(unit_id: u32, outcome: RouteOutcome) -> Self {
        let (outcome, steps) = match outcome {
            RouteOutcome::Routed { steps } => (RouteStatus::Routed, Some(steps as u32)),
            RouteOutcome::AlreadyThere => (RouteStatus::AlreadyThere, None),
            RouteOutcome::Unreachable => (RouteStatus::Unreachable, None),
        };
        Self::Route {
            unit_id,
            outcome,
            steps,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Spawn { .. } => "spawn",
            Self::SpawnRandom => "spawn_random",
            Self::Move { .. } => "move",
            Self::MoveSelected { .. } => "move_selected",
            Self::Select { .. } => "select",
            Self::SelectAt { .. } => "select_at",
            Self::SelectRect { .. } => "select_rect",
            Self::Place { .. } => "place",
            Self::Queue { .. } => "queue",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
