//! Headless runner for scripted control and CI verification.
//!
//! This crate drives a [`bridgehead_core::simulation::Simulation`] without
//! any graphics. It provides:
//!
//! - **JSON-lines sessions**: a controller sends commands on stdin and reads
//!   responses on stdout
//! - **Scenarios**: RON files describing terrain, tuning, and starting units
//! - **ASCII rendering**: terrain and units as text for terminal review
//! - **Determinism checks**: the same scenario run in parallel must agree
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, spawn, move, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p bridgehead_headless
//!
//! # Preview a generated island
//! cargo run -p bridgehead_headless -- render --seed 7
//!
//! # Verify determinism
//! cargo run -p bridgehead_headless -- verify --scenario island.ron --runs 8
//! ```

pub mod ascii;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use ascii::{render_grid, render_simulation, AsciiConfig};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError};
pub use verify::{verify_scenario, VerifyReport};
