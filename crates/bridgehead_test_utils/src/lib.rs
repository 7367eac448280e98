//! # Bridgehead Test Utilities
//!
//! Shared testing utilities for all crates:
//! - ASCII fixture grids and canned scenarios
//! - Brute-force BFS oracle for the planner
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod oracle;

/// Re-export proptest for convenience.
pub use proptest;
