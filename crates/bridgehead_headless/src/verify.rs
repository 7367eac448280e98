//! Parallel determinism verification.
//!
//! Runs the same scenario several times on the rayon pool and compares the
//! final state hashes. Any mismatch means the simulation is not a pure
//! function of its inputs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScenarioError};

/// Outcome of a verification batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated per run.
    pub ticks: u64,
    /// Final hash of each run, in run order.
    pub hashes: Vec<u64>,
}

impl VerifyReport {
    /// True when every run ended in the same state.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Number of distinct final hashes.
    pub fn unique_hashes(&self) -> usize {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique.len()
    }
}

/// Build and run `scenario` `runs` times in parallel for `ticks` ticks each.
pub fn verify_scenario(scenario: &Scenario, runs: u32, ticks: u64) -> Result<VerifyReport, ScenarioError> {
    info!(
        "Verifying determinism: '{}' ({} runs x {} ticks)",
        scenario.name, runs, ticks
    );

    let hashes = (0..runs)
        .into_par_iter()
        .map(|run| -> Result<u64, ScenarioError> {
            let mut sim = scenario.build()?;
            for _ in 0..ticks {
                sim.tick();
            }
            let hash = sim.state_hash();
            debug!("Run {} finished with hash {:016x}", run, hash);
            Ok(hash)
        })
        .collect::<Result<Vec<u64>, ScenarioError>>()?;

    Ok(VerifyReport {
        scenario: scenario.name.clone(),
        ticks,
        hashes,
    })
}
