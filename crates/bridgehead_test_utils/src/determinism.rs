//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the harness is meant to catch:
//!
//! - **Floating-point math**: positions and distances must stay in
//!   [`bridgehead_core::math::Fixed`].
//!
//! - **Unseeded randomness**: terrain and random spawns must draw from a
//!   seeded ChaCha stream.
//!
//! - **Iteration order**: units and structures are processed in id order,
//!   and the planner breaks frontier ties by discovery order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual behaviours (planner, motion, production)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: running N simulations on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use bridgehead_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves simulation state exactly,
/// and that the restored copy keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use bridgehead_core::math::Vec2Fixed;
    use bridgehead_core::terrain::{Grid, Tile, TilePos};
    use proptest::prelude::*;

    /// A small grid where roughly `water_percent` of tiles are water.
    pub fn arb_grid(
        max_width: u32,
        max_height: u32,
        water_percent: u32,
    ) -> impl Strategy<Value = Grid> {
        (2..=max_width, 2..=max_height).prop_flat_map(move |(w, h)| {
            proptest::collection::vec(0u32..100, (w * h) as usize).prop_map(move |rolls| {
                let tiles = rolls
                    .into_iter()
                    .map(|r| if r < water_percent { Tile::Water } else { Tile::Grass })
                    .collect();
                Grid::from_tiles(w, h, tiles).expect("dimensions match tile count")
            })
        })
    }

    /// A grid together with two in-bounds tiles.
    pub fn arb_grid_with_endpoints(
        max_width: u32,
        max_height: u32,
        water_percent: u32,
    ) -> impl Strategy<Value = (Grid, TilePos, TilePos)> {
        arb_grid(max_width, max_height, water_percent).prop_flat_map(|grid| {
            let (w, h) = (grid.width(), grid.height());
            (Just(grid), 0..w, 0..h, 0..w, 0..h).prop_map(|(grid, sx, sy, gx, gy)| {
                (grid, TilePos::new(sx, sy), TilePos::new(gx, gy))
            })
        })
    }

    /// A whole-pixel position inside a `width` x `height` pixel area.
    pub fn arb_pixel(width: i32, height: i32) -> impl Strategy<Value = Vec2Fixed> {
        (0..width, 0..height).prop_map(|(x, y)| Vec2Fixed::from_int(x, y))
    }

    /// A pixel target that may fall outside the map, to exercise clamping.
    pub fn arb_wild_pixel() -> impl Strategy<Value = Vec2Fixed> {
        (-2000i32..4000, -2000i32..4000).prop_map(|(x, y)| Vec2Fixed::from_int(x, y))
    }

    /// Unit spawn positions inside a pixel area.
    pub fn arb_unit_positions(
        width: i32,
        height: i32,
        max_units: usize,
    ) -> impl Strategy<Value = Vec<Vec2Fixed>> {
        proptest::collection::vec(arb_pixel(width, height), 1..max_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{classic_start, crowded_field, tile_center};
    use bridgehead_core::config::SimConfig;
    use bridgehead_core::math::Vec2Fixed;
    use bridgehead_core::terrain::{Grid, TerrainConfig};
    use proptest::prelude::*;

    fn empty_sim() -> Simulation {
        Simulation::from_grid(SimConfig::default(), Grid::new(10, 10)).unwrap()
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(empty_sim, 100));
    }

    #[test]
    fn test_classic_start_determinism() {
        let setup = || {
            let mut sim = classic_start(99);
            let ids: Vec<_> = sim.units().iter().map(|u| u.id()).collect();
            for id in ids {
                let _ = sim.set_unit_target(id, Vec2Fixed::from_int(1000, 600));
            }
            sim
        };
        let result = verify_determinism(5, 500, setup, |s| { s.tick(); }, Simulation::state_hash);
        result.assert_deterministic();
    }

    #[test]
    fn test_crowded_field_no_divergence() {
        assert_eq!(find_first_divergence(crowded_field, 400), None);
    }

    #[test]
    fn test_serialization_preserves_crowded_field() {
        assert!(verify_serialization_determinism(crowded_field, 150));
    }

    #[test]
    fn test_serialization_preserves_empty_sim() {
        assert!(verify_serialization_determinism(empty_sim, 0));
    }

    #[test]
    fn test_parallel_crowded_field() {
        let result = run_parallel_simulations(crowded_field, 4, 300);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_terrain_generation_is_seed_stable() {
        let hash_for = |seed| {
            let sim = Simulation::new(SimConfig::default(), &TerrainConfig::classic().with_seed(seed))
                .unwrap();
            compute_hash(sim.grid())
        };
        assert_eq!(hash_for(11), hash_for(11));
    }

    #[test]
    fn test_movement_arrives_at_exact_position() {
        let setup = || {
            let mut sim = empty_sim();
            let id = sim.spawn_unit(tile_center(1, 1));
            sim.set_unit_target(id, tile_center(8, 7)).unwrap();
            sim
        };
        let mut sim1 = setup();
        let mut sim2 = setup();
        sim1.run(300);
        sim2.run(300);

        assert_eq!(sim1.units()[0].position(), tile_center(8, 7));
        assert_eq!(sim1.units()[0].position(), sim2.units()[0].position());
    }

    proptest! {
        /// Arbitrary spawn positions and targets replay identically.
        #[test]
        fn prop_random_orders_are_deterministic(
            positions in strategies::arb_unit_positions(320, 320, 8),
            target in strategies::arb_wild_pixel(),
        ) {
            let setup = move || {
                let mut sim = empty_sim();
                for &p in &positions {
                    let id = sim.spawn_unit(p);
                    let _ = sim.set_unit_target(id, target);
                }
                sim
            };
            let result = verify_determinism(2, 120, setup, |s| { s.tick(); }, Simulation::state_hash);
            prop_assert!(result.is_deterministic);
        }
    }
}
