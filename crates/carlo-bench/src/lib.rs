//! Benchmark profiles for the Carlo checkpoint/restart layer.
//!
//! - [`reference_profile`]: 200 batches, entropy on, three mid-sized tallies
//! - [`stress_profile`]: 2000 batches with one 10K-bin mesh tally

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use carlo_core::{RunConfig, SimulationState};
use carlo_test_utils::{tally_settings, SyntheticRun};

/// Tally shapes of the reference profile: `(filters, scores)`.
pub const REFERENCE_TALLIES: &[(u32, u32)] = &[(100, 4), (250, 2), (16, 16)];

/// A criticality state run to `n_batches` of 200 with 50 inactive batches.
///
/// # Panics
///
/// Panics if `n_batches` exceeds 200.
pub fn reference_profile(seed: u64, n_batches: u32) -> SimulationState {
    assert!(n_batches <= 200, "reference profile has 200 batches");
    profile(seed, RunConfig::criticality(10_000, 200, 50), REFERENCE_TALLIES, n_batches)
}

/// A criticality state run to `n_batches` of 2000 with a 10K-bin tally.
///
/// # Panics
///
/// Panics if `n_batches` exceeds 2000.
pub fn stress_profile(seed: u64, n_batches: u32) -> SimulationState {
    assert!(n_batches <= 2000, "stress profile has 2000 batches");
    profile(
        seed,
        RunConfig::criticality(100_000, 2000, 200),
        &[(2500, 4)],
        n_batches,
    )
}

fn profile(seed: u64, config: RunConfig, shapes: &[(u32, u32)], n_batches: u32) -> SimulationState {
    let mut state = SimulationState::new(config, seed, tally_settings(shapes, true)).unwrap();
    SyntheticRun::new(seed).run(&mut state, n_batches).unwrap();
    state
}
