//! Test utilities for Carlo development.
//!
//! Provides state builders in [`fixtures`] and [`SyntheticRun`], a
//! deterministic stand-in for the transport loop that produces k-effective
//! values and tally scores from a seeded ChaCha RNG.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{criticality_state, fixed_source_state, tally_settings};

use carlo_core::{GlobalTally, SimulationState, StateError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded source of per-batch results.
///
/// Two runs built from the same seed and driven over the same batches
/// produce bit-identical states.
#[derive(Clone)]
pub struct SyntheticRun {
    rng: ChaCha8Rng,
}

impl SyntheticRun {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A k-effective sample in `[0.95, 1.05)`.
    pub fn next_keff(&mut self) -> f64 {
        0.95 + 0.1 * self.rng.random::<f64>()
    }

    /// Run one full batch: score tallies if they are on, then finalize with
    /// a fresh k-effective (and entropy, if tracked).
    pub fn step(&mut self, state: &mut SimulationState) -> Result<(), StateError> {
        state.begin_batch()?;
        if state.tallies_on {
            for tally in GlobalTally::ALL {
                let value = self.rng.random::<f64>();
                state.global_tallies.accumulate(tally, value);
            }
            for tally in state.tallies.values_mut() {
                for cell in tally.cells_mut() {
                    cell.accumulate(self.rng.random::<f64>());
                }
            }
        }
        let k = self.next_keff();
        let entropy = self.rng.random_range(6.0..8.0);
        state.finalize_batch(k, Some(entropy))
    }

    /// Run `count` batches.
    pub fn run(&mut self, state: &mut SimulationState, count: u32) -> Result<(), StateError> {
        for _ in 0..count {
            self.step(state)?;
        }
        Ok(())
    }
}
