//! Core state model for Carlo Monte Carlo transport runs.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! explicit [`SimulationState`] that batch stepping, checkpointing, and
//! restart replay all operate on: run configuration, per-batch k-effective
//! history, global and user tally accumulators, and the running k-effective
//! estimator.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod estimate;
pub mod history;
pub mod state;
pub mod tally;

pub use config::{RunConfig, RunMode, Settings, TallySpec};
pub use error::{ConfigError, StateError};
pub use estimate::KeffEstimator;
pub use history::CriticalityHistory;
pub use state::SimulationState;
pub use tally::{GlobalTallies, GlobalTally, TallyAccumulator, TallyCell, TallyId, N_GLOBAL_TALLIES};
