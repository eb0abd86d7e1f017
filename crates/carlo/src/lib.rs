//! Carlo: checkpoint and restart for batched Monte Carlo particle transport.
//!
//! This is the top-level facade crate that re-exports the public API from the
//! Carlo sub-crates. For most users, adding `carlo` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use carlo::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = RunConfig::criticality(1000, 10, 2);
//!
//! // Run four batches and checkpoint.
//! let mut run = SimulationState::new(config.clone(), 7, Settings::default()).unwrap();
//! for k in [0.9, 1.0, 1.1, 1.05] {
//!     run.begin_batch().unwrap();
//!     run.finalize_batch(k, None).unwrap();
//! }
//! let path = create_state_point(dir.path(), 4, &run, Layout::default()).unwrap();
//!
//! // Resume in a fresh process.
//! let mut resumed = SimulationState::new(config, 0, Settings::default()).unwrap();
//! load_state_point(&path, &mut resumed, &LoadOptions::default()).unwrap();
//! replay_to_restart(&mut resumed).unwrap();
//! assert_eq!(resumed.keff.n_realizations(), 2);
//! assert_eq!(resumed.keff.mean(), run.keff.mean());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`state`] | `carlo-core` | Run configuration, tallies, k-effective estimator, simulation state |
//! | [`statepoint`] | `carlo-statepoint` | State-point format, writer, reader, restart replay |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Run configuration and simulation state (`carlo-core`).
///
/// [`state::SimulationState`] is the record a state point captures and a
/// restart overwrites.
pub use carlo_core as state;

/// State-point checkpointing and restart replay (`carlo-statepoint`).
///
/// Write with [`statepoint::create_state_point`], load with
/// [`statepoint::load_state_point`], then rebuild the estimator with
/// [`statepoint::replay_to_restart`].
pub use carlo_statepoint as statepoint;

/// Common imports for typical Carlo usage.
///
/// ```rust
/// use carlo::prelude::*;
/// ```
pub mod prelude {
    // State
    pub use carlo_core::{
        GlobalTally, RunConfig, RunMode, Settings, SimulationState, TallyId, TallySpec,
    };

    // Errors
    pub use carlo_core::{ConfigError, StateError};
    pub use carlo_statepoint::StatePointError;

    // State points
    pub use carlo_statepoint::{
        create_state_point, load_state_point, replay_to_restart, Layout, LoadOptions,
        LoadReport, ProcessRole,
    };
}
