//! State-point checkpointing and restart replay for Carlo runs.
//!
//! A state point captures enough of a [`SimulationState`] to resume a long
//! Monte Carlo run from a batch boundary with the same statistics an
//! uninterrupted run would have produced.
//!
//! # Architecture
//!
//! - [`StatePointWriter`] encodes a state to any `Write` sink;
//!   [`create_state_point`] writes `restart.<batch>.binary`
//! - [`StatePointReader`] validates the header and loads the body into a
//!   state; [`load_state_point`] does both for a path
//! - [`replay_batch_history`] and [`replay_to_restart`] rebuild the running
//!   k-effective estimate after a load
//!
//! # Format
//!
//! ```text
//! [revision u32] [version u32 x3] [seed u64]
//! [mode u32] [particles u64] [batches u32] [inactive u32] [gen/batch u32]
//! [batch u32] [k-effective f64 x batch] [entropy f64 x batch]?
//! [global count u32] [sums f64 x N] [sums of squares f64 x N]
//! ([tally count u32] ([filters u32] [scores u32] [sums] [sums of squares])*)?
//! ```
//!
//! The layout is positional and not self-describing; the revision tag
//! selects the whole layout. [`Layout::Framed`] additionally prefixes every
//! float array with its `u32` element count.
//!
//! [`SimulationState`]: carlo_core::SimulationState

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod replay;
pub mod types;
pub mod writer;

pub use error::StatePointError;
pub use reader::{load_state_point, read_header, StatePointReader};
pub use replay::{replay_batch_history, replay_to_restart};
pub use types::{
    Layout, LoadOptions, LoadReport, LoadWarning, ProcessRole, ProducerVersion, ReplayStatus,
    StatePoint, StatePointHeader, StatePointSummary,
};
pub use writer::{create_state_point, StatePointWriter};

/// Revision tag of [`Layout::Legacy`].
pub const REVISION_LEGACY: u32 = 1;

/// Revision tag of [`Layout::Framed`].
///
/// History:
/// - 1: bare positional layout
/// - 2: every float array carries a `u32` element-count prefix
pub const REVISION_FRAMED: u32 = 2;

/// Version of the code producing state points.
pub const PRODUCER_VERSION: ProducerVersion = ProducerVersion {
    major: 0,
    minor: 1,
    release: 0,
};

/// File name a state point for `batch` is written under.
///
/// ```
/// assert_eq!(carlo_statepoint::state_point_filename(42), "restart.42.binary");
/// ```
pub fn state_point_filename(batch: u32) -> String {
    format!("restart.{batch}.binary")
}
