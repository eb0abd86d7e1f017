//! Error types for state-point writing, loading, and replay.

use std::fmt;
use std::io;

use carlo_core::{StateError, TallyId};

/// Errors from writing, loading, or replaying a state point.
///
/// Every variant is fatal to the run; the only non-fatal condition, a
/// producer version mismatch, is reported as a
/// [`LoadWarning`](crate::LoadWarning) instead.
#[derive(Debug)]
pub enum StatePointError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file was written with a different layout revision.
    RevisionMismatch {
        /// Revision found in the file.
        found: u32,
        /// Revision of the layout the reader expects.
        expected: u32,
    },
    /// The revision tag matches no known layout.
    UnknownRevision {
        /// Revision found in the file.
        found: u32,
    },
    /// The stored global-tally count differs from this build's.
    GlobalTallyCountMismatch {
        /// Count found in the file.
        found: u32,
        /// Count this build allocates.
        expected: u32,
    },
    /// The stored user-tally count differs from the configured count.
    TallyCountMismatch {
        /// Count found in the file.
        found: u32,
        /// Count configured in memory.
        expected: u32,
    },
    /// A stored tally shape differs from its allocated shape.
    TallyShapeMismatch {
        /// Position of the tally in allocation order.
        index: usize,
        /// Id of the in-memory tally at that position.
        id: TallyId,
        /// `(filters, scores)` found in the file.
        found: (u32, u32),
        /// `(filters, scores)` allocated in memory.
        expected: (u32, u32),
    },
    /// The run-mode tag is not recognised.
    InvalidRunMode {
        /// The unrecognised tag.
        tag: u32,
    },
    /// A field could not be decoded.
    MalformedField {
        /// Which field.
        field: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// Fewer history entries exist than the batch being written or replayed.
    MissingHistory {
        /// The batch with no recorded k-effective.
        batch: u32,
    },
    /// Replay was requested on a state that was not loaded from a state point.
    NoRestartPoint,
    /// Replay was driven past the batch the state point was written at.
    ReplayPastRestart {
        /// The batch replay was asked to process.
        batch: u32,
        /// The restart batch.
        restart_batch: u32,
    },
    /// Tallies are off for an active batch, so the tally section a reader
    /// expects cannot be written. A loaded state is in this condition until
    /// its history has been replayed.
    TalliesOff {
        /// The batch being written.
        batch: u32,
        /// Inactive-batch count of the run.
        n_inactive: u32,
    },
    /// A simulation-state operation failed.
    State(StateError),
}

impl fmt::Display for StatePointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::RevisionMismatch { found, expected } => write!(
                f,
                "state point revision {found} is incompatible with expected revision {expected}"
            ),
            Self::UnknownRevision { found } => {
                write!(f, "state point revision {found} matches no known layout")
            }
            Self::GlobalTallyCountMismatch { found, expected } => write!(
                f,
                "state point has {found} global tallies, expected {expected}"
            ),
            Self::TallyCountMismatch { found, expected } => write!(
                f,
                "state point has {found} tallies, {expected} are configured"
            ),
            Self::TallyShapeMismatch {
                index,
                id,
                found,
                expected,
            } => write!(
                f,
                "tally {id} (position {index}) is {}x{} in the state point, {}x{} in memory",
                found.0, found.1, expected.0, expected.1
            ),
            Self::InvalidRunMode { tag } => write!(f, "unknown run mode tag {tag}"),
            Self::MalformedField { field, detail } => {
                write!(f, "malformed field '{field}': {detail}")
            }
            Self::MissingHistory { batch } => {
                write!(f, "no k-effective history recorded for batch {batch}")
            }
            Self::NoRestartPoint => write!(f, "state was not loaded from a state point"),
            Self::ReplayPastRestart {
                batch,
                restart_batch,
            } => write!(
                f,
                "replay of batch {batch} is past restart batch {restart_batch}"
            ),
            Self::TalliesOff { batch, n_inactive } => write!(
                f,
                "tallies are off at batch {batch}, past {n_inactive} inactive batches; \
                 replay the restart history before writing"
            ),
            Self::State(e) => write!(f, "simulation state: {e}"),
        }
    }
}

impl std::error::Error for StatePointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::State(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StatePointError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<StateError> for StatePointError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::MissingHistory { batch } => Self::MissingHistory { batch },
            other => Self::State(other),
        }
    }
}
