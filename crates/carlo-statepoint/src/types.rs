//! Data types for state-point writing and loading.

use std::fmt;

use carlo_core::{
    CriticalityHistory, GlobalTallies, RunConfig, SimulationState, TallyAccumulator, TallyId,
};
use indexmap::IndexMap;

use crate::{REVISION_FRAMED, REVISION_LEGACY};

/// Version triple of the code that wrote a state point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProducerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Release number.
    pub release: u32,
}

impl fmt::Display for ProducerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

/// Leading fields of every state point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatePointHeader {
    /// Layout revision tag.
    pub revision: u32,
    /// Producer version.
    pub version: ProducerVersion,
}

/// Wire layout, selected as a whole by the revision tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Bare positional layout; array lengths are implied by earlier fields.
    Legacy,
    /// As [`Legacy`](Self::Legacy), with a `u32` element count before every
    /// float array.
    #[default]
    Framed,
}

impl Layout {
    /// Revision tag written for this layout.
    pub fn revision(self) -> u32 {
        match self {
            Self::Legacy => REVISION_LEGACY,
            Self::Framed => REVISION_FRAMED,
        }
    }

    /// Layout for a revision tag, if known.
    pub fn from_revision(revision: u32) -> Option<Self> {
        match revision {
            REVISION_LEGACY => Some(Self::Legacy),
            REVISION_FRAMED => Some(Self::Framed),
            _ => None,
        }
    }

    /// Whether float arrays carry a length prefix.
    pub fn is_framed(self) -> bool {
        matches!(self, Self::Framed)
    }
}

/// Role of this process in a multi-process run.
///
/// Only the master reads the global-tally and per-tally sections; workers
/// stop after the history section and receive tally data by other means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProcessRole {
    /// Coordinating process; owns tally I/O.
    #[default]
    Master,
    /// Any other process.
    Worker,
}

/// How to load a state point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Layout the file must have been written with.
    pub layout: Layout,
    /// Role of the loading process.
    pub role: ProcessRole,
}

impl LoadOptions {
    /// Options for a worker process reading the given layout.
    pub fn worker(layout: Layout) -> Self {
        Self {
            layout,
            role: ProcessRole::Worker,
        }
    }
}

/// Advisory conditions found while loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadWarning {
    /// The file was produced by a different code version.
    VersionMismatch {
        /// Version stored in the file.
        found: ProducerVersion,
        /// Version of this build.
        expected: ProducerVersion,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionMismatch { found, expected } => write!(
                f,
                "state point was written by version {found}, this is version {expected}"
            ),
        }
    }
}

/// Outcome of a successful load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    /// Header read from the file.
    pub header: StatePointHeader,
    /// Batch the run resumes after.
    pub restart_batch: u32,
    /// Whether tally sections were read.
    pub tallies_loaded: bool,
    /// Advisory conditions; the load succeeded regardless.
    pub warnings: Vec<LoadWarning>,
}

/// Header and run section of a state point, readable without a
/// configured state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatePointSummary {
    /// Revision and producer version.
    pub header: StatePointHeader,
    /// Layout selected by the revision.
    pub layout: Layout,
    /// RNG seed.
    pub seed: u64,
    /// Batch structure.
    pub config: RunConfig,
    /// Batch the state point was written at.
    pub batch: u32,
}

/// A fully decoded state point, validated against a state but not yet
/// applied to it.
#[derive(Clone, Debug, PartialEq)]
pub struct StatePoint {
    /// Revision and producer version.
    pub header: StatePointHeader,
    /// RNG seed.
    pub seed: u64,
    /// Batch structure.
    pub config: RunConfig,
    /// Batch the state point was written at.
    pub batch: u32,
    /// k-effective and entropy through `batch` (empty in fixed-source mode).
    pub history: CriticalityHistory,
    /// Global tallies; `None` when the section was not read.
    pub global_tallies: Option<GlobalTallies>,
    /// User tallies in allocation order; `None` when the section was not read.
    pub tallies: Option<IndexMap<TallyId, TallyAccumulator>>,
}

impl StatePoint {
    /// Overwrite `state` with the decoded contents.
    ///
    /// Sets both the current and restart batch to [`batch`](Self::batch) and
    /// resets the estimator and tally switch so replay can rebuild them.
    /// Sections that were not read leave the corresponding accumulators
    /// untouched.
    pub fn apply_to(self, state: &mut SimulationState) {
        state.seed = self.seed;
        state.config = self.config;
        state.current_batch = self.batch;
        state.restart_batch = Some(self.batch);
        state.history = self.history;
        if let Some(globals) = self.global_tallies {
            state.global_tallies = globals;
        }
        if let Some(tallies) = self.tallies {
            state.tallies = tallies;
        }
        state.reset_transient();
    }
}

/// Result of replaying one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayStatus {
    /// More batches remain before the restart point.
    Continue,
    /// The restart batch was reached; leave replay and resume stepping.
    Resume,
}
