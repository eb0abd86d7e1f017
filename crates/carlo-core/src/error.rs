//! Error types for run configuration and simulation state.

use std::error::Error;
use std::fmt;

use crate::tally::TallyId;

/// Errors detected by [`RunConfig::validate()`](crate::RunConfig::validate)
/// and [`Settings::validate()`](crate::Settings::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Particle count per generation is zero.
    NoParticles,
    /// Batch count is zero.
    NoBatches,
    /// Every batch would be inactive, leaving nothing to tally.
    TooManyInactive {
        /// Configured inactive-batch count.
        n_inactive: u32,
        /// Configured total batch count.
        n_batches: u32,
    },
    /// Generations per batch is zero.
    NoGenerations,
    /// Fixed-source runs have no source convergence phase.
    InactiveInFixedSource {
        /// The configured inactive-batch count.
        n_inactive: u32,
    },
    /// Two tally definitions share an id.
    DuplicateTally {
        /// The repeated id.
        id: TallyId,
    },
    /// A tally definition has a zero filter or score dimension.
    EmptyTally {
        /// The offending tally.
        id: TallyId,
    },
    /// A scheduled state-point batch lies outside `1..=n_batches`.
    StatePointOutOfRange {
        /// The scheduled batch.
        batch: u32,
        /// Configured total batch count.
        n_batches: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoParticles => write!(f, "particle count must be at least 1"),
            Self::NoBatches => write!(f, "batch count must be at least 1"),
            Self::TooManyInactive {
                n_inactive,
                n_batches,
            } => write!(
                f,
                "inactive batch count {n_inactive} must be below batch count {n_batches}"
            ),
            Self::NoGenerations => write!(f, "generations per batch must be at least 1"),
            Self::InactiveInFixedSource { n_inactive } => write!(
                f,
                "fixed-source runs cannot have inactive batches (got {n_inactive})"
            ),
            Self::DuplicateTally { id } => write!(f, "tally {id} is defined more than once"),
            Self::EmptyTally { id } => {
                write!(f, "tally {id} must have at least one filter and score bin")
            }
            Self::StatePointOutOfRange { batch, n_batches } => write!(
                f,
                "state point batch {batch} is outside 1..={n_batches}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Errors raised while mutating a [`SimulationState`](crate::SimulationState).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// No k-effective value is recorded for the requested batch.
    MissingHistory {
        /// The 1-based batch index that was looked up.
        batch: u32,
    },
    /// A filter/score bin pair lies outside a tally's shape.
    BinOutOfRange {
        /// The tally being scored.
        id: TallyId,
        /// Requested filter bin.
        filter: u32,
        /// Requested score bin.
        score: u32,
        /// The tally's `(filter, score)` shape.
        shape: (u32, u32),
    },
    /// No tally with this id exists.
    UnknownTally {
        /// The requested id.
        id: TallyId,
    },
    /// Batch indices are 1-based; batch 0 cannot carry results.
    InvalidBatch {
        /// The rejected index.
        batch: u32,
    },
    /// Every configured batch has already been started.
    RunComplete {
        /// Configured total batch count.
        n_batches: u32,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHistory { batch } => {
                write!(f, "no k-effective recorded for batch {batch}")
            }
            Self::BinOutOfRange {
                id,
                filter,
                score,
                shape,
            } => write!(
                f,
                "bin ({filter}, {score}) is outside tally {id} shape {}x{}",
                shape.0, shape.1
            ),
            Self::UnknownTally { id } => write!(f, "unknown tally {id}"),
            Self::InvalidBatch { batch } => {
                write!(f, "batch {batch} is not a valid 1-based batch index")
            }
            Self::RunComplete { n_batches } => {
                write!(f, "all {n_batches} batches have already been run")
            }
        }
    }
}

impl Error for StateError {}
