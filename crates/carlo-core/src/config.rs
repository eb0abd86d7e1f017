//! Run configuration, in-memory settings, and validation.
//!
//! [`RunConfig`] is the part of the configuration that travels inside a
//! state point and is overwritten on restart. [`Settings`] holds knobs that
//! only exist in memory (entropy tracking, tally definitions, checkpoint
//! schedule) and must match between the writing and the resuming run.

use std::collections::{BTreeSet, HashSet};

use crate::error::ConfigError;
use crate::tally::TallyId;

// ── RunMode ────────────────────────────────────────────────────────

/// Kind of transport calculation being run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// External source; every batch is active.
    FixedSource,
    /// Eigenvalue calculation with a k-effective estimate per batch.
    Criticality,
}

impl RunMode {
    /// Integer tag used on the wire.
    pub fn tag(self) -> u32 {
        match self {
            Self::FixedSource => 1,
            Self::Criticality => 2,
        }
    }

    /// Decode a wire tag, returning `None` for unknown values.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::FixedSource),
            2 => Some(Self::Criticality),
            _ => None,
        }
    }
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Batch structure of a run.
///
/// # Examples
///
/// ```
/// use carlo_core::{RunConfig, RunMode};
///
/// let config = RunConfig::criticality(10_000, 100, 20);
/// assert_eq!(config.run_mode, RunMode::Criticality);
/// assert_eq!(config.n_active(), 80);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Calculation type.
    pub run_mode: RunMode,
    /// Particles simulated per generation.
    pub n_particles: u64,
    /// Total batches in the run.
    pub n_batches: u32,
    /// Leading batches excluded from tallies while the source converges.
    pub n_inactive: u32,
    /// Generations simulated per batch.
    pub gen_per_batch: u32,
}

impl RunConfig {
    /// Criticality run with one generation per batch.
    pub fn criticality(n_particles: u64, n_batches: u32, n_inactive: u32) -> Self {
        Self {
            run_mode: RunMode::Criticality,
            n_particles,
            n_batches,
            n_inactive,
            gen_per_batch: 1,
        }
    }

    /// Fixed-source run; all batches are active.
    pub fn fixed_source(n_particles: u64, n_batches: u32) -> Self {
        Self {
            run_mode: RunMode::FixedSource,
            n_particles,
            n_batches,
            n_inactive: 0,
            gen_per_batch: 1,
        }
    }

    /// Number of batches that contribute to tallies.
    pub fn n_active(&self) -> u32 {
        self.n_batches.saturating_sub(self.n_inactive)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_particles == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.n_batches == 0 {
            return Err(ConfigError::NoBatches);
        }
        if self.n_inactive >= self.n_batches {
            return Err(ConfigError::TooManyInactive {
                n_inactive: self.n_inactive,
                n_batches: self.n_batches,
            });
        }
        if self.gen_per_batch == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if self.run_mode == RunMode::FixedSource && self.n_inactive != 0 {
            return Err(ConfigError::InactiveInFixedSource {
                n_inactive: self.n_inactive,
            });
        }
        Ok(())
    }
}

// ── Settings ───────────────────────────────────────────────────────

/// Shape of one user tally: a filter-bin by score-bin grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TallySpec {
    /// User-facing tally identifier.
    pub id: TallyId,
    /// Number of filter bins (rows).
    pub n_filter_bins: u32,
    /// Number of score bins (columns).
    pub n_score_bins: u32,
}

impl TallySpec {
    /// Convenience constructor.
    pub fn new(id: impl Into<TallyId>, n_filter_bins: u32, n_score_bins: u32) -> Self {
        Self {
            id: id.into(),
            n_filter_bins,
            n_score_bins,
        }
    }
}

/// In-memory settings that are not persisted in a state point.
///
/// A resuming run must be configured with the same settings as the run
/// that wrote the state point; the reader checks tally shapes against them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Track Shannon entropy of the fission source per batch.
    pub entropy_on: bool,
    /// Tally definitions in allocation order.
    pub tallies: Vec<TallySpec>,
    /// Batches after which a state point is written. Empty means the final
    /// batch only.
    pub state_point_batches: BTreeSet<u32>,
}

impl Settings {
    /// Validate settings against the run's batch structure.
    pub fn validate(&self, config: &RunConfig) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.tallies.len());
        for spec in &self.tallies {
            if !seen.insert(spec.id) {
                return Err(ConfigError::DuplicateTally { id: spec.id });
            }
            if spec.n_filter_bins == 0 || spec.n_score_bins == 0 {
                return Err(ConfigError::EmptyTally { id: spec.id });
            }
        }
        if let Some(&batch) = self
            .state_point_batches
            .iter()
            .find(|&&b| b == 0 || b > config.n_batches)
        {
            return Err(ConfigError::StatePointOutOfRange {
                batch,
                n_batches: config.n_batches,
            });
        }
        Ok(())
    }

    /// Whether a state point is due after `batch`.
    pub fn writes_state_point(&self, batch: u32, n_batches: u32) -> bool {
        if self.state_point_batches.is_empty() {
            batch == n_batches
        } else {
            self.state_point_batches.contains(&batch)
        }
    }
}
