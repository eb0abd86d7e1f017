//! The explicit simulation state threaded through batching, checkpointing,
//! and restart replay.

use indexmap::IndexMap;

use crate::config::{RunConfig, RunMode, Settings};
use crate::error::{ConfigError, StateError};
use crate::estimate::KeffEstimator;
use crate::history::CriticalityHistory;
use crate::tally::{GlobalTallies, TallyAccumulator, TallyId};

/// Everything a state point captures, plus the transient estimator state
/// that restart replay reconstructs.
///
/// # Batch protocol
///
/// An uninterrupted run calls [`begin_batch`](Self::begin_batch), scores
/// tallies while [`tallies_on`](Self::tallies_on) is set, then
/// [`finalize_batch`](Self::finalize_batch). A restarted run loads a state
/// point (which sets [`restart_batch`](Self::restart_batch)) and replays
/// batches `1..=restart_batch` before continuing with `begin_batch`.
///
/// # Examples
///
/// ```
/// use carlo_core::{RunConfig, SimulationState, Settings};
///
/// let mut state =
///     SimulationState::new(RunConfig::criticality(1000, 10, 2), 7, Settings::default()).unwrap();
/// for k in [0.9, 1.0, 1.1] {
///     state.begin_batch().unwrap();
///     state.finalize_batch(k, None).unwrap();
/// }
/// assert!(state.tallies_on);
/// assert_eq!(state.keff.n_realizations(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct SimulationState {
    /// Batch structure; overwritten on restart.
    pub config: RunConfig,
    /// RNG seed; overwritten on restart.
    pub seed: u64,
    /// Batch being processed (or last finished), 1-based. Zero before the
    /// first batch.
    pub current_batch: u32,
    /// Batch a state point was loaded from, if this is a restarted run.
    pub restart_batch: Option<u32>,
    /// Per-batch k-effective and entropy.
    pub history: CriticalityHistory,
    /// Running k-effective estimate.
    pub keff: KeffEstimator,
    /// Run-wide tallies.
    pub global_tallies: GlobalTallies,
    /// User tallies in allocation order.
    pub tallies: IndexMap<TallyId, TallyAccumulator>,
    /// Whether batches currently contribute to tallies.
    pub tallies_on: bool,
    settings: Settings,
}

impl SimulationState {
    /// Validate `config` and `settings` and allocate zeroed accumulators.
    pub fn new(config: RunConfig, seed: u64, settings: Settings) -> Result<Self, ConfigError> {
        config.validate()?;
        settings.validate(&config)?;

        let tallies = settings
            .tallies
            .iter()
            .map(|spec| {
                (
                    spec.id,
                    TallyAccumulator::new(spec.id, spec.n_filter_bins, spec.n_score_bins),
                )
            })
            .collect();

        Ok(Self {
            tallies_on: config.n_inactive == 0,
            config,
            seed,
            current_batch: 0,
            restart_batch: None,
            history: CriticalityHistory::new(settings.entropy_on),
            keff: KeffEstimator::default(),
            global_tallies: GlobalTallies::default(),
            tallies,
            settings,
        })
    }

    /// In-memory settings this state was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Advance to the next batch and return its index.
    ///
    /// Fails once `config.n_batches` batches have been started.
    pub fn begin_batch(&mut self) -> Result<u32, StateError> {
        if self.current_batch >= self.config.n_batches {
            return Err(StateError::RunComplete {
                n_batches: self.config.n_batches,
            });
        }
        self.current_batch += 1;
        Ok(self.current_batch)
    }

    /// Close the current batch in an uninterrupted run.
    ///
    /// In criticality mode records `k` (and `entropy`, if tracked) for the
    /// current batch; `k` is ignored in fixed-source mode. Then applies the
    /// batch statistics exactly as restart replay does.
    pub fn finalize_batch(&mut self, k: f64, entropy: Option<f64>) -> Result<(), StateError> {
        if self.config.run_mode == RunMode::Criticality {
            self.history.record(self.current_batch, k, entropy)?;
        }
        self.apply_batch_statistics()
    }

    /// Fold the current batch's recorded k-effective into the estimator and
    /// switch tallies on at the end of the last inactive batch.
    ///
    /// Active batches (strictly beyond `n_inactive`) add a realization;
    /// inactive batches only set the displayed estimate.
    pub fn apply_batch_statistics(&mut self) -> Result<(), StateError> {
        let batch = self.current_batch;
        if self.config.run_mode == RunMode::Criticality {
            let k = self
                .history
                .k(batch)
                .ok_or(StateError::MissingHistory { batch })?;
            if batch > self.config.n_inactive {
                self.keff.add_realization(k);
            } else {
                self.keff.observe_inactive(k);
            }
        }
        if batch == self.config.n_inactive {
            self.tallies_on = true;
        }
        Ok(())
    }

    /// Whether a state point is due after `batch`.
    pub fn writes_state_point(&self, batch: u32) -> bool {
        self.settings
            .writes_state_point(batch, self.config.n_batches)
    }

    /// Reset everything restart replay re-derives: the estimator and the
    /// tally switch.
    pub fn reset_transient(&mut self) {
        self.keff.reset();
        self.tallies_on = self.config.n_inactive == 0;
    }

    /// Mutable access to one user tally.
    pub fn tally_mut(&mut self, id: TallyId) -> Result<&mut TallyAccumulator, StateError> {
        self.tallies
            .get_mut(&id)
            .ok_or(StateError::UnknownTally { id })
    }
}
