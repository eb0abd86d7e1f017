//! Restart replay of the per-batch k-effective history.
//!
//! The running estimator is transient and not stored in a state point.
//! After a load, each batch `1..=restart_batch` is replayed through the same
//! statistics path an uninterrupted run uses, so the resumed run holds
//! exactly the estimator and tally switch it would have held.

use carlo_core::{RunMode, SimulationState};
use tracing::info;

use crate::error::StatePointError;
use crate::types::ReplayStatus;

/// Replay `state.current_batch` from the loaded history.
///
/// Batch 1 starts a fresh replay: the estimator and tally switch are reset
/// first, so replaying the same history again yields the same state.
/// Returns [`ReplayStatus::Resume`] when the current batch is the restart
/// batch, [`ReplayStatus::Continue`] before it.
pub fn replay_batch_history(state: &mut SimulationState) -> Result<ReplayStatus, StatePointError> {
    let restart_batch = state.restart_batch.ok_or(StatePointError::NoRestartPoint)?;
    let batch = state.current_batch;
    if batch > restart_batch {
        return Err(StatePointError::ReplayPastRestart {
            batch,
            restart_batch,
        });
    }

    if batch == 1 {
        info!(restart_batch, "replaying history from state point");
        state.reset_transient();
    }

    state.apply_batch_statistics()?;
    if state.config.run_mode == RunMode::Criticality {
        print_batch_keff(state);
    }

    if batch == restart_batch {
        info!(batch, "resuming simulation");
        Ok(ReplayStatus::Resume)
    } else {
        Ok(ReplayStatus::Continue)
    }
}

/// Replay every batch up to the restart point, leaving `current_batch` at
/// the restart batch. Returns the number of batches replayed.
pub fn replay_to_restart(state: &mut SimulationState) -> Result<u32, StatePointError> {
    let restart_batch = state.restart_batch.ok_or(StatePointError::NoRestartPoint)?;
    for batch in 1..=restart_batch {
        state.current_batch = batch;
        if replay_batch_history(state)? == ReplayStatus::Resume {
            break;
        }
    }
    state.current_batch = restart_batch;
    Ok(restart_batch)
}

fn print_batch_keff(state: &SimulationState) {
    let batch = state.current_batch;
    let k_batch = state.history.k(batch).unwrap_or(f64::NAN);
    if batch > state.config.n_inactive {
        info!(
            batch,
            k_batch,
            keff = state.keff.mean(),
            std_dev = state.keff.std_dev(),
            "batch keff"
        );
    } else {
        info!(batch, k_batch, "batch keff");
    }
}
