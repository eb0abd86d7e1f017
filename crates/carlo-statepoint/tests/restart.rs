//! Checkpoint/restart integration tests.
//!
//! Each test drives a synthetic run, writes a state point to a temporary
//! directory, loads it into a freshly configured state, and checks what
//! the resumed state holds.

use std::path::Path;

use carlo_core::{
    GlobalTallies, KeffEstimator, RunConfig, SimulationState, TallyId, N_GLOBAL_TALLIES,
};
use carlo_statepoint::codec::{encode_header, write_u32_le};
use carlo_statepoint::{
    create_state_point, load_state_point, replay_to_restart, state_point_filename, Layout,
    LoadOptions, LoadWarning, ProcessRole, ProducerVersion, StatePointError, StatePointHeader,
    StatePointReader, StatePointWriter, PRODUCER_VERSION,
};
use carlo_test_utils::{criticality_state, fixed_source_state, SyntheticRun};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

const SHAPES: &[(u32, u32)] = &[(3, 2), (5, 1), (1, 4)];

fn master(layout: Layout) -> LoadOptions {
    LoadOptions {
        layout,
        role: ProcessRole::Master,
    }
}

/// Run `batches` synthetic batches and write a state point for the last one.
fn checkpointed_run(
    dir: &Path,
    batches: u32,
    n_inactive: u32,
    layout: Layout,
) -> (SimulationState, SyntheticRun) {
    let mut state = criticality_state(20, n_inactive, SHAPES, true);
    let mut run = SyntheticRun::new(7);
    run.run(&mut state, batches).unwrap();
    create_state_point(dir, batches, &state, layout).unwrap();
    (state, run)
}

fn assert_estimators_identical(a: &KeffEstimator, b: &KeffEstimator) {
    assert_eq!(a.n_realizations(), b.n_realizations());
    assert_eq!(a.sum().to_bits(), b.sum().to_bits());
    assert_eq!(a.sum_sq().to_bits(), b.sum_sq().to_bits());
    assert_eq!(a.mean().to_bits(), b.mean().to_bits());
    assert_eq!(a.std_dev().to_bits(), b.std_dev().to_bits());
}

// ── Round trip ──────────────────────────────────────────────────

#[test]
fn roundtrip_reproduces_everything_stored() {
    for layout in [Layout::Legacy, Layout::Framed] {
        let dir = tempfile::tempdir().unwrap();
        let (original, _) = checkpointed_run(dir.path(), 9, 4, layout);

        let mut resumed = criticality_state(20, 4, SHAPES, true);
        resumed.seed = 0;
        let path = dir.path().join(state_point_filename(9));
        let report = load_state_point(&path, &mut resumed, &master(layout)).unwrap();

        assert_eq!(report.restart_batch, 9);
        assert!(report.tallies_loaded);
        assert!(report.warnings.is_empty());
        assert_eq!(resumed.seed, original.seed);
        assert_eq!(resumed.config, original.config);
        assert_eq!(resumed.history, original.history);
        assert_eq!(resumed.global_tallies, original.global_tallies);
        assert_eq!(resumed.tallies, original.tallies);
    }
}

#[test]
fn loaded_config_overwrites_in_memory_config() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 6, 2, Layout::Framed);

    // Same tallies, different batch structure in memory.
    let mut resumed = criticality_state(50, 10, SHAPES, true);
    let path = dir.path().join(state_point_filename(6));
    load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert_eq!(resumed.config, RunConfig::criticality(1000, 20, 2));
}

#[test]
fn fixed_source_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = fixed_source_state(10, &[(2, 2)]);
    SyntheticRun::new(3).run(&mut state, 4).unwrap();
    let path = create_state_point(dir.path(), 4, &state, Layout::Framed).unwrap();

    let mut resumed = fixed_source_state(10, &[(2, 2)]);
    let report = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert!(report.tallies_loaded);
    assert!(resumed.history.is_empty());
    assert_eq!(resumed.tallies, state.tallies);
    assert_eq!(resumed.global_tallies, state.global_tallies);
}

// ── Restart consistency ─────────────────────────────────────────

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let (mut uninterrupted, run) = checkpointed_run(dir.path(), 8, 3, Layout::Framed);

    let mut resumed = criticality_state(20, 3, SHAPES, true);
    let path = dir.path().join(state_point_filename(8));
    load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert_eq!(replay_to_restart(&mut resumed).unwrap(), 8);

    assert_estimators_identical(&resumed.keff, &uninterrupted.keff);
    assert_eq!(resumed.tallies_on, uninterrupted.tallies_on);
    assert_eq!(resumed.current_batch, uninterrupted.current_batch);

    // Both continue with the same batch results.
    let mut run_a = run.clone();
    let mut run_b = run;
    run_a.run(&mut uninterrupted, 12).unwrap();
    run_b.run(&mut resumed, 12).unwrap();

    assert_estimators_identical(&resumed.keff, &uninterrupted.keff);
    assert_eq!(resumed.history, uninterrupted.history);
    assert_eq!(resumed.tallies, uninterrupted.tallies);
    assert_eq!(resumed.global_tallies, uninterrupted.global_tallies);
}

#[test]
fn second_replay_does_not_double_count() {
    let dir = tempfile::tempdir().unwrap();
    let (uninterrupted, _) = checkpointed_run(dir.path(), 4, 2, Layout::Framed);

    let mut resumed = criticality_state(20, 2, SHAPES, true);
    let path = dir.path().join(state_point_filename(4));
    load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    replay_to_restart(&mut resumed).unwrap();
    assert_eq!(replay_to_restart(&mut resumed).unwrap(), 4);

    assert_eq!(resumed.keff.n_realizations(), 2);
    assert_estimators_identical(&resumed.keff, &uninterrupted.keff);
}

#[test]
fn checkpoint_of_loaded_state_requires_replay() {
    let dir = tempfile::tempdir().unwrap();
    let (uninterrupted, _) = checkpointed_run(dir.path(), 6, 2, Layout::Framed);
    let path = dir.path().join(state_point_filename(6));

    let mut resumed = criticality_state(20, 2, SHAPES, true);
    load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();

    let again = tempfile::tempdir().unwrap();
    assert!(matches!(
        create_state_point(again.path(), 6, &resumed, Layout::Framed),
        Err(StatePointError::TalliesOff {
            batch: 6,
            n_inactive: 2
        })
    ));

    replay_to_restart(&mut resumed).unwrap();
    let rewritten = create_state_point(again.path(), 6, &resumed, Layout::Framed).unwrap();
    assert_eq!(std::fs::read(&rewritten).unwrap(), std::fs::read(&path).unwrap());

    let mut reloaded = criticality_state(20, 2, SHAPES, true);
    load_state_point(&rewritten, &mut reloaded, &master(Layout::Framed)).unwrap();
    assert_eq!(reloaded.tallies, uninterrupted.tallies);
}

#[test]
fn replay_matches_reference_values() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = criticality_state(10, 2, &[], false);
    for k in [0.9, 1.0, 1.1, 1.05] {
        state.begin_batch().unwrap();
        state.finalize_batch(k, None).unwrap();
    }
    let path = create_state_point(dir.path(), 4, &state, Layout::Legacy).unwrap();

    let mut resumed = criticality_state(10, 2, &[], false);
    load_state_point(&path, &mut resumed, &master(Layout::Legacy)).unwrap();
    replay_to_restart(&mut resumed).unwrap();

    assert_eq!(resumed.keff.n_realizations(), 2);
    assert!((resumed.keff.mean() - 1.075).abs() < 1e-12);
}

#[test]
fn restart_at_inactive_boundary_skips_stored_tallies() {
    let dir = tempfile::tempdir().unwrap();
    // Tallies switch on at the end of batch 3, so the writer emits the tally
    // section, but the reader only wants tallies past batch 3.
    let (original, _) = checkpointed_run(dir.path(), 3, 3, Layout::Framed);
    assert!(original.tallies_on);

    let mut resumed = criticality_state(20, 3, SHAPES, true);
    let path = dir.path().join(state_point_filename(3));
    let report = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert!(!report.tallies_loaded);
    assert!(!resumed.tallies_on);

    replay_to_restart(&mut resumed).unwrap();
    assert!(resumed.tallies_on);
    assert_eq!(resumed.keff.n_realizations(), 0);
}

// ── Revision and version gates ──────────────────────────────────

#[test]
fn revision_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 5, 2, Layout::Legacy);
    let path = dir.path().join(state_point_filename(5));

    let mut resumed = criticality_state(20, 2, SHAPES, true);
    let err = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap_err();
    assert!(matches!(
        err,
        StatePointError::RevisionMismatch {
            found: 1,
            expected: 2
        }
    ));
    assert_eq!(resumed.restart_batch, None);
}

#[test]
fn unknown_revision_fails_on_a_bare_tag() {
    let mut buf = Vec::new();
    write_u32_le(&mut buf, 41).unwrap();
    for layout in [Layout::Legacy, Layout::Framed] {
        assert!(matches!(
            StatePointReader::open(buf.as_slice(), layout),
            Err(StatePointError::RevisionMismatch { found: 41, .. })
        ));
    }
}

#[test]
fn version_mismatch_only_warns() {
    let state = {
        let mut s = criticality_state(20, 2, SHAPES, true);
        SyntheticRun::new(1).run(&mut s, 5).unwrap();
        s
    };
    let mut buf = Vec::new();
    StatePointWriter::new(&mut buf, Layout::Framed)
        .write(5, &state)
        .unwrap();

    let old = ProducerVersion {
        major: 0,
        minor: 0,
        release: 9,
    };
    let mut header = Vec::new();
    encode_header(
        &mut header,
        &StatePointHeader {
            revision: Layout::Framed.revision(),
            version: old,
        },
    )
    .unwrap();
    buf[..header.len()].copy_from_slice(&header);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("older.binary");
    std::fs::write(&path, &buf).unwrap();

    let mut resumed = criticality_state(20, 2, SHAPES, true);
    let report = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert_eq!(
        report.warnings,
        vec![LoadWarning::VersionMismatch {
            found: old,
            expected: PRODUCER_VERSION
        }]
    );
    assert_eq!(report.header.version, old);
    assert_eq!(resumed.tallies, state.tallies);
}

// ── Dimension gates ─────────────────────────────────────────────

#[test]
fn tally_shape_mismatch_names_the_tally() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 6, 2, Layout::Framed);
    let path = dir.path().join(state_point_filename(6));

    let mut resumed = criticality_state(20, 2, &[(3, 2), (5, 2), (1, 4)], true);
    match load_state_point(&path, &mut resumed, &master(Layout::Framed)) {
        Err(StatePointError::TallyShapeMismatch {
            index,
            id,
            found,
            expected,
        }) => {
            assert_eq!(index, 1);
            assert_eq!(id, TallyId(2));
            assert_eq!(found, (5, 1));
            assert_eq!(expected, (5, 2));
        }
        other => panic!("expected TallyShapeMismatch, got {other:?}"),
    }
    assert_eq!(resumed.restart_batch, None);
    assert!(resumed.history.is_empty());
}

#[test]
fn tally_count_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 6, 2, Layout::Legacy);
    let path = dir.path().join(state_point_filename(6));

    let mut resumed = criticality_state(20, 2, &[(3, 2)], true);
    let err = load_state_point(&path, &mut resumed, &master(Layout::Legacy)).unwrap_err();
    assert!(matches!(
        err,
        StatePointError::TallyCountMismatch {
            found: 3,
            expected: 1
        }
    ));
}

#[test]
fn tally_count_not_checked_before_active_batches() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 2, 4, Layout::Framed);
    let path = dir.path().join(state_point_filename(2));

    let mut resumed = criticality_state(20, 4, &[(9, 9)], true);
    let report = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap();
    assert!(!report.tallies_loaded);
    assert_eq!(resumed.tallies[&TallyId(1)].shape(), (9, 9));
}

#[test]
fn global_tally_count_mismatch_is_fatal() {
    let mut state = criticality_state(20, 2, &[], false);
    SyntheticRun::new(2).run(&mut state, 3).unwrap();
    let mut buf = Vec::new();
    StatePointWriter::new(&mut buf, Layout::Legacy)
        .write(3, &state)
        .unwrap();

    // header 16 + run 36 + 3 k values
    let offset = 16 + 36 + 3 * 8;
    buf[offset..offset + 4].copy_from_slice(&(N_GLOBAL_TALLIES as u32 + 1).to_le_bytes());

    let mut resumed = criticality_state(20, 2, &[], false);
    let result = StatePointReader::open(buf.as_slice(), Layout::Legacy)
        .unwrap()
        .load_into(&mut resumed, ProcessRole::Master);
    assert!(matches!(
        result,
        Err(StatePointError::GlobalTallyCountMismatch {
            found: 5,
            expected: 4
        })
    ));
}

#[test]
fn entropy_setting_must_match_writer() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 6, 2, Layout::Framed);
    let path = dir.path().join(state_point_filename(6));

    // Without entropy the reader takes the entropy array as the global
    // section; the framed prefix exposes the misalignment.
    let mut resumed = criticality_state(20, 2, SHAPES, false);
    let err = load_state_point(&path, &mut resumed, &master(Layout::Framed)).unwrap_err();
    assert!(matches!(
        err,
        StatePointError::GlobalTallyCountMismatch { found: 6, .. }
    ));
}

// ── Role gating ─────────────────────────────────────────────────

#[test]
fn worker_never_reads_tally_sections() {
    let mut state = criticality_state(20, 2, SHAPES, true);
    SyntheticRun::new(4).run(&mut state, 5).unwrap();
    let mut buf = Vec::new();
    StatePointWriter::new(&mut buf, Layout::Framed)
        .write(5, &state)
        .unwrap();

    // Cut the stream right after the entropy array.
    let history_end = 16 + 36 + 2 * (4 + 5 * 8);
    buf.truncate(history_end);

    // Mismatched tallies would fail on the master; the worker never looks.
    let mut worker = criticality_state(20, 2, &[(1, 1)], true);
    let report = StatePointReader::open(buf.as_slice(), Layout::Framed)
        .unwrap()
        .load_into(&mut worker, ProcessRole::Worker)
        .unwrap();
    assert!(!report.tallies_loaded);
    assert_eq!(worker.history, state.history);
    assert_eq!(worker.global_tallies, GlobalTallies::default());
    assert_eq!(worker.tallies[&TallyId(1)].shape(), (1, 1));

    // The master needs the sections that were cut.
    let mut master_state = criticality_state(20, 2, SHAPES, true);
    let result = StatePointReader::open(buf.as_slice(), Layout::Framed)
        .unwrap()
        .load_into(&mut master_state, ProcessRole::Master);
    assert!(matches!(result, Err(StatePointError::Io(_))));
}

#[test]
fn worker_replays_same_estimator_as_master() {
    let dir = tempfile::tempdir().unwrap();
    checkpointed_run(dir.path(), 7, 2, Layout::Framed);
    let path = dir.path().join(state_point_filename(7));

    let mut on_master = criticality_state(20, 2, SHAPES, true);
    load_state_point(&path, &mut on_master, &master(Layout::Framed)).unwrap();
    replay_to_restart(&mut on_master).unwrap();

    let mut on_worker = criticality_state(20, 2, SHAPES, true);
    load_state_point(&path, &mut on_worker, &LoadOptions::worker(Layout::Framed)).unwrap();
    replay_to_restart(&mut on_worker).unwrap();

    assert_estimators_identical(&on_master.keff, &on_worker.keff);
}

// ── Replay properties ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_equals_uninterrupted_estimator(
        ks in prop::collection::vec(0.8f64..1.2, 2..40),
        n_inactive in 0u32..10,
        cut in 0usize..40,
    ) {
        let n_batches = ks.len() as u32 + 1;
        prop_assume!(n_inactive < n_batches);
        let restart = (cut % ks.len()) as u32 + 1;

        let config = RunConfig::criticality(100, n_batches, n_inactive);
        let mut original =
            SimulationState::new(config.clone(), 1, Default::default()).unwrap();
        for &k in &ks[..restart as usize] {
            original.begin_batch().unwrap();
            original.finalize_batch(k, None).unwrap();
        }

        let mut buf = Vec::new();
        StatePointWriter::new(&mut buf, Layout::Framed)
            .write(restart, &original)
            .unwrap();

        let mut resumed = SimulationState::new(config, 1, Default::default()).unwrap();
        StatePointReader::open(buf.as_slice(), Layout::Framed)
            .unwrap()
            .load_into(&mut resumed, ProcessRole::Master)
            .unwrap();
        replay_to_restart(&mut resumed).unwrap();

        prop_assert_eq!(resumed.keff.n_realizations(), original.keff.n_realizations());
        prop_assert_eq!(resumed.keff.mean().to_bits(), original.keff.mean().to_bits());
        prop_assert_eq!(resumed.keff.std_dev().to_bits(), original.keff.std_dev().to_bits());
        prop_assert_eq!(resumed.tallies_on, original.tallies_on);
    }
}
