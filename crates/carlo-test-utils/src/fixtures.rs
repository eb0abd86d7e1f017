//! Ready-made simulation states.
//!
//! Tallies get ids `1..=n` in the order their shapes are given.

use carlo_core::{RunConfig, Settings, SimulationState, TallySpec};

/// Settings with one tally per `(filters, scores)` shape.
pub fn tally_settings(shapes: &[(u32, u32)], entropy_on: bool) -> Settings {
    Settings {
        entropy_on,
        tallies: shapes
            .iter()
            .enumerate()
            .map(|(i, &(filters, scores))| TallySpec::new(i as u32 + 1, filters, scores))
            .collect(),
        ..Settings::default()
    }
}

/// Fresh criticality state with 1000 particles per batch and seed 42.
///
/// # Panics
///
/// Panics if the configuration is invalid.
pub fn criticality_state(
    n_batches: u32,
    n_inactive: u32,
    shapes: &[(u32, u32)],
    entropy_on: bool,
) -> SimulationState {
    SimulationState::new(
        RunConfig::criticality(1000, n_batches, n_inactive),
        42,
        tally_settings(shapes, entropy_on),
    )
    .expect("valid criticality fixture")
}

/// Fresh fixed-source state with 1000 particles per batch and seed 42.
///
/// # Panics
///
/// Panics if the configuration is invalid.
pub fn fixed_source_state(n_batches: u32, shapes: &[(u32, u32)]) -> SimulationState {
    SimulationState::new(
        RunConfig::fixed_source(1000, n_batches),
        42,
        tally_settings(shapes, false),
    )
    .expect("valid fixed-source fixture")
}
