//! State-point reader.
//!
//! [`StatePointReader`] validates the header on construction, then decodes
//! the body against the allocated accumulators of a [`SimulationState`].
//! Nothing in the state changes unless the whole body decodes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use carlo_core::{CriticalityHistory, RunMode, SimulationState};
use tracing::{debug, info, warn};

use crate::codec::{
    decode_global_tallies, decode_history, decode_revision, decode_run, decode_tallies,
    decode_version,
};
use crate::error::StatePointError;
use crate::types::{
    Layout, LoadOptions, LoadReport, LoadWarning, ProcessRole, StatePoint, StatePointHeader,
    StatePointSummary,
};
use crate::PRODUCER_VERSION;

/// Reads a state point from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production code can
/// use `BufReader<File>`.
pub struct StatePointReader<R: Read> {
    reader: R,
    layout: Layout,
    header: StatePointHeader,
    warnings: Vec<LoadWarning>,
}

impl<R: Read> StatePointReader<R> {
    /// Open a state-point stream, reading and validating the header.
    ///
    /// The revision is read first and must match `layout`; on mismatch
    /// nothing further is read. A different producer version is logged and
    /// recorded as a [`LoadWarning`], and reading continues.
    pub fn open(mut reader: R, layout: Layout) -> Result<Self, StatePointError> {
        let revision = decode_revision(&mut reader)?;
        if revision != layout.revision() {
            return Err(StatePointError::RevisionMismatch {
                found: revision,
                expected: layout.revision(),
            });
        }

        let version = decode_version(&mut reader)?;
        let mut warnings = Vec::new();
        if version != PRODUCER_VERSION {
            let warning = LoadWarning::VersionMismatch {
                found: version,
                expected: PRODUCER_VERSION,
            };
            warn!(%warning, "loading state point from a different version");
            warnings.push(warning);
        }

        Ok(Self {
            reader,
            layout,
            header: StatePointHeader { revision, version },
            warnings,
        })
    }

    /// Header read from the stream.
    pub fn header(&self) -> &StatePointHeader {
        &self.header
    }

    /// Layout being decoded.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Advisory conditions found so far.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Decode the body, validating it against `state` without modifying it.
    ///
    /// Entropy is read iff `state` tracks entropy. Only a
    /// [`ProcessRole::Master`] reads the global-tally section, and the user
    /// tallies only when the stored batch is past the stored inactive count.
    pub fn read_state_point(
        mut self,
        state: &SimulationState,
        role: ProcessRole,
    ) -> Result<StatePoint, StatePointError> {
        let layout = self.layout;
        let r: &mut dyn Read = &mut self.reader;

        let (seed, config, batch) = decode_run(r)?;
        let entropy_on = state.history.entropy_on();
        let history = match config.run_mode {
            RunMode::Criticality => decode_history(r, layout, batch, entropy_on)?,
            RunMode::FixedSource => CriticalityHistory::new(entropy_on),
        };

        let (global_tallies, tallies) = match role {
            ProcessRole::Master => {
                let globals = decode_global_tallies(r, layout)?;
                let tallies = if batch > config.n_inactive {
                    Some(decode_tallies(r, layout, &state.tallies)?)
                } else {
                    None
                };
                (Some(globals), tallies)
            }
            ProcessRole::Worker => {
                debug!(batch, "worker skips tally sections");
                (None, None)
            }
        };

        Ok(StatePoint {
            header: self.header,
            seed,
            config,
            batch,
            history,
            global_tallies,
            tallies,
        })
    }

    /// Decode the body and overwrite `state` with it.
    ///
    /// On error `state` is left untouched.
    pub fn load_into(
        mut self,
        state: &mut SimulationState,
        role: ProcessRole,
    ) -> Result<LoadReport, StatePointError> {
        let warnings = std::mem::take(&mut self.warnings);
        let point = self.read_state_point(state, role)?;
        let report = LoadReport {
            header: point.header,
            restart_batch: point.batch,
            tallies_loaded: point.tallies.is_some(),
            warnings,
        };
        point.apply_to(state);
        Ok(report)
    }
}

/// Load the state point at `path` into `state`.
///
/// The path is taken as given; it need not follow the
/// `restart.<batch>.binary` naming.
pub fn load_state_point(
    path: &Path,
    state: &mut SimulationState,
    options: &LoadOptions,
) -> Result<LoadReport, StatePointError> {
    info!(path = %path.display(), "loading state point");
    let file = File::open(path)?;
    let reader = StatePointReader::open(BufReader::new(file), options.layout)?;
    let report = reader.load_into(state, options.role)?;
    info!(
        restart_batch = report.restart_batch,
        tallies = report.tallies_loaded,
        "loaded state point"
    );
    Ok(report)
}

/// Read the header and run section of the state point at `path` without
/// touching any simulation state.
///
/// Any known revision is accepted and reported as
/// [`StatePointSummary::layout`]; an unknown revision fails before the run
/// section is read.
pub fn read_header(path: &Path) -> Result<StatePointSummary, StatePointError> {
    let mut reader = BufReader::new(File::open(path)?);
    let revision = decode_revision(&mut reader)?;
    let layout = Layout::from_revision(revision)
        .ok_or(StatePointError::UnknownRevision { found: revision })?;
    let version = decode_version(&mut reader)?;
    let (seed, config, batch) = decode_run(&mut reader)?;
    Ok(StatePointSummary {
        header: StatePointHeader { revision, version },
        layout,
        seed,
        config,
        batch,
    })
}
