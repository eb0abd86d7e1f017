//! State-point writer.
//!
//! [`StatePointWriter`] encodes a [`SimulationState`] to any `Write` sink;
//! [`create_state_point`] writes one to `restart.<batch>.binary`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use carlo_core::{RunMode, SimulationState};
use tracing::info;

use crate::codec::{encode_global_tallies, encode_header, encode_history, encode_run, encode_tallies};
use crate::error::StatePointError;
use crate::types::{Layout, StatePointHeader};
use crate::{state_point_filename, PRODUCER_VERSION};

/// Writes state points to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production code
/// can use `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use carlo_core::{RunConfig, Settings, SimulationState};
/// use carlo_statepoint::{Layout, ProcessRole, StatePointReader, StatePointWriter};
///
/// let config = RunConfig::criticality(1000, 10, 1);
/// let mut state = SimulationState::new(config.clone(), 42, Settings::default()).unwrap();
/// for k in [0.98, 1.01] {
///     state.begin_batch().unwrap();
///     state.finalize_batch(k, None).unwrap();
/// }
///
/// let mut buf = Vec::new();
/// StatePointWriter::new(&mut buf, Layout::Framed)
///     .write(2, &state)
///     .unwrap();
///
/// let mut resumed = SimulationState::new(config, 0, Settings::default()).unwrap();
/// let report = StatePointReader::open(buf.as_slice(), Layout::Framed)
///     .unwrap()
///     .load_into(&mut resumed, ProcessRole::Master)
///     .unwrap();
/// assert_eq!(report.restart_batch, 2);
/// assert_eq!(resumed.seed, 42);
/// assert_eq!(resumed.history.k(2), Some(1.01));
/// ```
pub struct StatePointWriter<W: Write> {
    writer: W,
    layout: Layout,
}

impl<W: Write> StatePointWriter<W> {
    /// Create a writer producing the given layout.
    pub fn new(writer: W, layout: Layout) -> Self {
        Self { writer, layout }
    }

    /// Layout this writer produces.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Encode `state` as a state point for `batch`.
    ///
    /// The tally section is written only while `state.tallies_on` is set.
    /// An active batch with tallies off is rejected before anything is
    /// written.
    pub fn write(&mut self, batch: u32, state: &SimulationState) -> Result<(), StatePointError> {
        check_tally_section(batch, state)?;
        let w: &mut dyn Write = &mut self.writer;
        let header = StatePointHeader {
            revision: self.layout.revision(),
            version: PRODUCER_VERSION,
        };
        encode_header(w, &header)?;
        encode_run(w, state.seed, &state.config, batch)?;
        if state.config.run_mode == RunMode::Criticality {
            encode_history(w, self.layout, &state.history, batch)?;
        }
        encode_global_tallies(w, self.layout, &state.global_tallies)?;
        if state.tallies_on {
            encode_tallies(w, self.layout, &state.tallies)?;
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), StatePointError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Write a state point for `batch` into `dir`, replacing any existing file
/// of the same name, and return its path.
///
/// The file is complete only once this returns `Ok`; an interrupted write
/// leaves a file the reader rejects on structure.
pub fn create_state_point(
    dir: &Path,
    batch: u32,
    state: &SimulationState,
    layout: Layout,
) -> Result<PathBuf, StatePointError> {
    check_tally_section(batch, state)?;
    let path = dir.join(state_point_filename(batch));
    info!(batch, path = %path.display(), "creating state point");

    let file = File::create(&path)?;
    let mut writer = StatePointWriter::new(BufWriter::new(file), layout);
    writer.write(batch, state)?;
    writer.flush()?;
    Ok(path)
}

/// Readers expect the tally section iff `batch > n_inactive`.
fn check_tally_section(batch: u32, state: &SimulationState) -> Result<(), StatePointError> {
    let n_inactive = state.config.n_inactive;
    if batch > n_inactive && !state.tallies_on {
        return Err(StatePointError::TalliesOff { batch, n_inactive });
    }
    Ok(())
}
