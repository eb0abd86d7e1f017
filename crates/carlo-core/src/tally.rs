//! Tally accumulators: per-batch sums and sums of squares.
//!
//! A tally cell collects one value per active batch. After `n` batches the
//! sample mean and its standard deviation follow from the two moments, so
//! only `(sum, sum_sq)` is stored and checkpointed.

use std::fmt;

use crate::error::StateError;

/// Number of global tallies every run carries.
pub const N_GLOBAL_TALLIES: usize = 4;

/// Identifies a user tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TallyId(pub u32);

impl fmt::Display for TallyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TallyId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

// ── TallyCell ──────────────────────────────────────────────────────

/// First and second moment of one tallied quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TallyCell {
    /// Sum of per-batch values.
    pub sum: f64,
    /// Sum of squared per-batch values.
    pub sum_sq: f64,
}

impl TallyCell {
    /// Add one batch's value.
    pub fn accumulate(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Sample mean and standard deviation of the mean over `n` realizations.
    ///
    /// Undefined (NaN or infinite) for `n < 2`.
    pub fn statistics(&self, n: u32) -> (f64, f64) {
        let n = f64::from(n);
        let mean = self.sum / n;
        let std_dev = ((self.sum_sq / n - mean * mean) / (n - 1.0)).sqrt();
        (mean, std_dev)
    }
}

// ── Global tallies ─────────────────────────────────────────────────

/// The run-wide tallies, in their fixed storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalTally {
    /// Analog estimate of k-effective.
    KAnalog,
    /// Collision estimate of k-effective.
    KCollision,
    /// Track-length estimate of k-effective.
    KTracklength,
    /// Fraction of particles leaking from the geometry.
    Leakage,
}

impl GlobalTally {
    /// All global tallies in storage order.
    pub const ALL: [GlobalTally; N_GLOBAL_TALLIES] = [
        Self::KAnalog,
        Self::KCollision,
        Self::KTracklength,
        Self::Leakage,
    ];

    /// Storage index.
    pub fn index(self) -> usize {
        match self {
            Self::KAnalog => 0,
            Self::KCollision => 1,
            Self::KTracklength => 2,
            Self::Leakage => 3,
        }
    }
}

/// Fixed array of [`N_GLOBAL_TALLIES`] accumulators.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalTallies {
    cells: [TallyCell; N_GLOBAL_TALLIES],
}

impl GlobalTallies {
    /// Build from stored moments.
    pub fn from_cells(cells: [TallyCell; N_GLOBAL_TALLIES]) -> Self {
        Self { cells }
    }

    /// Accumulator for one global tally.
    pub fn get(&self, tally: GlobalTally) -> &TallyCell {
        &self.cells[tally.index()]
    }

    /// Add one batch's value to a global tally.
    pub fn accumulate(&mut self, tally: GlobalTally, value: f64) {
        self.cells[tally.index()].accumulate(value);
    }

    /// All cells in storage order.
    pub fn cells(&self) -> &[TallyCell; N_GLOBAL_TALLIES] {
        &self.cells
    }
}

// ── TallyAccumulator ───────────────────────────────────────────────

/// Filter-bin by score-bin grid of accumulators for one user tally.
///
/// Cells are stored filter-major: `index = filter * n_score_bins + score`.
///
/// # Examples
///
/// ```
/// use carlo_core::{TallyAccumulator, TallyId};
///
/// let mut tally = TallyAccumulator::new(TallyId(1), 2, 3);
/// tally.accumulate(1, 2, 0.5).unwrap();
/// tally.accumulate(1, 2, 0.25).unwrap();
///
/// let cell = tally.cell(1, 2).unwrap();
/// assert_eq!(cell.sum, 0.75);
/// assert_eq!(cell.sum_sq, 0.3125);
/// assert!(tally.accumulate(2, 0, 1.0).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TallyAccumulator {
    id: TallyId,
    n_filter_bins: u32,
    n_score_bins: u32,
    cells: Vec<TallyCell>,
}

impl TallyAccumulator {
    /// Zeroed accumulator with the given shape.
    pub fn new(id: TallyId, n_filter_bins: u32, n_score_bins: u32) -> Self {
        let len = n_filter_bins as usize * n_score_bins as usize;
        Self {
            id,
            n_filter_bins,
            n_score_bins,
            cells: vec![TallyCell::default(); len],
        }
    }

    /// Tally identifier.
    pub fn id(&self) -> TallyId {
        self.id
    }

    /// `(n_filter_bins, n_score_bins)`.
    pub fn shape(&self) -> (u32, u32) {
        (self.n_filter_bins, self.n_score_bins)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, filter: u32, score: u32) -> Option<usize> {
        (filter < self.n_filter_bins && score < self.n_score_bins)
            .then(|| filter as usize * self.n_score_bins as usize + score as usize)
    }

    /// Accumulator for one bin pair.
    pub fn cell(&self, filter: u32, score: u32) -> Option<&TallyCell> {
        self.index(filter, score).map(|i| &self.cells[i])
    }

    /// Add one batch's value to a bin pair.
    pub fn accumulate(&mut self, filter: u32, score: u32, value: f64) -> Result<(), StateError> {
        let i = self
            .index(filter, score)
            .ok_or(StateError::BinOutOfRange {
                id: self.id,
                filter,
                score,
                shape: self.shape(),
            })?;
        self.cells[i].accumulate(value);
        Ok(())
    }

    /// All cells, filter-major.
    pub fn cells(&self) -> &[TallyCell] {
        &self.cells
    }

    /// Mutable access to all cells, filter-major.
    pub fn cells_mut(&mut self) -> &mut [TallyCell] {
        &mut self.cells
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        self.cells.fill(TallyCell::default());
    }
}
