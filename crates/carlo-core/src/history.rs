//! Per-batch k-effective and entropy history.

use crate::error::StateError;

/// k-effective per batch, with an optional parallel entropy sequence.
///
/// Batches are 1-based. Entries are only meaningful through the current
/// (or restart) batch; recording batch `b` discards anything after it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CriticalityHistory {
    k_batch: Vec<f64>,
    entropy: Option<Vec<f64>>,
}

impl CriticalityHistory {
    /// Empty history, tracking entropy iff `entropy_on`.
    pub fn new(entropy_on: bool) -> Self {
        Self {
            k_batch: Vec::new(),
            entropy: entropy_on.then(Vec::new),
        }
    }

    /// Rebuild from stored sequences.
    ///
    /// Returns `None` if the entropy sequence length differs from the
    /// k-effective sequence length.
    pub fn from_parts(k_batch: Vec<f64>, entropy: Option<Vec<f64>>) -> Option<Self> {
        match &entropy {
            Some(h) if h.len() != k_batch.len() => None,
            _ => Some(Self { k_batch, entropy }),
        }
    }

    /// Whether entropy is tracked.
    pub fn entropy_on(&self) -> bool {
        self.entropy.is_some()
    }

    /// Number of recorded batches.
    pub fn len(&self) -> usize {
        self.k_batch.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.k_batch.is_empty()
    }

    /// k-effective of `batch`.
    pub fn k(&self, batch: u32) -> Option<f64> {
        let i = (batch as usize).checked_sub(1)?;
        self.k_batch.get(i).copied()
    }

    /// Entropy of `batch`, if tracked and recorded.
    pub fn entropy(&self, batch: u32) -> Option<f64> {
        let i = (batch as usize).checked_sub(1)?;
        self.entropy.as_ref()?.get(i).copied()
    }

    /// k-effective values for batches `1..=batch`.
    pub fn k_through(&self, batch: u32) -> Option<&[f64]> {
        self.k_batch.get(..batch as usize)
    }

    /// Entropy values for batches `1..=batch`, if tracked.
    pub fn entropy_through(&self, batch: u32) -> Option<&[f64]> {
        self.entropy.as_ref()?.get(..batch as usize)
    }

    /// Record `batch`'s values. Later entries are dropped and any gap before
    /// `batch` is padded with NaN.
    ///
    /// `entropy` is ignored when entropy is not tracked; a tracked history
    /// stores NaN when it is `None`. Batch 0 is rejected and leaves the
    /// history unchanged.
    pub fn record(&mut self, batch: u32, k: f64, entropy: Option<f64>) -> Result<(), StateError> {
        let i = (batch as usize)
            .checked_sub(1)
            .ok_or(StateError::InvalidBatch { batch })?;
        self.k_batch.resize(i, f64::NAN);
        self.k_batch.push(k);
        if let Some(h) = self.entropy.as_mut() {
            h.resize(i, f64::NAN);
            h.push(entropy.unwrap_or(f64::NAN));
        }
        Ok(())
    }
}
