//! Running k-effective estimator pooled over active batches.

/// Pooled first and second moments of k-effective.
///
/// Fed one batch value at a time. Both the uninterrupted batch loop and
/// restart replay go through [`add_realization`](Self::add_realization),
/// so a replayed estimator is bit-identical to the original.
///
/// # Examples
///
/// ```
/// use carlo_core::KeffEstimator;
///
/// let mut est = KeffEstimator::default();
/// est.add_realization(1.1);
/// est.add_realization(1.05);
/// assert_eq!(est.n_realizations(), 2);
/// assert!((est.mean() - 1.075).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeffEstimator {
    n_realizations: u32,
    sum: f64,
    sum_sq: f64,
    mean: f64,
    std_dev: f64,
}

impl KeffEstimator {
    /// Add an active batch's k-effective.
    ///
    /// The standard deviation divides by `n - 1` and is therefore NaN after
    /// the first realization.
    pub fn add_realization(&mut self, k: f64) {
        self.n_realizations += 1;
        self.sum += k;
        self.sum_sq += k * k;
        let n = f64::from(self.n_realizations);
        self.mean = self.sum / n;
        self.std_dev = ((self.sum_sq / n - self.mean * self.mean) / (n - 1.0)).sqrt();
    }

    /// Report an inactive batch: the estimate is that batch's value alone
    /// and the pooled moments are untouched.
    pub fn observe_inactive(&mut self, k: f64) {
        self.mean = k;
    }

    /// Active batches pooled so far.
    pub fn n_realizations(&self) -> u32 {
        self.n_realizations
    }

    /// Running sum of k.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Running sum of k².
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// Current k-effective estimate.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation of [`mean`](Self::mean).
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Back to the empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_realization_std_dev_is_nan() {
        let mut est = KeffEstimator::default();
        est.add_realization(1.02);
        assert_eq!(est.n_realizations(), 1);
        assert_eq!(est.mean(), 1.02);
        assert!(est.std_dev().is_nan());
    }

    #[test]
    fn two_realizations_match_hand_computation() {
        let mut est = KeffEstimator::default();
        est.add_realization(1.0);
        est.add_realization(1.2);
        assert!((est.mean() - 1.1).abs() < 1e-12);
        // sqrt(((1.0 + 1.44)/2 - 1.21) / 1) = 0.1
        assert!((est.std_dev() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn inactive_observation_only_moves_the_mean() {
        let mut est = KeffEstimator::default();
        est.observe_inactive(0.93);
        assert_eq!(est.mean(), 0.93);
        assert_eq!(est.n_realizations(), 0);
        assert_eq!(est.sum(), 0.0);
        assert_eq!(est.sum_sq(), 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut est = KeffEstimator::default();
        est.add_realization(1.0);
        est.add_realization(1.1);
        est.reset();
        assert_eq!(est, KeffEstimator::default());
    }

    proptest! {
        #[test]
        fn mean_is_average_of_realizations(ks in prop::collection::vec(0.5f64..1.5, 2..64)) {
            let mut est = KeffEstimator::default();
            for &k in &ks {
                est.add_realization(k);
            }
            let expected = ks.iter().sum::<f64>() / ks.len() as f64;
            prop_assert_eq!(est.n_realizations() as usize, ks.len());
            prop_assert!((est.mean() - expected).abs() < 1e-9);
        }
    }
}
