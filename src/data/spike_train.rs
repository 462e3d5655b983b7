//! Spike train: strictly increasing spike timestamps for one recorded unit.

use crate::error::{LatencyError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Timestamps (seconds) of the spikes emitted by one unit.
///
/// Always strictly increasing and finite. Every constructor enforces this; the
/// redistributor re-sorts and drops exact duplicates itself, then builds the
/// new train through the validating [`SpikeTrain::new`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SpikeTrain {
    times: Vec<f64>,
}

impl SpikeTrain {
    /// Create a spike train from timestamps that are already strictly increasing.
    pub fn new(times: Vec<f64>) -> Result<Self> {
        check_strictly_increasing(&times, "spike train")?;
        Ok(Self { times })
    }

    /// Create a spike train from timestamps in any order.
    ///
    /// Sorts ascending and collapses exact duplicates. Non-finite values are rejected.
    pub fn from_unsorted(mut times: Vec<f64>) -> Result<Self> {
        check_finite(&times, "spike train")?;
        times.sort_by(f64::total_cmp);
        times.dedup();
        Ok(Self { times })
    }

    /// An empty spike train.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of spikes.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Check if the train has no spikes.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Spike timestamps as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    /// Iterate over the spike timestamps.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.times.iter()
    }

    /// Index range of the spikes falling in the half-open window `[start, end)`.
    pub fn window_range(&self, start: f64, end: f64) -> Range<usize> {
        let lo = self.times.partition_point(|&t| t < start);
        let hi = self.times.partition_point(|&t| t < end).max(lo);
        lo..hi
    }

    /// Spikes falling in the half-open window `[start, end)`.
    pub fn window(&self, start: f64, end: f64) -> &[f64] {
        &self.times[self.window_range(start, end)]
    }

    /// Bitwise equality, distinguishing `0.0` from `-0.0`.
    pub fn bit_identical(&self, other: &SpikeTrain) -> bool {
        self.times.len() == other.times.len()
            && self
                .times
                .iter()
                .zip(&other.times)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl TryFrom<Vec<f64>> for SpikeTrain {
    type Error = LatencyError;

    fn try_from(times: Vec<f64>) -> Result<Self> {
        Self::new(times)
    }
}

impl From<SpikeTrain> for Vec<f64> {
    fn from(train: SpikeTrain) -> Self {
        train.times
    }
}

impl<'a> IntoIterator for &'a SpikeTrain {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.times.iter()
    }
}

/// Reject NaN and infinite timestamps.
pub(crate) fn check_finite(values: &[f64], what: &str) -> Result<()> {
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(LatencyError::invalid(format!(
            "{} contains a non-finite timestamp at position {}",
            what, pos
        )));
    }
    Ok(())
}

/// Reject timestamps that are non-finite, out of order or repeated.
pub(crate) fn check_strictly_increasing(values: &[f64], what: &str) -> Result<()> {
    check_finite(values, what)?;
    if let Some(pos) = values.windows(2).position(|w| w[0] >= w[1]) {
        return Err(LatencyError::invalid(format!(
            "{} is not strictly increasing at position {} ({} >= {})",
            what,
            pos + 1,
            values[pos],
            values[pos + 1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_strictly_increasing() {
        let train = SpikeTrain::new(vec![0.1, 0.2, 0.5]).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(train.as_slice(), &[0.1, 0.2, 0.5]);
    }

    #[test]
    fn test_new_rejects_duplicates_and_disorder() {
        assert!(SpikeTrain::new(vec![0.1, 0.1]).is_err());
        assert!(SpikeTrain::new(vec![0.3, 0.2]).is_err());
        assert!(SpikeTrain::new(vec![0.1, f64::NAN]).is_err());
    }

    #[test]
    fn test_from_unsorted_sorts_and_dedups() {
        let train = SpikeTrain::from_unsorted(vec![0.3, 0.1, 0.2, 0.1]).unwrap();
        assert_eq!(train.as_slice(), &[0.1, 0.2, 0.3]);
        assert!(SpikeTrain::from_unsorted(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_window_is_half_open() {
        let train = SpikeTrain::new(vec![0.05, 0.1, 0.12, 0.2, 0.3]).unwrap();
        assert_eq!(train.window(0.1, 0.2), &[0.1, 0.12]);
        assert_eq!(train.window(0.21, 0.29), &[] as &[f64]);
        assert_eq!(train.window(0.5, 0.4), &[] as &[f64]);
    }

    #[test]
    fn test_serde_validates() {
        let train: SpikeTrain = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert_eq!(train.len(), 2);
        assert!(serde_json::from_str::<SpikeTrain>("[0.2, 0.1]").is_err());
    }

    #[test]
    fn test_bit_identical() {
        let a = SpikeTrain::new(vec![-0.0, 1.0]).unwrap();
        let b = SpikeTrain::new(vec![0.0, 1.0]).unwrap();
        assert!(a.bit_identical(&a.clone()));
        assert!(!a.bit_identical(&b));
    }
}
