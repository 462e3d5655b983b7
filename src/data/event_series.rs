//! Event series: stimulus onset timestamps for one recording block.

use crate::data::spike_train::{check_finite, check_strictly_increasing};
use crate::error::{LatencyError, Result};
use serde::{Deserialize, Serialize};

/// Strictly increasing stimulus onset times (seconds).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct EventSeries {
    times: Vec<f64>,
}

impl EventSeries {
    /// Create an event series from onsets that are already strictly increasing.
    pub fn new(times: Vec<f64>) -> Result<Self> {
        check_strictly_increasing(&times, "event series")?;
        Ok(Self { times })
    }

    /// Create an event series from distinct onsets in any order.
    ///
    /// Unlike spike trains, repeated onsets are an error: two trials cannot
    /// start at the same instant.
    pub fn from_unsorted(mut times: Vec<f64>) -> Result<Self> {
        check_finite(&times, "event series")?;
        times.sort_by(f64::total_cmp);
        check_strictly_increasing(&times, "event series")?;
        Ok(Self { times })
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Check if there are no events.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Event onsets as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    /// Iterate over the onsets.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.times.iter()
    }

    /// Onset at position `idx`.
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.times.get(idx).copied()
    }
}

impl TryFrom<Vec<f64>> for EventSeries {
    type Error = LatencyError;

    fn try_from(times: Vec<f64>) -> Result<Self> {
        Self::new(times)
    }
}

impl From<EventSeries> for Vec<f64> {
    fn from(events: EventSeries) -> Self {
        events.times
    }
}
