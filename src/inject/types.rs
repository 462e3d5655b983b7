//! Core types for latency-shift injection.

use crate::data::Recording;
use crate::error::{LatencyError, Result};
use crate::inject::partition::EventPartition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which units receive the injected latency shift.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSelector {
    /// Every unit.
    #[default]
    All,
    /// No unit; the output equals the input.
    None,
    /// Units at these zero-based positions in the recording.
    Indices(Vec<usize>),
    /// Units with these identifiers.
    Ids(Vec<String>),
}

impl UnitSelector {
    /// Resolve to a per-unit mask over `unit_ids`.
    ///
    /// Unknown indices or identifiers are an `InvalidArgument` error.
    pub fn resolve(&self, unit_ids: &[&str]) -> Result<Vec<bool>> {
        let n = unit_ids.len();
        match self {
            UnitSelector::All => Ok(vec![true; n]),
            UnitSelector::None => Ok(vec![false; n]),
            UnitSelector::Indices(indices) => {
                let mut mask = vec![false; n];
                for &i in indices {
                    if i >= n {
                        return Err(LatencyError::invalid(format!(
                            "unit index {} out of range ({} units)",
                            i, n
                        )));
                    }
                    mask[i] = true;
                }
                Ok(mask)
            }
            UnitSelector::Ids(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
                let known: HashSet<&str> = unit_ids.iter().copied().collect();
                if let Some(missing) = ids.iter().find(|id| !known.contains(id.as_str())) {
                    return Err(LatencyError::invalid(format!("unknown unit id '{}'", missing)));
                }
                Ok(unit_ids.iter().map(|id| wanted.contains(id)).collect())
            }
        }
    }
}

/// Parameters of one injection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionSpec {
    /// Start of the eligible window, relative to each condition-1 event (s).
    pub window_start_offset: f64,
    /// Length of the eligible window (s).
    pub window_duration: f64,
    /// Fraction of eligible spikes to relocate per event, rounded up.
    pub fraction: f64,
    /// Extra offset added to every relocated spike (s).
    pub latency: f64,
    /// Units that receive the injection.
    pub unit_selector: UnitSelector,
}

impl Default for InjectionSpec {
    fn default() -> Self {
        Self {
            window_start_offset: 0.1,
            window_duration: 0.1,
            fraction: 0.25,
            latency: 0.0,
            unit_selector: UnitSelector::All,
        }
    }
}

impl InjectionSpec {
    /// Set the eligible window.
    pub fn with_window(mut self, start_offset: f64, duration: f64) -> Self {
        self.window_start_offset = start_offset;
        self.window_duration = duration;
        self
    }

    /// Set the relocated fraction.
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Set the injected latency.
    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = latency;
        self
    }

    /// Set the unit selector.
    pub fn with_selector(mut self, selector: UnitSelector) -> Self {
        self.unit_selector = selector;
        self
    }

    /// Check the numeric parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.window_start_offset.is_finite() {
            return Err(LatencyError::invalid("window_start_offset must be finite"));
        }
        if !self.window_duration.is_finite() || self.window_duration < 0.0 {
            return Err(LatencyError::invalid(format!(
                "window_duration must be finite and non-negative, got {}",
                self.window_duration
            )));
        }
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(LatencyError::invalid(format!(
                "fraction must be in [0, 1], got {}",
                self.fraction
            )));
        }
        if !self.latency.is_finite() {
            return Err(LatencyError::invalid("latency must be finite"));
        }
        Ok(())
    }

    /// Earliest post-event time at which the two conditions differ.
    ///
    /// Condition 1 loses spikes from `window_start_offset` on; condition 2
    /// gains them from `window_start_offset + latency` on.
    pub fn expected_onset(&self) -> f64 {
        self.window_start_offset + self.latency.min(0.0)
    }
}

/// Per-unit bookkeeping of one injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRecord {
    /// Unit identifier.
    pub unit_id: String,
    /// Position of the unit in the recording.
    pub unit_index: usize,
    /// Spike count before injection.
    pub n_spikes_before: usize,
    /// Spike count after injection.
    pub n_spikes_after: usize,
    /// Spikes found in eligible windows, summed over events.
    pub n_eligible: usize,
    /// Spikes relocated, summed over events.
    pub n_moved: usize,
    /// Relocated spikes that landed exactly on another spike and merged.
    pub n_collapsed: usize,
    /// Events whose eligible window held no spikes.
    pub n_empty_windows: usize,
    /// Spikes relocated for each event pair.
    pub moved_per_event: Vec<usize>,
}

/// Ground truth a detector result is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Units that received the injection.
    pub injected_units: Vec<String>,
    /// Units left untouched.
    pub control_units: Vec<String>,
    /// Injected latency (s).
    pub latency: f64,
    /// Expected onset of the difference between conditions (s).
    pub expected_onset: f64,
    /// Nominal relocated fraction.
    pub fraction: f64,
}

/// Result of an injection run: modified recording plus everything needed to score it.
#[derive(Debug, Clone)]
pub struct InjectedData {
    /// Recording with injected units modified, other units untouched.
    pub recording: Recording,
    /// Recording before injection.
    pub original: Recording,
    /// Event partition the injection was built on.
    pub partition: EventPartition,
    /// Parameters used.
    pub spec: InjectionSpec,
    /// One record per injected unit, in recording order.
    pub records: Vec<InjectionRecord>,
    /// Top-level random seed.
    pub seed: u64,
}

impl InjectedData {
    /// Check if a unit was injected.
    pub fn is_injected(&self, unit_id: &str) -> bool {
        self.records.iter().any(|r| r.unit_id == unit_id)
    }

    /// Injection record for a unit.
    pub fn record(&self, unit_id: &str) -> Option<&InjectionRecord> {
        self.records.iter().find(|r| r.unit_id == unit_id)
    }

    /// Total spikes relocated across all units.
    pub fn total_moved(&self) -> usize {
        self.records.iter().map(|r| r.n_moved).sum()
    }

    /// Ground truth for scoring detector output.
    pub fn ground_truth(&self) -> GroundTruth {
        let (injected, control): (Vec<_>, Vec<_>) = self
            .recording
            .units()
            .iter()
            .map(|u| u.id.clone())
            .partition(|id| self.is_injected(id));
        GroundTruth {
            injected_units: injected,
            control_units: control,
            latency: self.spec.latency,
            expected_onset: self.spec.expected_onset(),
            fraction: self.spec.fraction,
        }
    }
}
