//! Detector contract: probes, configuration and result.

use crate::data::{EventSeries, SpikeTrain};
use crate::error::{LatencyError, Result};
use serde::{Deserialize, Serialize};

/// One side of a two-sample comparison: a spike train aligned to an event series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Probe<'a> {
    pub spikes: &'a SpikeTrain,
    pub events: &'a EventSeries,
}

impl<'a> Probe<'a> {
    pub fn new(spikes: &'a SpikeTrain, events: &'a EventSeries) -> Self {
        Self { spikes, events }
    }
}

/// Detector settings, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Post-event window analysed by the detector (s).
    pub use_dur: f64,
    /// Number of resamples for the null distribution.
    pub resamp_num: u32,
    /// Significance threshold for the peak.
    pub peak_alpha: f64,
    /// Let the detector parallelize internally.
    pub use_par_pool: bool,
    /// Use direct quantile estimation instead of a Gumbel approximation.
    pub use_direct_quant: bool,
    /// Only consider onsets at positive latencies.
    pub restrict_neg: bool,
    /// Plotting level (0 = none).
    pub make_plots: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            use_dur: 1.0,
            resamp_num: 250,
            peak_alpha: 0.05,
            use_par_pool: false,
            use_direct_quant: false,
            restrict_neg: true,
            make_plots: 1,
        }
    }
}

impl DetectorConfig {
    /// Check the settings the detector contract constrains.
    pub fn validate(&self) -> Result<()> {
        if !self.use_dur.is_finite() || self.use_dur <= 0.0 {
            return Err(LatencyError::invalid(format!(
                "use_dur must be positive, got {}",
                self.use_dur
            )));
        }
        if self.resamp_num == 0 {
            return Err(LatencyError::invalid("resamp_num must be at least 1"));
        }
        if !(self.peak_alpha > 0.0 && self.peak_alpha <= 1.0) {
            return Err(LatencyError::invalid(format!(
                "peak_alpha must be in (0, 1], got {}",
                self.peak_alpha
            )));
        }
        Ok(())
    }
}

/// Detector output: onset estimate plus an opaque statistics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult<S> {
    /// Estimated onset latency (s); `None` when no significant onset was found.
    pub latency: Option<f64>,
    /// Detector-specific statistics, forwarded untouched.
    pub stats: S,
}

impl<S> DetectorResult<S> {
    pub fn new(latency: Option<f64>, stats: S) -> Self {
        Self { latency, stats }
    }

    /// True when the detector reported a significant onset.
    pub fn detected(&self) -> bool {
        self.latency.is_some()
    }
}

/// A two-sample onset-latency detector.
///
/// Implementations run the actual statistics; the pipeline only builds the
/// probes and forwards the result. Failures must come back as
/// `LatencyError::ExternalFailure` with the original detail; callers do not
/// retry.
pub trait Detector: Send + Sync {
    /// Statistics record returned alongside the estimate.
    type Stats;

    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Compare `probe_a` against `probe_b`.
    fn detect(
        &self,
        probe_a: Probe<'_>,
        probe_b: Probe<'_>,
        config: &DetectorConfig,
    ) -> Result<DetectorResult<Self::Stats>>;
}
