//! Detector invocation: package probes and forward the detector's answer.

use crate::data::SpikeTrain;
use crate::detect::types::{Detector, DetectorConfig, DetectorResult, Probe};
use crate::error::{LatencyError, Result};
use crate::inject::{EventPartition, InjectedData};
use tracing::debug;

/// Probes comparing one train across the two conditions.
///
/// Probe A aligns the train to condition 2 (which received the relocated
/// spikes), probe B to condition 1.
pub fn condition_probes<'a>(
    spikes: &'a SpikeTrain,
    partition: &'a EventPartition,
) -> (Probe<'a>, Probe<'a>) {
    (
        Probe::new(spikes, &partition.condition_2),
        Probe::new(spikes, &partition.condition_1),
    )
}

/// Make a single detector call and return its result unchanged.
///
/// The configuration is checked first; detector failures propagate as-is.
pub fn invoke_detector<D: Detector + ?Sized>(
    detector: &D,
    probe_a: Probe<'_>,
    probe_b: Probe<'_>,
    config: &DetectorConfig,
) -> Result<DetectorResult<D::Stats>> {
    config.validate()?;
    debug!(
        detector = detector.name(),
        spikes_a = probe_a.spikes.len(),
        events_a = probe_a.events.len(),
        spikes_b = probe_b.spikes.len(),
        events_b = probe_b.events.len(),
        "invoking detector"
    );
    detector.detect(probe_a, probe_b, config)
}

/// Run the detector on one unit of an injected dataset.
pub fn detect_unit<D: Detector + ?Sized>(
    detector: &D,
    injected: &InjectedData,
    unit_id: &str,
    config: &DetectorConfig,
) -> Result<DetectorResult<D::Stats>> {
    let unit = injected
        .recording
        .unit(unit_id)
        .ok_or_else(|| LatencyError::invalid(format!("unknown unit id '{}'", unit_id)))?;
    let (probe_a, probe_b) = condition_probes(&unit.spikes, &injected.partition);
    invoke_detector(detector, probe_a, probe_b, config)
}
