//! Injection orchestration: redistribute spikes for the selected units of a recording.

use crate::data::{Recording, Unit};
use crate::error::{LatencyError, Result};
use crate::inject::partition::{partition_events_seeded, EventPartition};
use crate::inject::redistribute::{check_pairs, redistribute};
use crate::inject::types::{InjectedData, InjectionRecord, InjectionSpec};
use crate::random::unit_stream;
use rayon::prelude::*;
use tracing::{info, warn};

/// Partition the recording's events and inject the latency shift.
///
/// Equivalent to [`partition_events_seeded`] followed by
/// [`inject_with_partition`] with the same seed.
pub fn inject_recording(
    recording: &Recording,
    spec: &InjectionSpec,
    seed: u64,
    parallel: bool,
) -> Result<InjectedData> {
    // Fail on bad parameters before spending a permutation on the events.
    spec.validate()?;
    spec.unit_selector.resolve(&recording.unit_ids())?;

    let partition = partition_events_seeded(recording.events(), seed)?;
    inject_with_partition(recording, partition, spec, seed, parallel)
}

/// Inject the latency shift using an existing event partition.
///
/// Selected units are redistributed independently, each drawing from its own
/// random stream `(seed, unit_index)`, so the result does not depend on
/// `parallel` or on scheduling. Every other unit is copied unchanged.
pub fn inject_with_partition(
    recording: &Recording,
    partition: EventPartition,
    spec: &InjectionSpec,
    seed: u64,
    parallel: bool,
) -> Result<InjectedData> {
    spec.validate()?;
    let mask = spec.unit_selector.resolve(&recording.unit_ids())?;
    if partition.n_events() != recording.events().len() {
        return Err(LatencyError::invalid(format!(
            "partition holds {} events but the recording has {}",
            partition.n_events(),
            recording.events().len()
        )));
    }
    let (cond1, cond2) = partition.paired();
    check_pairs(cond1, cond2)?;

    let units = recording.units();
    let results: Vec<(Unit, Option<InjectionRecord>)> = if parallel {
        units
            .par_iter()
            .zip(mask.par_iter())
            .enumerate()
            .map(|(idx, (unit, &selected))| {
                inject_unit(idx, unit, selected, cond1, cond2, spec, seed)
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        units
            .iter()
            .zip(&mask)
            .enumerate()
            .map(|(idx, (unit, &selected))| {
                inject_unit(idx, unit, selected, cond1, cond2, spec, seed)
            })
            .collect::<Result<Vec<_>>>()?
    };

    let (new_units, records): (Vec<Unit>, Vec<Option<InjectionRecord>>) =
        results.into_iter().unzip();
    let records: Vec<InjectionRecord> = records.into_iter().flatten().collect();

    info!(
        n_units = units.len(),
        n_injected = records.len(),
        n_pairs = cond1.len(),
        n_moved = records.iter().map(|r| r.n_moved).sum::<usize>(),
        "injected latency shift"
    );

    let injected = Recording::new(recording.events().clone(), new_units)?;
    Ok(InjectedData {
        recording: injected,
        original: recording.clone(),
        partition,
        spec: spec.clone(),
        records,
        seed,
    })
}

fn inject_unit(
    idx: usize,
    unit: &Unit,
    selected: bool,
    cond1: &[f64],
    cond2: &[f64],
    spec: &InjectionSpec,
    seed: u64,
) -> Result<(Unit, Option<InjectionRecord>)> {
    if !selected {
        return Ok((unit.clone(), None));
    }

    let mut rng = unit_stream(seed, idx);
    let out = redistribute(&unit.spikes, cond1, cond2, spec, &mut rng)?;
    if out.stats.n_collapsed > 0 {
        warn!(
            unit = %unit.id,
            n_collapsed = out.stats.n_collapsed,
            "relocated spikes coincided with existing spikes and were merged"
        );
    }

    let record = InjectionRecord {
        unit_id: unit.id.clone(),
        unit_index: idx,
        n_spikes_before: unit.spikes.len(),
        n_spikes_after: out.train.len(),
        n_eligible: out.stats.n_eligible,
        n_moved: out.stats.n_moved,
        n_collapsed: out.stats.n_collapsed,
        n_empty_windows: out.stats.n_empty_windows,
        moved_per_event: out.stats.moved_per_event,
    };
    let injected = Unit::new(unit.id.clone(), out.train).with_quality(
        unit.good,
        unit.contamination,
        unit.area.clone(),
    );
    Ok((injected, Some(record)))
}
