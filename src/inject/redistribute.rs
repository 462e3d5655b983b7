//! Spike redistribution: move a fraction of windowed spikes to the paired event.

use crate::data::SpikeTrain;
use crate::error::{LatencyError, Result};
use crate::inject::types::InjectionSpec;
use crate::random::permute;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Counts describing one redistribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedistributionStats {
    /// Event pairs processed.
    pub n_events: usize,
    /// Spikes found in eligible windows, summed over events.
    pub n_eligible: usize,
    /// Spikes relocated.
    pub n_moved: usize,
    /// Relocated spikes merged with an identical timestamp.
    pub n_collapsed: usize,
    /// Events whose window held no spikes.
    pub n_empty_windows: usize,
    /// Spikes relocated per event pair.
    pub moved_per_event: Vec<usize>,
}

/// A redistributed spike train and its bookkeeping.
#[derive(Debug, Clone)]
pub struct Redistribution {
    pub train: SpikeTrain,
    pub stats: RedistributionStats,
}

/// Relocate spikes from condition-1 windows to the paired condition-2 events.
///
/// For each pair `j`, the spikes of the current train inside
/// `[cond1[j] + offset, cond1[j] + offset + duration)` are eligible;
/// `ceil(eligible * fraction)` of them are drawn without replacement and
/// moved to `t - cond1[j] + cond2[j] + latency`. Pairs are processed in
/// order and each sees the train as updated by the previous ones.
///
/// The input train is not modified. Spikes are only relocated, never created
/// or dropped, except when a relocated timestamp lands exactly on another
/// spike: the two merge and the loss is reported in `n_collapsed`.
///
/// Mismatched pair lengths, non-finite event times and an invalid `spec` are
/// rejected before any spike is moved.
pub fn redistribute<R: Rng + ?Sized>(
    train: &SpikeTrain,
    cond1: &[f64],
    cond2: &[f64],
    spec: &InjectionSpec,
    rng: &mut R,
) -> Result<Redistribution> {
    spec.validate()?;
    check_pairs(cond1, cond2)?;

    let mut spikes: Vec<f64> = train.as_slice().to_vec();
    let mut stats = RedistributionStats {
        n_events: cond1.len(),
        moved_per_event: Vec::with_capacity(cond1.len()),
        ..Default::default()
    };

    for (j, (&e1, &e2)) in cond1.iter().zip(cond2).enumerate() {
        let start = e1 + spec.window_start_offset;
        let end = start + spec.window_duration;
        let lo = spikes.partition_point(|&t| t < start);
        let hi = spikes.partition_point(|&t| t < end).max(lo);
        let n_window = hi - lo;

        if n_window == 0 {
            stats.n_empty_windows += 1;
            stats.moved_per_event.push(0);
            continue;
        }
        stats.n_eligible += n_window;

        let k = ((n_window as f64 * spec.fraction).ceil() as usize).min(n_window);
        if k == 0 {
            stats.moved_per_event.push(0);
            continue;
        }

        let picks = permute(n_window, k, rng)?;
        let mut taken = vec![false; n_window];
        let mut relocated = Vec::with_capacity(k);
        for &p in &picks {
            taken[p] = true;
            relocated.push(spikes[lo + p] - e1 + e2 + spec.latency);
        }

        let mut next: Vec<f64> = Vec::with_capacity(spikes.len());
        next.extend_from_slice(&spikes[..lo]);
        next.extend(
            spikes[lo..hi]
                .iter()
                .zip(&taken)
                .filter(|&(_, &t)| !t)
                .map(|(&s, _)| s),
        );
        next.extend_from_slice(&spikes[hi..]);
        next.extend(relocated);

        let before = next.len();
        next.sort_by(f64::total_cmp);
        next.dedup();
        let collapsed = before - next.len();

        trace!(event = j, n_window, moved = k, collapsed, "relocated spikes");
        stats.n_moved += k;
        stats.n_collapsed += collapsed;
        stats.moved_per_event.push(k);
        spikes = next;
    }

    debug!(
        n_events = stats.n_events,
        n_eligible = stats.n_eligible,
        n_moved = stats.n_moved,
        n_collapsed = stats.n_collapsed,
        "redistributed spike train"
    );

    Ok(Redistribution {
        train: SpikeTrain::new(spikes)?,
        stats,
    })
}

/// Paired event slices must have equal length and finite values.
pub(crate) fn check_pairs(cond1: &[f64], cond2: &[f64]) -> Result<()> {
    if cond1.len() != cond2.len() {
        return Err(LatencyError::invalid(format!(
            "paired event series differ in length: {} vs {}",
            cond1.len(),
            cond2.len()
        )));
    }
    if cond1.iter().chain(cond2).any(|t| !t.is_finite()) {
        return Err(LatencyError::invalid("event times must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::unit_stream;
    use approx::assert_relative_eq;

    fn spec(offset: f64, duration: f64, fraction: f64, latency: f64) -> InjectionSpec {
        InjectionSpec::default()
            .with_window(offset, duration)
            .with_fraction(fraction)
            .with_latency(latency)
    }

    #[test]
    fn test_single_spike_relocation() {
        let train = SpikeTrain::new(vec![0.05, 0.12, 0.20, 0.30]).unwrap();
        let out = redistribute(
            &train,
            &[0.0],
            &[1.0],
            &spec(0.1, 0.1, 0.25, 0.0),
            &mut unit_stream(1, 0),
        )
        .unwrap();

        // Window [0.1, 0.2) holds only 0.12; ceil(1 * 0.25) = 1 spike moves.
        let times = out.train.as_slice();
        assert_eq!(times.len(), 4);
        assert_eq!(&times[..3], &[0.05, 0.20, 0.30]);
        assert_relative_eq!(times[3], 1.12, epsilon = 1e-12);
        assert_eq!(out.stats.n_eligible, 1);
        assert_eq!(out.stats.n_moved, 1);
        assert_eq!(out.stats.moved_per_event, vec![1]);
    }

    #[test]
    fn test_zero_fraction_is_identity() {
        let train = SpikeTrain::new(vec![0.11, 0.13, 0.15, 1.12, 1.5]).unwrap();
        let out = redistribute(
            &train,
            &[0.0, 1.0],
            &[2.0, 3.0],
            &spec(0.1, 0.1, 0.0, 0.05),
            &mut unit_stream(1, 0),
        )
        .unwrap();
        assert!(out.train.bit_identical(&train));
        assert_eq!(out.stats.n_moved, 0);
        assert_eq!(out.stats.n_eligible, 4);
    }

    #[test]
    fn test_full_fraction_moves_whole_window() {
        let train = SpikeTrain::new(vec![0.11, 0.13, 0.15, 0.5]).unwrap();
        let out = redistribute(
            &train,
            &[0.0],
            &[2.0],
            &spec(0.1, 0.1, 1.0, 0.01),
            &mut unit_stream(4, 0),
        )
        .unwrap();
        let times = out.train.as_slice();
        assert_eq!(times.len(), 4);
        assert_eq!(times[0], 0.5);
        assert_relative_eq!(times[1], 2.12, epsilon = 1e-12);
        assert_relative_eq!(times[2], 2.14, epsilon = 1e-12);
        assert_relative_eq!(times[3], 2.16, epsilon = 1e-12);
    }

    #[test]
    fn test_fraction_rounds_up() {
        // 3 eligible spikes * 0.5 = 1.5 -> 2 moved.
        let train = SpikeTrain::new(vec![0.11, 0.13, 0.15]).unwrap();
        let out = redistribute(
            &train,
            &[0.0],
            &[5.0],
            &spec(0.1, 0.1, 0.5, 0.0),
            &mut unit_stream(2, 0),
        )
        .unwrap();
        assert_eq!(out.stats.n_moved, 2);
        assert_eq!(out.train.window(0.1, 0.2).len(), 1);
        assert_eq!(out.train.window(5.1, 5.2).len(), 2);
    }

    #[test]
    fn test_empty_windows_are_skipped() {
        let train = SpikeTrain::new(vec![0.5, 0.9]).unwrap();
        let out = redistribute(
            &train,
            &[0.0, 1.0],
            &[2.0, 3.0],
            &spec(0.1, 0.1, 1.0, 0.0),
            &mut unit_stream(1, 0),
        )
        .unwrap();
        assert!(out.train.bit_identical(&train));
        assert_eq!(out.stats.n_empty_windows, 2);
        assert_eq!(out.stats.moved_per_event, vec![0, 0]);
    }

    #[test]
    fn test_later_pairs_see_relocated_spikes() {
        // Pair 0 moves 0.15 to 1.15, which falls in pair 1's window [1.1, 1.2).
        let train = SpikeTrain::new(vec![0.15]).unwrap();
        let out = redistribute(
            &train,
            &[0.0, 1.0],
            &[1.0, 3.0],
            &spec(0.1, 0.1, 1.0, 0.0),
            &mut unit_stream(1, 0),
        )
        .unwrap();
        assert_eq!(out.train.len(), 1);
        assert_relative_eq!(out.train.as_slice()[0], 3.15, epsilon = 1e-12);
        assert_eq!(out.stats.moved_per_event, vec![1, 1]);
    }

    #[test]
    fn test_coincident_relocation_collapses() {
        // 0.125 - 0.0 + 1.0 lands exactly on the existing 1.125.
        let train = SpikeTrain::new(vec![0.125, 1.125]).unwrap();
        let out = redistribute(
            &train,
            &[0.0],
            &[1.0],
            &spec(0.1, 0.1, 1.0, 0.0),
            &mut unit_stream(1, 0),
        )
        .unwrap();
        assert_eq!(out.train.as_slice(), &[1.125]);
        assert_eq!(out.stats.n_collapsed, 1);
    }

    #[test]
    fn test_invalid_arguments() {
        let train = SpikeTrain::new(vec![0.15]).unwrap();
        let mut rng = unit_stream(1, 0);
        let ok = spec(0.1, 0.1, 0.5, 0.0);

        let err = redistribute(&train, &[0.0, 1.0], &[1.0], &ok, &mut rng).unwrap_err();
        assert!(err.is_invalid_argument());

        let bad_fraction = spec(0.1, 0.1, 1.2, 0.0);
        assert!(redistribute(&train, &[0.0], &[1.0], &bad_fraction, &mut rng).is_err());

        let bad_window = spec(0.1, -0.1, 0.5, 0.0);
        assert!(redistribute(&train, &[0.0], &[1.0], &bad_window, &mut rng).is_err());

        assert!(redistribute(&train, &[f64::NAN], &[1.0], &ok, &mut rng).is_err());
    }

    #[test]
    fn test_reproducible_with_same_stream() {
        let train = SpikeTrain::new((0..200).map(|i| i as f64 * 0.01).collect()).unwrap();
        let cond1 = [0.0, 0.5, 1.0];
        let cond2 = [0.2, 0.7, 1.3];
        let s = spec(0.05, 0.2, 0.3, 0.02);
        let a = redistribute(&train, &cond1, &cond2, &s, &mut unit_stream(11, 2)).unwrap();
        let b = redistribute(&train, &cond1, &cond2, &s, &mut unit_stream(11, 2)).unwrap();
        assert!(a.train.bit_identical(&b.train));
        assert_eq!(a.stats, b.stats);
    }
}
