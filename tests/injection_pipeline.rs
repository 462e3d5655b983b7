//! Integration tests for the latency injection pipeline.

use approx::assert_relative_eq;
use latency_inject::prelude::*;
use tempfile::tempdir;

/// Create a synthetic recording with known structure.
///
/// - 40 events, 1.5 s apart
/// - 6 units firing on a jittered 7 ms grid, offset per unit
/// - units 0-3 in "Primary visual area", unit 4 in "Thalamus"
/// - unit 5 is uncurated and contaminated
fn create_synthetic_recording() -> Recording {
    let events = EventSeries::new((0..40).map(|i| 1.0 + i as f64 * 1.5).collect()).unwrap();

    let mut seed = 42u64;
    let mut jitter = || {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((seed >> 16) & 0x7FFF) as f64 / 32768.0 * 0.003
    };

    let units = (0..6)
        .map(|u| {
            let times: Vec<f64> = (0..9000)
                .map(|i| i as f64 * 0.007 + 0.0011 * u as f64 + jitter())
                .collect();
            let spikes = SpikeTrain::from_unsorted(times).unwrap();
            let (good, contamination, area) = match u {
                4 => (true, 0.0, "Thalamus"),
                5 => (false, 0.4, "Primary visual area"),
                _ => (u % 2 == 0, 0.05, "Primary visual area"),
            };
            Unit::new(format!("cluster{}", u + 1), spikes).with_quality(good, contamination, area)
        })
        .collect();

    Recording::new(events, units).unwrap()
}

#[test]
fn test_documented_single_shift() {
    // One condition-1 onset at 1.0 paired with a condition-2 onset at 2.0.
    let train = SpikeTrain::new(vec![1.12]).unwrap();
    let cond1 = EventSeries::new(vec![1.0]).unwrap();
    let cond2 = EventSeries::new(vec![2.0]).unwrap();
    let spec = InjectionSpec::default().with_fraction(1.0).with_latency(0.0);
    let mut rng = unit_stream(0, 0);

    let out = redistribute(&train, cond1.as_slice(), cond2.as_slice(), &spec, &mut rng).unwrap();
    assert_eq!(out.train.len(), 1);
    assert_relative_eq!(out.train.as_slice()[0], 2.12, epsilon = 1e-12);
}

#[test]
fn test_tsv_round_trip_then_inject() {
    let recording = create_synthetic_recording();
    let dir = tempdir().unwrap();
    recording.to_tsv_dir(dir.path()).unwrap();
    let loaded = Recording::from_tsv_dir(dir.path()).unwrap();
    assert_eq!(loaded, recording);

    let run = Experiment::new()
        .seed(1)
        .latency(0.02)
        .select(UnitSelector::Indices(vec![0, 2]))
        .inject(&loaded)
        .unwrap();

    // cluster5 is in the thalamus, cluster6 is contaminated.
    assert_eq!(run.removed_units, vec!["cluster5", "cluster6"]);
    let truth = run.injected.ground_truth();
    assert_eq!(truth.injected_units, vec!["cluster1", "cluster3"]);
    assert_eq!(truth.control_units, vec!["cluster2", "cluster4"]);
    assert_relative_eq!(truth.expected_onset, 0.1);
}

#[test]
fn test_spike_conservation_and_controls() {
    let recording = create_synthetic_recording();
    let spec = InjectionSpec::default()
        .with_latency(0.015)
        .with_selector(UnitSelector::Ids(vec!["cluster2".into()]));
    let injected = inject_recording(&recording, &spec, 9, false).unwrap();

    for unit in injected.recording.units() {
        let original = recording.unit(&unit.id).unwrap();
        if injected.is_injected(&unit.id) {
            let record = injected.record(&unit.id).unwrap();
            assert_eq!(record.n_spikes_before, original.spikes.len());
            assert_eq!(
                record.n_spikes_after + record.n_collapsed,
                record.n_spikes_before
            );
            assert!(record.n_moved > 0);
        } else {
            assert!(unit.spikes.bit_identical(&original.spikes));
        }
    }
    assert_eq!(injected.records.len(), 1);
}

#[test]
fn test_relocated_spikes_land_in_shifted_windows() {
    let recording = create_synthetic_recording();
    let spec = InjectionSpec::default()
        .with_fraction(0.5)
        .with_latency(0.03)
        .with_selector(UnitSelector::Indices(vec![1]));
    let injected = inject_recording(&recording, &spec, 5, false).unwrap();

    let before = &recording.units()[1].spikes;
    let after = &injected.recording.units()[1].spikes;
    let (cond1, cond2) = injected.partition.paired();
    assert_eq!(injected.records[0].n_collapsed, 0);

    for (&e1, &e2) in cond1.iter().zip(cond2) {
        let src_before = before.window(e1 + 0.1, e1 + 0.2).len();
        let src_after = after.window(e1 + 0.1, e1 + 0.2).len();
        let moved = src_before - src_after;
        assert_eq!(moved, (src_before as f64 * 0.5).ceil() as usize);

        // Every moved spike reappears 30 ms later relative to the condition-2 onset.
        let dst_before = before.window(e2 + 0.13, e2 + 0.23).len();
        let dst_after = after.window(e2 + 0.13, e2 + 0.23).len();
        assert_eq!(dst_after, dst_before + moved);
    }
}

#[test]
fn test_reproducibility() {
    let recording = create_synthetic_recording();
    let spec = InjectionSpec::default().with_latency(0.01);

    let a = inject_recording(&recording, &spec, 1, false).unwrap();
    let b = inject_recording(&recording, &spec, 1, true).unwrap();
    assert_eq!(a.partition, b.partition);
    assert_eq!(a.records, b.records);
    for (ua, ub) in a.recording.units().iter().zip(b.recording.units()) {
        assert!(ua.spikes.bit_identical(&ub.spikes));
    }

    let c = inject_recording(&recording, &spec, 2, false).unwrap();
    assert_ne!(a.partition, c.partition);
}

#[test]
fn test_explicit_partition() {
    let recording = create_synthetic_recording();
    let partition = partition_events_seeded(recording.events(), 3).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("partition.tsv");
    partition.to_tsv(&path).unwrap();
    let reloaded = EventPartition::from_tsv(&path).unwrap();
    assert_eq!(reloaded, partition);

    let spec = InjectionSpec::default();
    let via_partition = inject_with_partition(&recording, reloaded, &spec, 3, false).unwrap();
    let direct = inject_recording(&recording, &spec, 3, false).unwrap();
    assert_eq!(via_partition.records, direct.records);
}

#[test]
fn test_full_validation_with_canned_detector() {
    let recording = create_synthetic_recording();
    let config = Experiment::new()
        .select(UnitSelector::Indices(vec![0, 1]))
        .tolerance(0.005)
        .to_config()
        .clone();

    // Injected units answer near 100 ms, controls stay silent.
    let detector = CannedDetector::new(DetectorResult::new(None, 0.5)).with_script(vec![
        CannedResponse::Result(DetectorResult::new(Some(0.102), 0.001)),
        CannedResponse::Result(DetectorResult::new(Some(0.099), 0.002)),
    ]);

    let result = run_injection_validation(&recording, &config, &detector).unwrap();
    assert_eq!(detector.n_calls(), 4);

    let calls = detector.calls();
    let (cond1, cond2) = (
        &result.injected.partition.condition_1,
        &result.injected.partition.condition_2,
    );
    assert_eq!(calls[0].events_a, cond2.as_slice());
    assert_eq!(calls[0].events_b, cond1.as_slice());
    assert_eq!(
        calls[0].spikes_a,
        result.injected.recording.units()[0].spikes.as_slice()
    );

    let validation = &result.validation;
    assert_relative_eq!(validation.detection_rate(), 1.0);
    assert_relative_eq!(validation.mean_abs_error().unwrap(), 0.0015, epsilon = 1e-12);
    assert_relative_eq!(validation.false_positive_rate(), 0.0);
    assert!(validation.passed());
    assert_eq!(validation.injected[0].result.stats, 0.001);

    let json = serde_json::to_string(validation).unwrap();
    assert!(json.contains("\"injected\""));
}

#[cfg(unix)]
#[test]
fn test_full_validation_with_external_program() {
    let recording = create_synthetic_recording();
    let yaml = r#"
name: external
seed: 4
injection:
  latency: 0.01
  unit_selector: all
qualification: null
validation:
  include_controls: false
command:
  program: sh
  args: ["-c", "cat > /dev/null; echo '{\"latency\": 0.105, \"stats\": {\"peak\": 3}}'"]
  timeout_secs: 30
"#;
    let config = ExperimentConfig::from_yaml(yaml).unwrap();
    let detector = config.command.as_ref().unwrap().build().unwrap();

    let result = run_injection_validation(&recording, &config, &detector).unwrap();
    assert!(result.removed_units.is_empty());
    assert_eq!(result.validation.injected.len(), 6);
    assert!(result.validation.controls.is_empty());
    for outcome in &result.validation.injected {
        assert_eq!(outcome.evaluation.estimate, Some(0.105));
        assert!(outcome.evaluation.correct);
        assert_eq!(outcome.result.stats["peak"], 3);
    }
}

#[cfg(unix)]
#[test]
fn test_external_failure_aborts_run() {
    let recording = create_synthetic_recording();
    let config = ExperimentConfig::default();
    let detector = CommandDetector::new("sh").with_args(["-c", "echo boom >&2; exit 3"]);

    let err = run_injection_validation(&recording, &config, &detector).unwrap_err();
    match err {
        LatencyError::ExternalFailure { detail, .. } => assert!(detail.contains("boom")),
        other => panic!("unexpected error: {other}"),
    }
}
