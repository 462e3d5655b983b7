//! Controlled Latency-Shift Injection
//!
//! This library plants a known onset-latency difference into recorded spike
//! trains so that two-sample latency detectors can be checked against ground
//! truth.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (SpikeTrain, EventSeries, Recording)
//! - **random**: Seeded partial permutations and per-unit random streams
//! - **filter**: Unit qualification (isolation quality, brain area)
//! - **inject**: Event partitioning and spike redistribution
//! - **detect**: Detector trait, probe packaging, canned and external detectors
//! - **validate**: Scoring detector answers against the injected ground truth
//! - **pipeline**: Experiment configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use latency_inject::prelude::*;
//!
//! let recording = Recording::from_tsv_dir("session01").unwrap();
//!
//! // Shift a quarter of the 100-200 ms spikes of unit 0 by 20 ms
//! let run = Experiment::new()
//!     .seed(1)
//!     .latency(0.02)
//!     .select(UnitSelector::Indices(vec![0]))
//!     .inject(&recording)
//!     .unwrap();
//!
//! let truth = run.injected.ground_truth();
//! println!("expected onset: {}", truth.expected_onset);
//! ```

pub mod data;
pub mod detect;
pub mod error;
pub mod filter;
pub mod inject;
pub mod pipeline;
pub mod random;
pub mod validate;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{EventSeries, Recording, SpikeTrain, Unit};
    pub use crate::detect::{
        condition_probes, detect_unit, invoke_detector, CannedDetector, CannedResponse,
        CommandDetector, Detector, DetectorConfig, DetectorResult, Probe,
    };
    pub use crate::error::{LatencyError, Result};
    pub use crate::filter::{filter_units, UnitFilterResult, UnitQualification};
    pub use crate::inject::{
        inject_recording, inject_with_partition, partition_events, partition_events_seeded,
        redistribute, EventPartition, GroundTruth, InjectedData, InjectionRecord, InjectionSpec,
        Redistribution, RedistributionStats, UnitSelector,
    };
    pub use crate::pipeline::{
        run_injection_validation, DetectorCommand, Experiment, ExperimentConfig,
        ExperimentResult, InjectionRun,
    };
    pub use crate::random::{partition_stream, permute, unit_stream};
    pub use crate::validate::{
        evaluate_onset, validate_detector, OnsetEvaluation, ValidationConfig, ValidationResult,
    };
}
