//! Ground-truth validation of onset-latency detectors on injected data.

pub mod evaluate;
pub mod run;

pub use evaluate::{evaluate_onset, OnsetEvaluation};
pub use run::{validate_detector, UnitOutcome, ValidationConfig, ValidationResult};
