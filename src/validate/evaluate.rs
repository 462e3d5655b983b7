//! Onset evaluation: score a detector answer against the injected ground truth.

use crate::detect::DetectorResult;
use crate::inject::GroundTruth;
use serde::{Deserialize, Serialize};

/// How one detector answer compares to the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvaluation {
    /// Unit the detector was run on.
    pub unit_id: String,
    /// Whether the unit received the injection.
    pub injected: bool,
    /// Whether the detector reported a significant onset.
    pub detected: bool,
    /// Reported onset (s).
    pub estimate: Option<f64>,
    /// Expected onset (s); `None` for control units, which carry no effect.
    pub expected: Option<f64>,
    /// `estimate - expected` when both exist.
    pub error: Option<f64>,
    /// Injected: detected within tolerance. Control: nothing detected.
    pub correct: bool,
}

impl OnsetEvaluation {
    /// Absolute onset error.
    pub fn abs_error(&self) -> Option<f64> {
        self.error.map(f64::abs)
    }

    /// A control unit with a reported onset.
    pub fn is_false_positive(&self) -> bool {
        !self.injected && self.detected
    }
}

/// Score a detector result for `unit_id`.
///
/// An injected unit is correct when an onset was found within `tolerance`
/// seconds of the expected onset; a control unit is correct when none was.
pub fn evaluate_onset<S>(
    unit_id: &str,
    result: &DetectorResult<S>,
    truth: &GroundTruth,
    tolerance: f64,
) -> OnsetEvaluation {
    let injected = truth.injected_units.iter().any(|u| u == unit_id);
    let expected = injected.then_some(truth.expected_onset);
    let error = match (result.latency, expected) {
        (Some(est), Some(exp)) => Some(est - exp),
        _ => None,
    };
    let correct = if injected {
        error.map_or(false, |e| e.abs() <= tolerance)
    } else {
        !result.detected()
    };

    OnsetEvaluation {
        unit_id: unit_id.to_string(),
        injected,
        detected: result.detected(),
        estimate: result.latency,
        expected,
        error,
        correct,
    }
}
