//! Injection validation: run a detector over injected and control units and score it.

use crate::detect::{detect_unit, Detector, DetectorConfig, DetectorResult};
use crate::error::{LatencyError, Result};
use crate::inject::{GroundTruth, InjectedData};
use crate::validate::evaluate::{evaluate_onset, OnsetEvaluation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for scoring a detector against injected data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum |estimate - expected| (s) for a detection to count as correct.
    pub tolerance: f64,
    /// Also run the detector on untouched units (negative controls).
    pub include_controls: bool,
    /// Minimum detection rate among injected units for a pass.
    pub min_detection_rate: f64,
    /// Minimum fraction of injected units detected within `tolerance` for a pass.
    pub min_accuracy: f64,
    /// Maximum false-positive rate among control units for a pass.
    pub max_false_positive_rate: f64,
    /// Call the detector for several units at once.
    pub parallel: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            include_controls: true,
            min_detection_rate: 0.5,
            min_accuracy: 0.5,
            max_false_positive_rate: 0.1,
            parallel: false,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(LatencyError::invalid(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        for (name, value) in [
            ("min_detection_rate", self.min_detection_rate),
            ("min_accuracy", self.min_accuracy),
            ("max_false_positive_rate", self.max_false_positive_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LatencyError::invalid(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Detector answer and its score for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome<S> {
    pub evaluation: OnsetEvaluation,
    pub result: DetectorResult<S>,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult<S> {
    /// Outcomes for injected units (positive controls).
    pub injected: Vec<UnitOutcome<S>>,
    /// Outcomes for untouched units (negative controls).
    pub controls: Vec<UnitOutcome<S>>,
    /// What was injected.
    pub ground_truth: GroundTruth,
    /// Configuration used.
    pub config: ValidationConfig,
}

impl<S> ValidationResult<S> {
    /// Fraction of injected units with any reported onset.
    pub fn detection_rate(&self) -> f64 {
        rate(&self.injected, |o| o.evaluation.detected)
    }

    /// Fraction of injected units detected within tolerance.
    pub fn accuracy(&self) -> f64 {
        rate(&self.injected, |o| o.evaluation.correct)
    }

    /// Mean absolute onset error over detected injected units.
    pub fn mean_abs_error(&self) -> Option<f64> {
        let errors: Vec<f64> = self
            .injected
            .iter()
            .filter_map(|o| o.evaluation.abs_error())
            .collect();
        if errors.is_empty() {
            None
        } else {
            Some(errors.iter().sum::<f64>() / errors.len() as f64)
        }
    }

    /// Fraction of control units with a reported onset.
    pub fn false_positive_rate(&self) -> f64 {
        rate(&self.controls, |o| o.evaluation.is_false_positive())
    }

    /// Check if the detector met the configured criteria.
    pub fn passed(&self) -> bool {
        self.detection_rate() >= self.config.min_detection_rate
            && self.accuracy() >= self.config.min_accuracy
            && self.false_positive_rate() <= self.config.max_false_positive_rate
    }
}

fn rate<S>(outcomes: &[UnitOutcome<S>], pred: impl Fn(&UnitOutcome<S>) -> bool) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().filter(|o| pred(o)).count() as f64 / outcomes.len() as f64
}

impl<S> std::fmt::Display for ValidationResult<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Latency Injection Validation")?;
        writeln!(f, "============================")?;
        writeln!(
            f,
            "Injected latency: {:.4} s (expected onset {:.4} s, fraction {:.2})",
            self.ground_truth.latency, self.ground_truth.expected_onset, self.ground_truth.fraction
        )?;

        writeln!(f, "\nInjected units ({}):", self.injected.len())?;
        writeln!(f, "  Detection rate: {:.1}%", self.detection_rate() * 100.0)?;
        writeln!(
            f,
            "  Within {:.1} ms:  {:.1}%",
            self.config.tolerance * 1000.0,
            self.accuracy() * 100.0
        )?;
        match self.mean_abs_error() {
            Some(mae) => writeln!(f, "  Mean |error|:   {:.2} ms", mae * 1000.0)?,
            None => writeln!(f, "  Mean |error|:   n/a")?,
        }

        if !self.controls.is_empty() {
            writeln!(f, "\nControl units ({}):", self.controls.len())?;
            writeln!(f, "  FP rate:        {:.1}%", self.false_positive_rate() * 100.0)?;
        }

        writeln!(f, "\nValidation: {}", if self.passed() { "PASSED" } else { "FAILED" })?;
        Ok(())
    }
}

/// Run `detector` on every injected unit (and on controls if configured) and score the answers.
///
/// The first detector failure aborts the run and is returned unchanged.
pub fn validate_detector<D>(
    injected: &InjectedData,
    detector: &D,
    detector_config: &DetectorConfig,
    config: &ValidationConfig,
) -> Result<ValidationResult<D::Stats>>
where
    D: Detector + ?Sized,
    D::Stats: Send,
{
    config.validate()?;
    detector_config.validate()?;

    let truth = injected.ground_truth();
    if truth.injected_units.is_empty() {
        return Err(LatencyError::EmptyData(
            "no units were injected; nothing to validate".into(),
        ));
    }

    let score = |unit_id: &String| -> Result<UnitOutcome<D::Stats>> {
        let result = detect_unit(detector, injected, unit_id, detector_config)?;
        let evaluation = evaluate_onset(unit_id, &result, &truth, config.tolerance);
        debug!(
            unit = %unit_id,
            injected = evaluation.injected,
            estimate = ?evaluation.estimate,
            correct = evaluation.correct,
            "scored detector answer"
        );
        Ok(UnitOutcome { evaluation, result })
    };

    let controls: &[String] = if config.include_controls {
        &truth.control_units
    } else {
        &[]
    };

    let (injected_outcomes, control_outcomes) = if config.parallel {
        (
            truth.injected_units.par_iter().map(score).collect::<Result<Vec<_>>>()?,
            controls.par_iter().map(score).collect::<Result<Vec<_>>>()?,
        )
    } else {
        (
            truth.injected_units.iter().map(score).collect::<Result<Vec<_>>>()?,
            controls.iter().map(score).collect::<Result<Vec<_>>>()?,
        )
    };

    let result = ValidationResult {
        injected: injected_outcomes,
        controls: control_outcomes,
        ground_truth: truth,
        config: config.clone(),
    };
    info!(
        detector = detector.name(),
        detection_rate = result.detection_rate(),
        false_positive_rate = result.false_positive_rate(),
        passed = result.passed(),
        "validation finished"
    );
    Ok(result)
}
