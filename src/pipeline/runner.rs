//! Experiment runner: qualify units, inject, then score a detector against the result.

use crate::data::Recording;
use crate::detect::{CommandDetector, Detector, DetectorConfig};
use crate::error::{LatencyError, Result};
use crate::filter::{filter_units, UnitQualification};
use crate::inject::{inject_recording, InjectedData, InjectionSpec, UnitSelector};
use crate::validate::{validate_detector, ValidationConfig, ValidationResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// External detector program, as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorCommand {
    /// Executable to run once per detector call.
    pub program: PathBuf,
    /// Extra arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-call timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl DetectorCommand {
    /// Build the detector this entry describes.
    pub fn build(&self) -> Result<CommandDetector> {
        let mut detector = CommandDetector::new(&self.program).with_args(self.args.clone());
        if let Some(secs) = self.timeout_secs {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                LatencyError::invalid(format!("timeout_secs must be >= 0, got {}", secs))
            })?;
            detector = detector.with_timeout(timeout);
        }
        Ok(detector)
    }
}

/// Experiment configuration for serialization.
///
/// `injection.unit_selector` indices refer to unit positions *after*
/// qualification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Name of the experiment.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Base seed for the partition and every unit stream.
    pub seed: u64,
    /// Inject units in parallel.
    pub parallel: bool,
    /// Unit qualification; `None` keeps every unit.
    pub qualification: Option<UnitQualification>,
    pub injection: InjectionSpec,
    pub detector: DetectorConfig,
    pub validation: ValidationConfig,
    /// External detector; required by `latinj validate`.
    pub command: Option<DetectorCommand>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "latency-injection".to_string(),
            description: None,
            seed: 1,
            parallel: false,
            qualification: Some(UnitQualification::default()),
            injection: InjectionSpec::default(),
            detector: DetectorConfig::default(),
            validation: ValidationConfig::default(),
            command: None,
        }
    }
}

impl ExperimentConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(LatencyError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(LatencyError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Check every section before any data is touched.
    pub fn validate(&self) -> Result<()> {
        self.injection.validate()?;
        self.detector.validate()?;
        self.validation.validate()
    }
}

/// Injected data plus the units dropped by qualification.
#[derive(Debug, Clone)]
pub struct InjectionRun {
    pub injected: InjectedData,
    /// Identifiers of units that failed qualification.
    pub removed_units: Vec<String>,
}

/// Everything an experiment produced.
#[derive(Debug, Clone)]
pub struct ExperimentResult<S> {
    pub injected: InjectedData,
    pub removed_units: Vec<String>,
    pub validation: ValidationResult<S>,
}

/// Builder for configuring and running injection experiments.
#[derive(Debug, Clone, Default)]
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    /// Create an experiment with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a config.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Filter units before injecting.
    pub fn qualify(mut self, criteria: UnitQualification) -> Self {
        self.config.qualification = Some(criteria);
        self
    }

    /// Keep every unit.
    pub fn keep_all_units(mut self) -> Self {
        self.config.qualification = None;
        self
    }

    /// Relocation window relative to each condition-1 onset.
    pub fn window(mut self, start_offset: f64, duration: f64) -> Self {
        self.config.injection = self.config.injection.with_window(start_offset, duration);
        self
    }

    pub fn fraction(mut self, fraction: f64) -> Self {
        self.config.injection = self.config.injection.with_fraction(fraction);
        self
    }

    pub fn latency(mut self, latency: f64) -> Self {
        self.config.injection = self.config.injection.with_latency(latency);
        self
    }

    /// Which (qualified) units receive the injection.
    pub fn select(mut self, selector: UnitSelector) -> Self {
        self.config.injection = self.config.injection.with_selector(selector);
        self
    }

    pub fn detector_config(mut self, detector: DetectorConfig) -> Self {
        self.config.detector = detector;
        self
    }

    /// Onset tolerance (s) for scoring.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.validation.tolerance = tolerance;
        self
    }

    /// Export to config.
    pub fn to_config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Qualify units and inject, without calling a detector.
    pub fn inject(&self, recording: &Recording) -> Result<InjectionRun> {
        self.config.validate()?;

        let (qualified, removed_units) = match &self.config.qualification {
            Some(criteria) => {
                let filtered = filter_units(recording, criteria)?;
                (filtered.recording, filtered.removed_ids)
            }
            None => (recording.clone(), Vec::new()),
        };
        if qualified.n_units() == 0 && recording.n_units() > 0 {
            return Err(LatencyError::EmptyData(format!(
                "none of the {} units passed qualification",
                recording.n_units()
            )));
        }

        info!(
            experiment = %self.config.name,
            units = qualified.n_units(),
            events = qualified.events().len(),
            seed = self.config.seed,
            "injecting"
        );
        let injected = inject_recording(
            &qualified,
            &self.config.injection,
            self.config.seed,
            self.config.parallel,
        )?;
        Ok(InjectionRun {
            injected,
            removed_units,
        })
    }

    /// Qualify, inject and score `detector` on the injected and control units.
    pub fn run<D>(&self, recording: &Recording, detector: &D) -> Result<ExperimentResult<D::Stats>>
    where
        D: Detector + ?Sized,
        D::Stats: Send,
    {
        let InjectionRun {
            injected,
            removed_units,
        } = self.inject(recording)?;
        let validation = validate_detector(
            &injected,
            detector,
            &self.config.detector,
            &self.config.validation,
        )?;
        Ok(ExperimentResult {
            injected,
            removed_units,
            validation,
        })
    }
}

/// Run a full injection validation with `config` against `detector`.
pub fn run_injection_validation<D>(
    recording: &Recording,
    config: &ExperimentConfig,
    detector: &D,
) -> Result<ExperimentResult<D::Stats>>
where
    D: Detector + ?Sized,
    D::Stats: Send,
{
    Experiment::from_config(config).run(recording, detector)
}
