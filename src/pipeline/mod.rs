//! Experiment composition and execution.

mod runner;

pub use runner::{
    run_injection_validation, DetectorCommand, Experiment, ExperimentConfig, ExperimentResult,
    InjectionRun,
};
