//! Boundary to the external onset-latency detector.

mod canned;
mod command;
mod invoke;
mod types;

pub use canned::{CannedDetector, CannedResponse, RecordedCall};
pub use command::CommandDetector;
pub use invoke::{condition_probes, detect_unit, invoke_detector};
pub use types::{Detector, DetectorConfig, DetectorResult, Probe};
