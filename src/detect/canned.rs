//! Canned detector: returns scripted results and records what it was asked.

use crate::detect::types::{Detector, DetectorConfig, DetectorResult, Probe};
use crate::error::{LatencyError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded detector call, with owned copies of the probe data.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub spikes_a: Vec<f64>,
    pub events_a: Vec<f64>,
    pub spikes_b: Vec<f64>,
    pub events_b: Vec<f64>,
    pub config: DetectorConfig,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub enum CannedResponse<S> {
    Result(DetectorResult<S>),
    Failure(String),
}

/// Detector stub for tests and dry runs.
///
/// Scripted responses are consumed in call order; once they run out every
/// call gets the fallback response.
#[derive(Debug)]
pub struct CannedDetector<S> {
    scripted: Mutex<VecDeque<CannedResponse<S>>>,
    fallback: CannedResponse<S>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl<S: Clone> CannedDetector<S> {
    /// Always answer with `result`.
    pub fn new(result: DetectorResult<S>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: CannedResponse::Result(result),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with `detail`.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: CannedResponse::Failure(detail.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer the first calls with `responses`, in order.
    pub fn with_script(self, responses: Vec<CannedResponse<S>>) -> Self {
        Self {
            scripted: Mutex::new(responses.into()),
            ..self
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn n_calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl<S: Clone + Send + Sync> Detector for CannedDetector<S> {
    type Stats = S;

    fn name(&self) -> &str {
        "canned"
    }

    fn detect(
        &self,
        probe_a: Probe<'_>,
        probe_b: Probe<'_>,
        config: &DetectorConfig,
    ) -> Result<DetectorResult<S>> {
        let call = RecordedCall {
            spikes_a: probe_a.spikes.as_slice().to_vec(),
            events_a: probe_a.events.as_slice().to_vec(),
            spikes_b: probe_b.spikes.as_slice().to_vec(),
            events_b: probe_b.events.as_slice().to_vec(),
            config: config.clone(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let response = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match response {
            CannedResponse::Result(result) => Ok(result),
            CannedResponse::Failure(detail) => Err(LatencyError::ExternalFailure {
                detector: self.name().to_string(),
                detail,
            }),
        }
    }
}
