//! Process-backed detector: runs an external program per comparison.
//!
//! The program receives one JSON request on stdin,
//!
//! ```json
//! {"probe_a": {"spikes": [...], "events": [...]},
//!  "probe_b": {"spikes": [...], "events": [...]},
//!  "config": {"use_dur": 1.0, "resamp_num": 250, ...}}
//! ```
//!
//! and must print one JSON response on stdout,
//! `{"latency": <number or null>, "stats": <anything>}`. A `null` latency
//! means no significant onset.

use crate::detect::types::{Detector, DetectorConfig, DetectorResult, Probe};
use crate::error::{LatencyError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Serialize)]
struct Request<'a> {
    probe_a: Probe<'a>,
    probe_b: Probe<'a>,
    config: &'a DetectorConfig,
}

#[derive(Deserialize)]
struct Response {
    latency: Option<f64>,
    #[serde(default)]
    stats: serde_json::Value,
}

/// Runs `program args...` once per detector call.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    name: String,
}

impl CommandDetector {
    /// Create a detector for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program.display().to_string();
        Self {
            program,
            args: Vec::new(),
            timeout: None,
            name,
        }
    }

    /// Extra command-line arguments.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the program and fail when a call runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn failure(&self, detail: impl Into<String>) -> LatencyError {
        LatencyError::ExternalFailure {
            detector: self.name.clone(),
            detail: detail.into(),
        }
    }
}

impl Detector for CommandDetector {
    type Stats = serde_json::Value;

    fn name(&self) -> &str {
        &self.name
    }

    fn detect(
        &self,
        probe_a: Probe<'_>,
        probe_b: Probe<'_>,
        config: &DetectorConfig,
    ) -> Result<DetectorResult<serde_json::Value>> {
        let request = serde_json::to_vec(&Request {
            probe_a,
            probe_b,
            config,
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("failed to start: {}", e)))?;

        // Pipes are drained on their own threads so a chatty child cannot
        // block on a full buffer while we wait on it.
        let mut stdin = child.stdin.take().ok_or_else(|| self.failure("stdin unavailable"))?;
        let writer = thread::spawn(move || stdin.write_all(&request));
        let mut stdout = child.stdout.take().ok_or_else(|| self.failure("stdout unavailable"))?;
        let out_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let mut stderr = child.stderr.take().ok_or_else(|| self.failure("stderr unavailable"))?;
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let start = Instant::now();
        let status = loop {
            let polled = child
                .try_wait()
                .map_err(|e| self.failure(format!("failed to poll: {}", e)))?;
            if let Some(status) = polled {
                break status;
            }
            if let Some(limit) = self.timeout {
                if start.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.failure(format!("timed out after {:?}", limit)));
                }
            }
            thread::sleep(Duration::from_millis(10));
        };
        debug!(detector = %self.name, elapsed = ?start.elapsed(), %status, "detector finished");

        let written = writer.join().map_err(|_| self.failure("stdin writer panicked"))?;
        let stdout = out_reader
            .join()
            .map_err(|_| self.failure("stdout reader panicked"))??;
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(self.failure(format!("exited with {}: {}", status, stderr.trim())));
        }
        if let Err(e) = written {
            return Err(self.failure(format!("failed to send request: {}", e)));
        }

        let response: Response = serde_json::from_slice(&stdout).map_err(|e| {
            self.failure(format!(
                "malformed response ({}): {}",
                e,
                String::from_utf8_lossy(&stdout).trim()
            ))
        })?;
        Ok(DetectorResult::new(response.latency, response.stats))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::data::{EventSeries, SpikeTrain};

    fn shell(script: &str) -> CommandDetector {
        CommandDetector::new("sh").with_args(["-c", script])
    }

    fn run(detector: &CommandDetector) -> Result<DetectorResult<serde_json::Value>> {
        let spikes = SpikeTrain::new(vec![0.1, 0.2]).unwrap();
        let events = EventSeries::new(vec![0.0]).unwrap();
        let probe = Probe::new(&spikes, &events);
        detector.detect(probe, probe, &DetectorConfig::default())
    }

    #[test]
    fn test_successful_call() {
        let detector =
            shell(r#"cat > /dev/null; echo '{"latency": 0.105, "stats": {"p_value": 0.01}}'"#);
        let result = run(&detector).unwrap();
        assert_eq!(result.latency, Some(0.105));
        assert_eq!(result.stats["p_value"], 0.01);
    }

    #[test]
    fn test_request_reaches_program() {
        // Echo the request back inside the stats field.
        let detector = shell(r#"printf '{"latency": null, "stats": '; cat; printf '}'"#);
        let result = run(&detector).unwrap();
        assert!(!result.detected());
        assert_eq!(result.stats["probe_a"]["spikes"][1], 0.2);
        assert_eq!(result.stats["config"]["resamp_num"], 250);
    }

    #[test]
    fn test_non_zero_exit_is_external_failure() {
        let detector = shell("cat > /dev/null; echo 'singular matrix' >&2; exit 3");
        match run(&detector).unwrap_err() {
            LatencyError::ExternalFailure { detail, .. } => {
                assert!(detail.contains("singular matrix"), "detail: {}", detail);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_malformed_output() {
        let detector = shell("cat > /dev/null; echo 'NaN'");
        assert!(matches!(
            run(&detector).unwrap_err(),
            LatencyError::ExternalFailure { .. }
        ));
    }

    #[test]
    fn test_timeout() {
        let detector = shell("exec sleep 5").with_timeout(Duration::from_millis(100));
        let err = run(&detector).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_missing_program() {
        let detector = CommandDetector::new("/nonexistent/detector");
        assert!(matches!(
            run(&detector).unwrap_err(),
            LatencyError::ExternalFailure { .. }
        ));
    }
}
