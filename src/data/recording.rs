//! Recording: one block of event onsets plus the spike trains of its units.
//!
//! On disk a recording is a directory of three tab-separated files:
//!
//! - `units.tsv`: `unit_id  good  contamination  area`
//! - `spikes.tsv`: `unit_id  time`, one spike per row, any order
//! - `events.tsv`: `time`, one onset per row, any order

use crate::data::{EventSeries, SpikeTrain};
use crate::error::{LatencyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const UNITS_FILE: &str = "units.tsv";
pub const SPIKES_FILE: &str = "spikes.tsv";
pub const EVENTS_FILE: &str = "events.tsv";

/// One recorded unit (cluster) with its quality annotations and spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit identifier, unique within a recording.
    pub id: String,
    /// Curated as a good single unit by the spike sorter.
    pub good: bool,
    /// Estimated refractory-period contamination (0-1).
    pub contamination: f64,
    /// Anatomical area label.
    pub area: String,
    /// Spike timestamps.
    pub spikes: SpikeTrain,
}

impl Unit {
    /// Create a unit with neutral quality annotations.
    pub fn new(id: impl Into<String>, spikes: SpikeTrain) -> Self {
        Self {
            id: id.into(),
            good: true,
            contamination: 0.0,
            area: String::new(),
            spikes,
        }
    }

    /// Set the quality annotations.
    pub fn with_quality(mut self, good: bool, contamination: f64, area: impl Into<String>) -> Self {
        self.good = good;
        self.contamination = contamination;
        self.area = area.into();
        self
    }
}

/// Event onsets and unit spike trains from one recording block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    events: EventSeries,
    units: Vec<Unit>,
}

impl Recording {
    /// Create a recording. Unit identifiers must be unique.
    pub fn new(events: EventSeries, units: Vec<Unit>) -> Result<Self> {
        let mut seen = HashMap::with_capacity(units.len());
        for (idx, unit) in units.iter().enumerate() {
            if let Some(prev) = seen.insert(unit.id.as_str(), idx) {
                return Err(LatencyError::invalid(format!(
                    "Duplicate unit id '{}' at positions {} and {}",
                    unit.id, prev, idx
                )));
            }
        }
        Ok(Self { events, units })
    }

    /// Event onsets.
    pub fn events(&self) -> &EventSeries {
        &self.events
    }

    /// Units in recording order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Number of units.
    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    /// Unit identifiers in recording order.
    pub fn unit_ids(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.id.as_str()).collect()
    }

    /// Look up a unit by identifier.
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Keep only the units at `indices`, in the given order.
    pub fn subset_units(&self, indices: &[usize]) -> Result<Self> {
        let units = indices
            .iter()
            .map(|&i| {
                self.units.get(i).cloned().ok_or_else(|| {
                    LatencyError::invalid(format!(
                        "Unit index {} out of range ({} units)",
                        i,
                        self.units.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(self.events.clone(), units)
    }

    /// Load a recording from a directory of TSV files.
    pub fn from_tsv_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let events = read_events_tsv(dir.join(EVENTS_FILE))?;
        let mut units = read_units_tsv(dir.join(UNITS_FILE))?;

        let spikes_path = dir.join(SPIKES_FILE);
        let mut per_unit = read_spikes_tsv(&spikes_path)?;
        for unit in units.iter_mut() {
            let times = per_unit.remove(&unit.id).unwrap_or_default();
            unit.spikes = SpikeTrain::from_unsorted(times)?;
        }
        if let Some(orphan) = per_unit.keys().next() {
            return Err(LatencyError::Parse {
                file: spikes_path.display().to_string(),
                line: 0,
                reason: format!("spikes reference unknown unit '{}'", orphan),
            });
        }

        Self::new(events, units)
    }

    /// Write the recording to a directory of TSV files, creating it if needed.
    pub fn to_tsv_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        write_events_tsv(dir.join(EVENTS_FILE), &self.events)?;

        let mut writer = BufWriter::new(File::create(dir.join(UNITS_FILE))?);
        writeln!(writer, "unit_id\tgood\tcontamination\tarea")?;
        for u in &self.units {
            writeln!(writer, "{}\t{}\t{}\t{}", u.id, u.good, u.contamination, u.area)?;
        }
        writer.flush()?;

        let mut writer = BufWriter::new(File::create(dir.join(SPIKES_FILE))?);
        writeln!(writer, "unit_id\ttime")?;
        for u in &self.units {
            for t in &u.spikes {
                writeln!(writer, "{}\t{}", u.id, t)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Read an event TSV (`time` header, one onset per row).
pub fn read_events_tsv<P: AsRef<Path>>(path: P) -> Result<EventSeries> {
    let path = path.as_ref();
    let rows = read_rows(path, &["time"])?;
    let times = rows
        .into_iter()
        .map(|(line, fields)| parse_f64(&fields[0], path, line))
        .collect::<Result<Vec<_>>>()?;
    EventSeries::from_unsorted(times)
}

/// Write an event series as TSV.
pub fn write_events_tsv<P: AsRef<Path>>(path: P, events: &EventSeries) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "time")?;
    for t in events.iter() {
        writeln!(writer, "{}", t)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_units_tsv(path: impl AsRef<Path>) -> Result<Vec<Unit>> {
    let path = path.as_ref();
    let rows = read_rows(path, &["unit_id", "good", "contamination", "area"])?;
    rows.into_iter()
        .map(|(line, fields)| {
            let good = parse_bool(&fields[1], path, line)?;
            let contamination = parse_f64(&fields[2], path, line)?;
            Ok(Unit::new(fields[0].clone(), SpikeTrain::empty()).with_quality(
                good,
                contamination,
                fields[3].clone(),
            ))
        })
        .collect()
}

fn read_spikes_tsv(path: &Path) -> Result<HashMap<String, Vec<f64>>> {
    let mut per_unit: HashMap<String, Vec<f64>> = HashMap::new();
    for (line, fields) in read_rows(path, &["unit_id", "time"])? {
        let t = parse_f64(&fields[1], path, line)?;
        per_unit.entry(fields[0].clone()).or_default().push(t);
    }
    Ok(per_unit)
}

/// Read a TSV with an exact header; returns `(line_number, fields)` for non-blank rows.
fn read_rows(path: &Path, header: &[&str]) -> Result<Vec<(usize, Vec<String>)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header_line = lines
        .next()
        .ok_or_else(|| LatencyError::EmptyData(format!("{} is empty", path.display())))??;
    let found: Vec<&str> = header_line.split('\t').map(str::trim).collect();
    if found != header {
        return Err(LatencyError::Parse {
            file: path.display().to_string(),
            line: 1,
            reason: format!("expected header {:?}, found {:?}", header, found),
        });
    }

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
        let line_no = idx + 2;
        if fields.len() != header.len() {
            return Err(LatencyError::Parse {
                file: path.display().to_string(),
                line: line_no,
                reason: format!("expected {} fields, found {}", header.len(), fields.len()),
            });
        }
        rows.push((line_no, fields));
    }
    Ok(rows)
}

fn parse_f64(value: &str, path: &Path, line: usize) -> Result<f64> {
    value.parse().map_err(|_| LatencyError::Parse {
        file: path.display().to_string(),
        line,
        reason: format!("invalid number '{}'", value),
    })
}

fn parse_bool(value: &str, path: &Path, line: usize) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(LatencyError::Parse {
            file: path.display().to_string(),
            line,
            reason: format!("invalid boolean '{}'", value),
        }),
    }
}
