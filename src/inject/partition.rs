//! Event partitioning: split one event series into two pseudo-conditions.

use crate::data::EventSeries;
use crate::error::{LatencyError, Result};
use crate::random::{partition_stream, permute};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Two disjoint, individually sorted subsets of one event series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPartition {
    /// Condition 1: `floor(n/2)` events, spikes are taken from here.
    pub condition_1: EventSeries,
    /// Condition 2: `ceil(n/2)` events, spikes are moved here.
    pub condition_2: EventSeries,
}

impl EventPartition {
    /// Number of positional event pairs `(condition_1[j], condition_2[j])`.
    pub fn n_pairs(&self) -> usize {
        self.condition_1.len().min(self.condition_2.len())
    }

    /// Equal-length slices paired by position.
    ///
    /// With an odd event count the last condition-2 event has no partner and
    /// is left out of the pairing.
    pub fn paired(&self) -> (&[f64], &[f64]) {
        let m = self.n_pairs();
        (
            &self.condition_1.as_slice()[..m],
            &self.condition_2.as_slice()[..m],
        )
    }

    /// Total number of events across both conditions.
    pub fn n_events(&self) -> usize {
        self.condition_1.len() + self.condition_2.len()
    }

    /// Write the partition as TSV (`condition`, `time`).
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "condition\ttime")?;
        for t in self.condition_1.iter() {
            writeln!(writer, "1\t{}", t)?;
        }
        for t in self.condition_2.iter() {
            writeln!(writer, "2\t{}", t)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a partition written by [`EventPartition::to_tsv`].
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parse_err = |line: usize, reason: String| LatencyError::Parse {
            file: path.display().to_string(),
            line,
            reason,
        };

        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| LatencyError::EmptyData(format!("{} is empty", path.display())))??;
        if header.trim() != "condition\ttime" {
            return Err(parse_err(1, format!("unexpected header '{}'", header)));
        }

        let mut cond1 = Vec::new();
        let mut cond2 = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let (cond, time) = line
                .split_once('\t')
                .ok_or_else(|| parse_err(line_no, "expected 2 fields".into()))?;
            let t: f64 = time
                .trim()
                .parse()
                .map_err(|_| parse_err(line_no, format!("invalid number '{}'", time)))?;
            match cond.trim() {
                "1" => cond1.push(t),
                "2" => cond2.push(t),
                other => return Err(parse_err(line_no, format!("unknown condition '{}'", other))),
            }
        }

        Ok(Self {
            condition_1: EventSeries::from_unsorted(cond1)?,
            condition_2: EventSeries::from_unsorted(cond2)?,
        })
    }
}

/// Split `events` into two conditions with a random full permutation.
///
/// The first `floor(n/2)` permuted positions form condition 1 and the rest
/// form condition 2; both are re-sorted ascending. The subsets are disjoint
/// and together contain every event exactly once.
pub fn partition_events<R: Rng + ?Sized>(events: &EventSeries, rng: &mut R) -> Result<EventPartition> {
    let n = events.len();
    let order = permute(n, n, rng)?;
    let (first, second) = order.split_at(n / 2);

    let pick = |idx: &[usize]| -> Result<EventSeries> {
        let mut times: Vec<f64> = idx.iter().map(|&i| events.as_slice()[i]).collect();
        times.sort_by(f64::total_cmp);
        EventSeries::new(times)
    };

    let partition = EventPartition {
        condition_1: pick(first)?,
        condition_2: pick(second)?,
    };
    debug!(
        n_events = n,
        condition_1 = partition.condition_1.len(),
        condition_2 = partition.condition_2.len(),
        "partitioned events"
    );
    Ok(partition)
}

/// [`partition_events`] driven by the partition stream of `seed`.
pub fn partition_events_seeded(events: &EventSeries, seed: u64) -> Result<EventPartition> {
    partition_events(events, &mut partition_stream(seed))
}
