//! Unit qualification: keep well-isolated units from the area of interest.

use crate::data::{Recording, Unit};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Criteria a unit must meet to enter the analysis.
///
/// A unit qualifies when it is curated as good *or* its contamination is
/// below `max_contamination`, *and* its area label contains `area`
/// (case-insensitive) when an area is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitQualification {
    /// Contamination below which an uncurated unit still qualifies.
    pub max_contamination: f64,
    /// Required substring of the area label; `None` accepts every area.
    pub area: Option<String>,
}

impl Default for UnitQualification {
    fn default() -> Self {
        Self {
            max_contamination: 0.1,
            area: Some("primary visual".to_string()),
        }
    }
}

impl UnitQualification {
    /// Accept every unit.
    pub fn permissive() -> Self {
        Self {
            max_contamination: f64::INFINITY,
            area: None,
        }
    }

    /// Check whether a single unit qualifies.
    pub fn accepts(&self, unit: &Unit) -> bool {
        let isolated = unit.good || unit.contamination < self.max_contamination;
        let in_area = match &self.area {
            Some(area) => unit
                .area
                .to_lowercase()
                .contains(&area.to_lowercase()),
            None => true,
        };
        isolated && in_area
    }
}

/// Result of unit filtering.
#[derive(Debug, Clone)]
pub struct UnitFilterResult {
    /// Recording restricted to qualifying units.
    pub recording: Recording,
    /// Original positions of the kept units.
    pub kept_indices: Vec<usize>,
    /// Identifiers of the removed units.
    pub removed_ids: Vec<String>,
}

/// Keep only the units that meet `criteria`, preserving their order.
pub fn filter_units(recording: &Recording, criteria: &UnitQualification) -> Result<UnitFilterResult> {
    let (kept, removed): (Vec<_>, Vec<_>) = recording
        .units()
        .iter()
        .enumerate()
        .partition(|(_, u)| criteria.accepts(u));

    let kept_indices: Vec<usize> = kept.iter().map(|(i, _)| *i).collect();
    let removed_ids: Vec<String> = removed.iter().map(|(_, u)| u.id.clone()).collect();
    info!(
        kept = kept_indices.len(),
        removed = removed_ids.len(),
        "filtered units"
    );

    Ok(UnitFilterResult {
        recording: recording.subset_units(&kept_indices)?,
        kept_indices,
        removed_ids,
    })
}
