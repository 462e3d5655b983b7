//! Controlled latency-shift injection.
//!
//! Builds a dataset with a known onset-latency effect out of a real
//! recording: the event series is split into two pseudo-conditions, and for
//! the selected units a fraction of the spikes following each condition-1
//! event is moved to the paired condition-2 event plus a fixed latency.
//! Units outside the selection stay untouched and serve as negative controls.

mod orchestrate;
mod partition;
mod redistribute;
mod types;

pub use orchestrate::{inject_recording, inject_with_partition};
pub use partition::{partition_events, partition_events_seeded, EventPartition};
pub use redistribute::{redistribute, Redistribution, RedistributionStats};
pub use types::{GroundTruth, InjectedData, InjectionRecord, InjectionSpec, UnitSelector};
