//! Data structures for spike trains, event onsets and recordings.

mod event_series;
mod recording;
mod spike_train;

pub use event_series::EventSeries;
pub use recording::{
    read_events_tsv, write_events_tsv, Recording, Unit, EVENTS_FILE, SPIKES_FILE, UNITS_FILE,
};
pub use spike_train::SpikeTrain;
