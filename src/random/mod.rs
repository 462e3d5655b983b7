//! Reproducible randomness: partial permutations and per-unit random streams.

mod permute;
mod stream;

pub use permute::permute;
pub use stream::{partition_stream, unit_stream, StreamRng};
