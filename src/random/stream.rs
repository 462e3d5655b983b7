//! Independent random sub-streams derived from one top-level seed.
//!
//! Stream 0 of the seed drives the event partition; unit `i` draws from
//! stream `i + 1`. Each stream is a separate ChaCha keystream, so units can be
//! processed in any order, or in parallel, and still get the same draws.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random generator used for every draw in the pipeline.
pub type StreamRng = ChaCha8Rng;

/// Generator for the event partition.
pub fn partition_stream(seed: u64) -> StreamRng {
    let mut rng = StreamRng::seed_from_u64(seed);
    rng.set_stream(0);
    rng
}

/// Generator owned by the unit at `unit_index`.
pub fn unit_stream(seed: u64, unit_index: usize) -> StreamRng {
    let mut rng = StreamRng::seed_from_u64(seed);
    rng.set_stream(unit_index as u64 + 1);
    rng
}
