//! Whole-chunk benchmarks.
//!
//! These run the voice controller the way the engine loop does, one chunk
//! per iteration, with the effect chain in various configurations.

mod chunk;

pub use chunk::bench_chunk;
