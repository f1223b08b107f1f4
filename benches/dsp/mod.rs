//! Benchmarks for the synthesis primitives.

mod delay;
mod envelope;
mod filter;
mod oscillator;

pub use delay::bench_delay;
pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use oscillator::bench_oscillator;
