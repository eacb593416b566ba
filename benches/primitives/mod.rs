//! Benchmarks for meter arithmetic and the delayed-call queue.

mod meter;
mod queue;

pub use meter::bench_meter;
pub use queue::bench_queue;
