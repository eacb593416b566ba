//! Scenario benchmarks.
//!
//! These model how a host drives the clock: many repeating events sharing
//! one tick loop, and schedule players walking long streams.

mod clock;
mod player;

pub use clock::bench_clock;
pub use player::bench_player;
