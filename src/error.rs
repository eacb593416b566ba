//! Error type shared by the clock, meters, and schedule players.

use thiserror::Error;

/// Everything that can go wrong while converting musical time or scheduling.
///
/// Most of these are reported through the `log` facade rather than returned,
/// because they surface inside clock callbacks where there is no caller left
/// to hand them to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// n/d of a measure does not land on a whole tick
    #[error("{numerator}/{denominator} does not evenly divide {ticks_per_measure} ticks")]
    InexactDivision {
        numerator: u32,
        denominator: u32,
        ticks_per_measure: u64,
    },

    /// A schedule produced a time earlier than the one it already played
    #[error("scheduled value in past: relative last tick={last}, when={requested}")]
    ScheduledInPast { last: u64, requested: u64 },

    #[error("tried to stop an event that has not yet started")]
    CancelUnstartedTask,

    #[error("cannot nudge a clock that hasn't started")]
    ClockNotStarted,

    /// An argument was still a thunk after `limit` resolutions
    #[error("argument still callable after {limit} resolutions")]
    UnresolvedThunk { limit: usize },

    #[error("instrument backend: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
