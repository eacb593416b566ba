pub mod clock; // Virtual tick clock, drivers, and sync sources
pub mod error;
pub mod schedule; // Repeating events and lazy schedule players
pub mod sequencing; // Tempo and meter arithmetic

pub use clock::{BeatClock, CallId};
pub use error::{Error, Result};
pub use schedule::{SchedulePlayer, ScheduledEvent};
pub use sequencing::{Beat, Division, Meter, Tempo};
