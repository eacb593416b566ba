mod beat_clock;
pub mod driver;
mod queue;
pub mod settings;
pub mod sync;

pub use beat_clock::{BeatClock, BeatClockBuilder, SyncReport};
pub use driver::{DriverEvent, DriverLog, ManualDriver, SleepDriver, StopHandle, TimerDriver};
pub use queue::{CallId, Callback, DelayedCallQueue};
pub use settings::{ClockSettings, InstrumentBackend, SynthChannels};
#[cfg(feature = "rtrb")]
pub use sync::{sync_channel, RingSyncSource, SyncFeed};
pub use sync::{SyncClockSource, SyncPoint, SystemClock};
