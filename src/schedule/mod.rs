pub mod args;
pub mod event;
pub mod player;

pub use args::{exhaust, Arg, Args, Params, Value, MAX_THUNK_DEPTH};
pub use event::ScheduledEvent;
pub use player::{Action, ChildItem, ScheduleItem, SchedulePlayer};
