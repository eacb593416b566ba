//! SchedulePlayer - walks a lazily produced stream of timed actions
//!
//! The main stream yields [`ScheduleItem`]s positioned on the schedule's own
//! timeline, which starts at zero when playing first begins. Child streams
//! carry no timing: each yields one [`ChildItem`] per step of the main
//! stream and is dropped once it runs dry.
//!
//! Playback starts paused. While paused, the next due item is held back and
//! fires as soon as playing resumes, so pausing never loses or duplicates an
//! event.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, error};

use super::args::{Args, Params};
use crate::clock::{BeatClock, CallId};
use crate::error::Error;

/// Action invoked with the clock and resolved arguments
pub type Action = Rc<dyn Fn(&mut BeatClock, &Params)>;

pub struct ScheduleItem {
    /// Position on the schedule's timeline, in ticks
    pub at: u64,
    pub action: Action,
    pub args: Args,
}

impl ScheduleItem {
    pub fn new(at: u64, action: Action, args: Args) -> Self {
        Self { at, action, args }
    }
}

pub struct ChildItem {
    pub action: Action,
    pub args: Args,
}

impl ChildItem {
    pub fn new(action: Action, args: Args) -> Self {
        Self { action, args }
    }
}

type Schedule = Box<dyn Iterator<Item = ScheduleItem>>;
type ChildSchedule = Box<dyn Iterator<Item = ChildItem>>;

/// Item waiting for its turn
struct DueEvent {
    action: Action,
    args: Args,
}

struct PlayerState {
    // None once the stream has ended
    schedule: Option<Schedule>,
    children: Vec<ChildSchedule>,
    last: u64,
    paused: bool,
    pending: Option<DueEvent>,
    // An advancement is queued on the clock
    in_flight: bool,
}

#[derive(Clone)]
pub struct SchedulePlayer {
    state: Rc<RefCell<PlayerState>>,
}

impl SchedulePlayer {
    pub fn new<I>(schedule: I) -> Self
    where
        I: IntoIterator<Item = ScheduleItem>,
        I::IntoIter: 'static,
    {
        Self {
            state: Rc::new(RefCell::new(PlayerState {
                schedule: Some(Box::new(schedule.into_iter())),
                children: Vec::new(),
                last: 0,
                paused: true,
                pending: None,
                in_flight: false,
            })),
        }
    }

    /// Attach a stream that fires one item alongside each main-stream item
    pub fn add_child<I>(&self, child: I)
    where
        I: IntoIterator<Item = ChildItem>,
        I::IntoIter: 'static,
    {
        self.state
            .borrow_mut()
            .children
            .push(Box::new(child.into_iter()));
    }

    /// Start playing now, continuing from wherever playback was paused.
    /// Prefer [`SchedulePlayer::resume_playing`], which aligns to a measure.
    pub fn play(&self, clock: &mut BeatClock) {
        let (last, event) = {
            let mut state = self.state.borrow_mut();
            state.paused = false;
            if state.in_flight {
                // The queued advancement picks up from here
                return;
            }
            (state.last, state.pending.take())
        };
        advance(&self.state, clock, last, event);
    }

    /// Pause now; the next due item is held until playing resumes
    pub fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    /// Play from the start of the next measure
    pub fn resume_playing(&self, clock: &mut BeatClock) -> CallId {
        let delta = clock.meter().until_next_measure(clock.ticks());
        let player = self.clone();
        clock.call_later(delta, move |clock| player.play(clock))
    }

    /// Pause one tick before the next measure boundary
    pub fn pause_playing(&self, clock: &mut BeatClock) -> CallId {
        let delta = clock.meter().until_next_measure(clock.ticks()) - 1;
        let player = self.clone();
        clock.call_later(delta, move |_| player.pause())
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    /// True once the main stream has run out
    pub fn is_finished(&self) -> bool {
        self.state.borrow().schedule.is_none()
    }

    /// Timeline position of the most recent advancement
    pub fn last_tick(&self) -> u64 {
        self.state.borrow().last
    }

    pub fn child_count(&self) -> usize {
        self.state.borrow().children.len()
    }
}

impl fmt::Debug for SchedulePlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SchedulePlayer")
            .field("last", &state.last)
            .field("paused", &state.paused)
            .field("finished", &state.schedule.is_none())
            .field("children", &state.children.len())
            .field("pending", &state.pending.is_some())
            .finish()
    }
}

fn advance(
    state: &Rc<RefCell<PlayerState>>,
    clock: &mut BeatClock,
    mut last: u64,
    mut event: Option<DueEvent>,
) {
    loop {
        {
            let mut guard = state.borrow_mut();
            guard.last = last;
            if guard.paused {
                guard.pending = event;
                return;
            }
        }

        if let Some(due) = event.take() {
            invoke(clock, &due.action, due.args);
            step_children(state, clock);
        }

        let Some(item) = pull(state) else {
            debug!("schedule finished at timeline tick {last}");
            return;
        };
        if item.at < last {
            error!(
                "{}",
                Error::ScheduledInPast {
                    last,
                    requested: item.at
                }
            );
            continue;
        }

        let delta = item.at - last;
        let due = DueEvent {
            action: item.action,
            args: item.args,
        };
        if delta == 0 {
            last = item.at;
            event = Some(due);
            continue;
        }

        state.borrow_mut().in_flight = true;
        let next = Rc::clone(state);
        let at = item.at;
        clock.call_later(delta, move |clock| {
            next.borrow_mut().in_flight = false;
            advance(&next, clock, at, Some(due));
        });
        return;
    }
}

/// Next item of the main stream. The stream is taken out of the shared state
/// while it runs, since producing an item may run arbitrary code.
fn pull(state: &Rc<RefCell<PlayerState>>) -> Option<ScheduleItem> {
    let mut schedule = state.borrow_mut().schedule.take()?;
    let item = schedule.next();
    if item.is_some() {
        state.borrow_mut().schedule = Some(schedule);
    }
    item
}

fn step_children(state: &Rc<RefCell<PlayerState>>, clock: &mut BeatClock) {
    let children = std::mem::take(&mut state.borrow_mut().children);
    let mut live = Vec::with_capacity(children.len());
    for mut child in children {
        let Some(item) = child.next() else {
            debug!("child schedule exhausted");
            continue;
        };
        invoke(clock, &item.action, item.args);
        live.push(child);
    }

    // Children attached while stepping go after the existing ones
    let mut guard = state.borrow_mut();
    live.append(&mut guard.children);
    guard.children = live;
}

fn invoke(clock: &mut BeatClock, action: &Action, args: Args) {
    match args.resolve() {
        Ok(params) => action(clock, &params),
        Err(err) => error!("skipping scheduled action: {err}"),
    }
}
