//! ScheduledEvent - a repeating action started and stopped in musical time
//!
//! The event is a cheap cloneable handle; the action fires when a start
//! registration comes due, then every `interval` ticks until stopped. Every
//! start/stop registration is deferred until the clock is running, so events
//! declared before startup activate together in declaration order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::warn;

use crate::clock::{BeatClock, CallId};
use crate::error::{Error, Result};
use crate::sequencing::{Division, Meter};

type EventAction = Box<dyn FnMut(&mut BeatClock)>;

struct RepeatingTask {
    interval: u64,
    pending: Option<CallId>,
    running: bool,
}

struct EventState {
    // Taken out while it runs so the action may use its own handle
    action: Option<EventAction>,
    meter: Option<Meter>,
    task: Option<RepeatingTask>,
    fire_count: u64,
}

#[derive(Clone)]
pub struct ScheduledEvent {
    state: Rc<RefCell<EventState>>,
}

impl ScheduledEvent {
    pub fn new<F>(action: F) -> Self
    where
        F: FnMut(&mut BeatClock) + 'static,
    {
        Self {
            state: Rc::new(RefCell::new(EventState {
                action: Some(Box::new(action)),
                meter: None,
                task: None,
                fire_count: 0,
            })),
        }
    }

    /// Resolve musical offsets with `meter` instead of the clock's primary
    pub fn with_meter(self, meter: Meter) -> Self {
        self.state.borrow_mut().meter = Some(meter);
        self
    }

    pub fn is_running(&self) -> bool {
        self.state
            .borrow()
            .task
            .as_ref()
            .is_some_and(|task| task.running)
    }

    /// Times the action has fired
    pub fn fire_count(&self) -> u64 {
        self.state.borrow().fire_count
    }

    /// After `ticks` more ticks (counted from when the clock runs), fire the
    /// action and then every `interval` ticks.
    pub fn start_after_ticks(&self, clock: &mut BeatClock, ticks: u64, interval: u64) -> &Self {
        let state = Rc::clone(&self.state);
        clock.call_when_running(move |clock| {
            clock.call_later(ticks, move |clock| start_task(&state, clock, interval));
        });
        self
    }

    /// Start on division `offset` of the measure `measures` from now,
    /// repeating every `interval`.
    ///
    /// With `measures == 0` and the clock already past the start of its
    /// measure, the start moves to the next measure rather than the past.
    pub fn start_after(
        &self,
        clock: &mut BeatClock,
        measures: u64,
        offset: Division,
        interval: Division,
    ) -> Result<&Self> {
        let meter = self.meter_for(clock);
        let ticks = self.ticks_until(&meter, clock.ticks(), measures, offset)?;
        let interval = meter.dtt(interval)?;
        Ok(self.start_after_ticks(clock, ticks, interval))
    }

    /// Stop the repeating task `ticks` from when the clock runs
    pub fn stop_after_ticks(&self, clock: &mut BeatClock, ticks: u64) -> &Self {
        let state = Rc::clone(&self.state);
        clock.call_when_running(move |clock| {
            clock.call_later(ticks, move |clock| {
                if state.borrow().task.is_none() {
                    warn!("{}", Error::CancelUnstartedTask);
                    return;
                }
                stop_task(&state, clock);
            });
        });
        self
    }

    /// Stop on division `offset` of the measure `measures` from now
    pub fn stop_after(
        &self,
        clock: &mut BeatClock,
        measures: u64,
        offset: Division,
    ) -> Result<&Self> {
        let meter = self.meter_for(clock);
        let ticks = self.ticks_until(&meter, clock.ticks(), measures, offset)?;
        Ok(self.stop_after_ticks(clock, ticks))
    }

    /// Cancel the repeating task now; no-op if it is not running
    pub fn stop(&self, clock: &mut BeatClock) -> &Self {
        stop_task(&self.state, clock);
        self
    }

    fn meter_for(&self, clock: &BeatClock) -> Meter {
        self.state.borrow().meter.unwrap_or(*clock.meter())
    }

    fn ticks_until(&self, meter: &Meter, now: u64, measures: u64, offset: Division) -> Result<u64> {
        let measures = if measures == 0 && meter.ticks_in_measure(now) > 0 {
            1
        } else {
            measures
        };
        let target = meter.next_measure(now, measures) + meter.dtt(offset)?;
        Ok(target.saturating_sub(now))
    }
}

impl fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ScheduledEvent")
            .field("running", &self.is_running())
            .field("fire_count", &state.fire_count)
            .field("meter", &state.meter)
            .finish()
    }
}

fn start_task(state: &Rc<RefCell<EventState>>, clock: &mut BeatClock, interval: u64) {
    // A restart replaces the previous task
    stop_task(state, clock);
    state.borrow_mut().task = Some(RepeatingTask {
        interval,
        pending: None,
        running: true,
    });
    fire(state, clock);
}

fn stop_task(state: &Rc<RefCell<EventState>>, clock: &mut BeatClock) {
    let mut state = state.borrow_mut();
    let Some(task) = state.task.as_mut() else {
        return;
    };
    task.running = false;
    if let Some(id) = task.pending.take() {
        clock.cancel(id);
    }
}

fn fire(state: &Rc<RefCell<EventState>>, clock: &mut BeatClock) {
    let Some(mut action) = state.borrow_mut().action.take() else {
        return;
    };
    action(clock);

    let mut guard = state.borrow_mut();
    guard.action = Some(action);
    guard.fire_count += 1;
    let Some(task) = guard.task.as_mut() else {
        return;
    };
    if !task.running {
        return;
    }
    let interval = task.interval;
    let next = Rc::clone(state);
    task.pending = Some(clock.call_later(interval, move |clock| fire(&next, clock)));
}
