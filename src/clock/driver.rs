//! Periodic drivers that pace the clock.
//!
//! A [`TimerDriver`] decides *when* the clock ticks; the clock decides what a
//! tick does. [`SleepDriver`] paces against the system clock on the current
//! thread. [`ManualDriver`] never blocks and records what the clock asked of
//! it, for hosts that call `tick()` themselves and for tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest single sleep inside [`SleepDriver::wait`], so a stop request from
/// another thread is noticed promptly even at slow tempos.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Wall-clock seconds since the UNIX epoch
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub trait TimerDriver {
    /// Begin firing every `interval`; the first fire is immediate when
    /// `fire_immediately` is set.
    fn start(&mut self, interval: Duration, fire_immediately: bool);

    /// Like [`TimerDriver::start`] but the schedule begins after `delay`
    fn start_after(&mut self, delay: Duration, interval: Duration, fire_immediately: bool);

    fn stop(&mut self);

    fn is_active(&self) -> bool;

    fn interval(&self) -> Option<Duration>;

    /// Wall-clock time of the next fire, in seconds since the UNIX epoch
    fn next_fire(&self) -> Option<f64>;

    /// Scheduled time of the fire most recently returned by `wait`. The
    /// clock compares this against its sync source while ticking.
    fn current_fire(&self) -> Option<f64>;

    /// Shift the schedule earlier by `delta` seconds (later when negative),
    /// the current fire included
    fn skew(&mut self, delta: f64);

    /// Block until the next fire is due. Returns false once the driver has
    /// stopped.
    fn wait(&mut self) -> bool;
}

/// Stops a [`SleepDriver`] from another thread.
///
/// A driver halted through its handle stays halted; `wait` returns false
/// from then on.
#[derive(Debug, Clone)]
pub struct StopHandle {
    halted: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.halted.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

/// Paces fires with `thread::sleep` against the system clock.
///
/// Periods missed because a tick overran are skipped, not replayed in a
/// burst; the clock's sync source (if any) is responsible for catching up.
#[derive(Debug)]
pub struct SleepDriver {
    interval: Option<Duration>,
    next_fire: Option<f64>,
    current_fire: Option<f64>,
    active: bool,
    halted: Arc<AtomicBool>,
}

impl SleepDriver {
    pub fn new() -> Self {
        Self {
            interval: None,
            next_fire: None,
            current_fire: None,
            active: false,
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            halted: Arc::clone(&self.halted),
        }
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn schedule_from(&mut self, origin: f64, interval: Duration, fire_immediately: bool) {
        self.interval = Some(interval);
        self.active = true;
        self.current_fire = None;
        self.next_fire = Some(if fire_immediately {
            origin
        } else {
            origin + interval.as_secs_f64()
        });
    }
}

impl Default for SleepDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for SleepDriver {
    fn start(&mut self, interval: Duration, fire_immediately: bool) {
        self.schedule_from(now_seconds(), interval, fire_immediately);
    }

    fn start_after(&mut self, delay: Duration, interval: Duration, fire_immediately: bool) {
        self.schedule_from(now_seconds() + delay.as_secs_f64(), interval, fire_immediately);
    }

    fn stop(&mut self) {
        self.active = false;
        self.next_fire = None;
        self.current_fire = None;
    }

    fn is_active(&self) -> bool {
        self.active && !self.is_halted()
    }

    fn interval(&self) -> Option<Duration> {
        self.interval
    }

    fn next_fire(&self) -> Option<f64> {
        self.next_fire
    }

    fn current_fire(&self) -> Option<f64> {
        self.current_fire
    }

    fn skew(&mut self, delta: f64) {
        for fire in [&mut self.next_fire, &mut self.current_fire] {
            if let Some(at) = fire.as_mut() {
                *at -= delta;
            }
        }
    }

    fn wait(&mut self) -> bool {
        loop {
            if !self.is_active() {
                self.active = false;
                return false;
            }
            let (Some(next), Some(interval)) = (self.next_fire, self.interval) else {
                return false;
            };

            let now = now_seconds();
            if now >= next {
                let period = interval.as_secs_f64();
                let missed = if period > 0.0 {
                    ((now - next) / period).floor()
                } else {
                    0.0
                };
                self.current_fire = Some(next + missed * period);
                self.next_fire = Some(next + (missed + 1.0) * period);
                return true;
            }

            let remaining = Duration::from_secs_f64(next - now);
            thread::sleep(remaining.min(MAX_SLEEP_SLICE));
        }
    }
}

/// A call the clock made on a [`ManualDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Start {
        interval: Duration,
        fire_immediately: bool,
    },
    StartAfter {
        delay: Duration,
        interval: Duration,
        fire_immediately: bool,
    },
    Stop,
    Skew(f64),
}

/// Shared record of [`DriverEvent`]s, readable after the driver has been
/// moved into a clock.
pub type DriverLog = Rc<RefCell<Vec<DriverEvent>>>;

/// Driver that never blocks. `wait` reports a fire every time it is asked
/// until the optional fire budget runs out.
///
/// Given a first fire time, each `wait` serves the scheduled fire and moves
/// the next one a full interval on, without looking at the system clock.
#[derive(Debug, Default)]
pub struct ManualDriver {
    interval: Option<Duration>,
    next_fire: Option<f64>,
    current_fire: Option<f64>,
    active: bool,
    budget: Option<u64>,
    log: DriverLog,
}

impl ManualDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop reporting fires from `wait` after `fires` of them
    pub fn with_budget(mut self, fires: u64) -> Self {
        self.budget = Some(fires);
        self
    }

    /// Pretend the first fire is due at `at` (epoch seconds)
    pub fn with_next_fire(mut self, at: f64) -> Self {
        self.next_fire = Some(at);
        self
    }

    pub fn log(&self) -> DriverLog {
        Rc::clone(&self.log)
    }

    fn serve_fire(&mut self) {
        let Some(next) = self.next_fire else {
            return;
        };
        self.current_fire = Some(next);
        let period = self.interval.map(|i| i.as_secs_f64()).unwrap_or_default();
        self.next_fire = Some(next + period);
    }
}

impl TimerDriver for ManualDriver {
    fn start(&mut self, interval: Duration, fire_immediately: bool) {
        self.interval = Some(interval);
        self.active = true;
        self.log.borrow_mut().push(DriverEvent::Start {
            interval,
            fire_immediately,
        });
    }

    fn start_after(&mut self, delay: Duration, interval: Duration, fire_immediately: bool) {
        self.interval = Some(interval);
        self.active = true;
        self.log.borrow_mut().push(DriverEvent::StartAfter {
            delay,
            interval,
            fire_immediately,
        });
    }

    fn stop(&mut self) {
        self.active = false;
        self.log.borrow_mut().push(DriverEvent::Stop);
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn interval(&self) -> Option<Duration> {
        self.interval
    }

    fn next_fire(&self) -> Option<f64> {
        self.next_fire
    }

    fn current_fire(&self) -> Option<f64> {
        self.current_fire
    }

    fn skew(&mut self, delta: f64) {
        for fire in [&mut self.next_fire, &mut self.current_fire] {
            if let Some(at) = fire.as_mut() {
                *at -= delta;
            }
        }
        self.log.borrow_mut().push(DriverEvent::Skew(delta));
    }

    fn wait(&mut self) -> bool {
        if !self.active {
            return false;
        }
        match self.budget.as_mut() {
            Some(0) => {
                self.active = false;
                false
            }
            Some(left) => {
                *left -= 1;
                self.serve_fire();
                true
            }
            None => {
                self.serve_fire();
                true
            }
        }
    }
}
