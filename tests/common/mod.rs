#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use beatclock::clock::ManualDriver;
use beatclock::{BeatClock, Meter, Tempo};

/// Fire log shared between a test and the actions it schedules
pub type Calls<T> = Rc<RefCell<Vec<T>>>;

pub fn calls<T>() -> Calls<T> {
    Rc::new(RefCell::new(Vec::new()))
}

/// 4/4 clock at 135 bpm on a manual driver, already started
pub fn started_clock() -> BeatClock {
    let tempo = Tempo::from_bpm(135);
    let mut clock = BeatClock::builder()
        .tempo(tempo)
        .meter(Meter::standard(tempo))
        .driver(ManualDriver::new())
        .build();
    clock.start();
    clock
}

/// Advance `ticks` ticks, draining calls due at each one
pub fn run_ticks(clock: &mut BeatClock, ticks: u64) {
    for _ in 0..ticks {
        clock.run_until_current();
        clock.tick();
    }
    clock.run_until_current();
}
