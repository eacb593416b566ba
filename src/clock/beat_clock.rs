//! BeatClock - virtual time in ticks, paced by a periodic driver
//!
//! The clock owns a tick counter, the meters used to convert musical
//! positions to ticks, and a queue of pending calls keyed by tick. A
//! [`TimerDriver`] decides when `tick()` runs; an optional
//! [`SyncClockSource`] keeps the counter aligned with an authoritative
//! external clock.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

use super::driver::{SleepDriver, TimerDriver};
use super::queue::{CallId, Callback, DelayedCallQueue};
use super::settings::{ClockSettings, InstrumentBackend};
use super::sync::SyncClockSource;
use crate::error::{Error, Result};
use crate::schedule::ScheduledEvent;
use crate::sequencing::{Meter, Tempo};

/// Discrepancy between the driver's current fire and the sync source's
/// timestamp above which the driver is skewed (seconds)
const SKEW_TOLERANCE: f64 = 0.0005;

/// Outcome of one drift correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Ticks replayed one at a time, firing due calls
    pub replayed: u64,
    /// Ticks every remaining pending call was pushed back by
    pub offset: u64,
}

pub struct BeatClock {
    ticks: u64,
    tempo: Tempo,
    meters: Vec<Meter>,
    queue: DelayedCallQueue,
    started: bool,
    when_running: VecDeque<Callback>,
    driver: Box<dyn TimerDriver>,
    sync: Option<Box<dyn SyncClockSource>>,
    settings: ClockSettings,
    backend: Option<Box<dyn InstrumentBackend>>,
}

impl BeatClock {
    /// A 4/4 clock at `tempo`, paced by a [`SleepDriver`]
    pub fn new(tempo: Tempo) -> Self {
        Self::builder().tempo(tempo).build()
    }

    pub fn builder() -> BeatClockBuilder {
        BeatClockBuilder::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Primary meter
    pub fn meter(&self) -> &Meter {
        &self.meters[0]
    }

    pub fn meters(&self) -> &[Meter] {
        &self.meters
    }

    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    /// True once started and while the driver is active
    pub fn is_running(&self) -> bool {
        self.started && self.driver.is_active()
    }

    pub fn pending_calls(&self) -> usize {
        self.queue.len()
    }

    /// True while the call behind `id` has neither fired nor been cancelled
    pub fn is_pending(&self, id: CallId) -> bool {
        self.queue.contains(id)
    }

    pub fn next_pending_tick(&self) -> Option<u64> {
        self.queue.next_tick()
    }

    pub fn has_sync_source(&self) -> bool {
        self.sync.is_some()
    }

    /// Initialize the backend, start the driver, and flush callbacks queued
    /// with [`BeatClock::call_when_running`]. Does nothing if already started.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.init_backend();
        self.driver.start(self.tempo.tick_interval(), true);
        self.started = true;
        info!(
            "clock started: {} {} at tick {}",
            self.tempo,
            self.meter(),
            self.ticks
        );

        while let Some(callback) = self.when_running.pop_front() {
            callback(self);
        }
    }

    /// Start, then tick every time the driver fires until it stops
    pub fn run(&mut self) {
        self.start();
        while self.driver.wait() {
            self.tick();
        }
        info!("clock loop exited at tick {}", self.ticks);
    }

    pub fn stop(&mut self) {
        self.driver.stop();
        info!("clock stopped at tick {}", self.ticks);
    }

    fn init_backend(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            info!("no instrument backend; clock runs without one");
            return;
        };
        match backend.init(&self.settings) {
            Ok(()) => info!(
                "instrument backend ready ({}, {} channels)",
                self.settings.synth_audio_device, self.settings.synth_channels
            ),
            Err(err) => warn!("{err}; continuing without it"),
        }
    }

    /// Advance one tick and fire what is due.
    ///
    /// With a sync source bound, a clock more than one tick ahead of the
    /// source skips the tick; one that fell behind is caught up with
    /// [`BeatClock::sync_to_tick`], and the driver is skewed toward the
    /// source's timestamp.
    pub fn tick(&mut self) {
        if let Some(sync) = self.sync.as_mut() {
            let (ext_tick, _) = sync.last_tick();
            if self.ticks > ext_tick + 1 {
                debug!("ahead by {} ticks, waiting", self.ticks - (ext_tick + 1));
                return;
            }
        }

        self.ticks += 1;
        self.run_until_current();

        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        let (ext_tick, timestamp) = sync.last_tick();
        if ext_tick > self.ticks {
            self.sync_to_tick(ext_tick, timestamp);
        }
        if let Some(expected) = self.driver.current_fire() {
            let off_by = expected - timestamp;
            if off_by.abs() > SKEW_TOLERANCE {
                debug!("off by {:.3}ms; skewing time", off_by * 1000.0);
                self.driver.skew(off_by);
            }
        }
    }

    /// Catch up to an external tick.
    ///
    /// Replays at most one measure's worth of ticks (the phase distance when
    /// further behind), then pushes every remaining pending call back by what
    /// was not replayed and jumps to `ext_tick`.
    pub fn sync_to_tick(&mut self, ext_tick: u64, timestamp: f64) -> SyncReport {
        let ticks_per_measure = self.meter().ticks_per_measure();
        let mut delta = ext_tick.saturating_sub(self.ticks);
        debug!(
            "behind by {delta} ticks (ticks={} expected={ext_tick} at {timestamp:.3})",
            self.ticks
        );
        if delta > ticks_per_measure {
            let mut target = ext_tick % ticks_per_measure;
            let current = self.ticks % ticks_per_measure;
            if target < current {
                target += ticks_per_measure;
            }
            delta = target - current;
        }

        for i in 0..delta {
            debug!("catch up tick: {i}");
            self.ticks += 1;
            self.run_until_current();
        }

        let offset = ext_tick.saturating_sub(self.ticks);
        debug!("adjusting {} pending calls by offset: {offset}", self.queue.len());
        self.queue.shift(offset);
        self.ticks = self.ticks.max(ext_tick);

        SyncReport {
            replayed: delta,
            offset,
        }
    }

    /// Fire every pending call due at or before the current tick, in tick
    /// order then registration order. Calls registered while this runs wait
    /// for the next pass. Returns how many fired.
    pub fn run_until_current(&mut self) -> usize {
        let mut fired = 0;
        for key in self.queue.due(self.ticks) {
            // Earlier callbacks in this pass may have cancelled it
            if let Some(callback) = self.queue.take(key) {
                callback(self);
                fired += 1;
            }
        }
        fired
    }

    /// Change tempo.
    ///
    /// Restarts an active driver at the new interval. With a sync source,
    /// `ticks` snaps to the source's tick without re-shifting pending calls,
    /// so calls may fire much later than intended after a tempo change.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        info!("tempo {} -> {}", self.tempo, tempo);
        self.tempo = tempo;
        for meter in self.meters.iter_mut() {
            meter.reset_tempo(tempo);
        }
        if self.driver.is_active() {
            self.driver.stop();
            self.driver.start(tempo.tick_interval(), true);
        }
        if let Some(sync) = self.sync.as_mut() {
            sync.set_tempo(&tempo);
            let (ext_tick, _) = sync.last_tick();
            self.ticks = ext_tick;
        }
    }

    /// A repeating event for `action`; nothing happens until it is started
    pub fn schedule<F>(&self, action: F) -> ScheduledEvent
    where
        F: FnMut(&mut BeatClock) + 'static,
    {
        ScheduledEvent::new(action)
    }

    /// Fire `f` once, `delta` ticks from now. A zero delta still defers to
    /// the next pass over the queue.
    pub fn call_later<F>(&mut self, delta: u64, f: F) -> CallId
    where
        F: FnOnce(&mut BeatClock) + 'static,
    {
        self.queue.push(self.ticks + delta, Box::new(f))
    }

    /// Fire `f` at the start of the measure `measures` after the current one
    pub fn call_after_measures<F>(&mut self, measures: u64, f: F) -> CallId
    where
        F: FnOnce(&mut BeatClock) + 'static,
    {
        let target = self.meter().next_measure(self.ticks, measures);
        self.call_later(target.saturating_sub(self.ticks), f)
    }

    pub fn cancel(&mut self, id: CallId) -> bool {
        self.queue.cancel(id)
    }

    /// Run `f` now if the clock has started, otherwise when it starts
    pub fn call_when_running<F>(&mut self, f: F)
    where
        F: FnOnce(&mut BeatClock) + 'static,
    {
        if self.started {
            f(self);
        } else {
            self.when_running.push_back(Box::new(f));
        }
    }

    /// Pause the driver for `pause` and restart it at the current interval;
    /// a manual phase adjustment for clocks without a sync source.
    pub fn nudge(&mut self, pause: Duration) -> Result<()> {
        if !self.started {
            return Err(Error::ClockNotStarted);
        }
        debug!("nudging clock by {:.3}s", pause.as_secs_f64());
        self.driver.stop();
        self.driver
            .start_after(pause, self.tempo.tick_interval(), true);
        Ok(())
    }
}

impl Default for BeatClock {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for BeatClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeatClock")
            .field("ticks", &self.ticks)
            .field("tempo", &self.tempo)
            .field("meters", &self.meters)
            .field("queue", &self.queue)
            .field("started", &self.started)
            .field("sync", &self.sync.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct BeatClockBuilder {
    tempo: Tempo,
    meters: Vec<Meter>,
    driver: Option<Box<dyn TimerDriver>>,
    sync: Option<Box<dyn SyncClockSource>>,
    settings: ClockSettings,
    backend: Option<Box<dyn InstrumentBackend>>,
}

impl BeatClockBuilder {
    pub fn tempo(mut self, tempo: Tempo) -> Self {
        self.tempo = tempo;
        self
    }

    /// Primary meter; replaces any meters set before
    pub fn meter(mut self, meter: Meter) -> Self {
        self.meters = vec![meter];
        self
    }

    /// All meters, primary first. Empty means 4/4.
    pub fn meters(mut self, meters: Vec<Meter>) -> Self {
        self.meters = meters;
        self
    }

    pub fn driver(mut self, driver: impl TimerDriver + 'static) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    pub fn sync_source(mut self, sync: impl SyncClockSource + 'static) -> Self {
        self.sync = Some(Box::new(sync));
        self
    }

    pub fn settings(mut self, settings: ClockSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn backend(mut self, backend: impl InstrumentBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn build(self) -> BeatClock {
        let tempo = self.tempo;
        let mut meters = self.meters;
        if meters.is_empty() {
            meters.push(Meter::standard(tempo));
        }
        for meter in meters.iter_mut() {
            meter.reset_tempo(tempo);
        }

        let mut sync = self.sync;
        let ticks = match sync.as_mut() {
            Some(sync) => {
                sync.set_tempo(&tempo);
                sync.last_tick().0
            }
            None => 0,
        };

        BeatClock {
            ticks,
            tempo,
            meters,
            queue: DelayedCallQueue::new(),
            started: false,
            when_running: VecDeque::new(),
            driver: self
                .driver
                .unwrap_or_else(|| Box::new(SleepDriver::new())),
            sync,
            settings: self.settings,
            backend: self.backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::clock::driver::{DriverEvent, DriverLog, ManualDriver};
    use crate::clock::settings::SynthChannels;

    /// Sync source whose position the test moves by hand
    #[derive(Clone, Default)]
    struct SharedSync(Rc<Cell<(u64, f64)>>);

    impl SharedSync {
        fn set(&self, tick: u64, timestamp: f64) {
            self.0.set((tick, timestamp));
        }
    }

    impl SyncClockSource for SharedSync {
        fn last_tick(&mut self) -> (u64, f64) {
            self.0.get()
        }
    }

    fn manual_clock() -> BeatClock {
        BeatClock::builder().driver(ManualDriver::new()).build()
    }

    fn run_ticks(clock: &mut BeatClock, ticks: u64) {
        for _ in 0..ticks {
            clock.run_until_current();
            clock.tick();
        }
        clock.run_until_current();
    }

    fn recorder() -> (Rc<RefCell<Vec<u64>>>, impl Fn(&mut BeatClock) + Clone) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        (fired, move |clock: &mut BeatClock| {
            sink.borrow_mut().push(clock.ticks())
        })
    }

    #[test]
    fn test_default_meter_is_standard() {
        let clock = BeatClock::new(Tempo::from_bpm(120));
        assert_eq!(clock.meters().len(), 1);
        assert_eq!(clock.meter().beats_per_measure(), 4);
        assert_eq!(clock.meter().beat_unit(), 4);
        assert_eq!(clock.meter().repeat_count(), 1);
        assert_eq!(clock.ticks(), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_meters_follow_clock_tempo() {
        let clock = BeatClock::builder()
            .tempo(Tempo::new(120, 48))
            .meters(vec![Meter::default(), Meter::new(3, 4, 1, Tempo::default())])
            .driver(ManualDriver::new())
            .build();
        assert_eq!(clock.meter().ticks_per_measure(), 192);
        assert_eq!(clock.meters()[1].ticks_per_measure(), 144);
    }

    #[test]
    fn test_call_later() {
        let mut clock = manual_clock();
        let (fired, record) = recorder();
        clock.call_later(3, record.clone());
        clock.call_later(1, record);
        assert_eq!(clock.pending_calls(), 2);
        assert_eq!(clock.next_pending_tick(), Some(1));

        run_ticks(&mut clock, 5);
        assert_eq!(*fired.borrow(), vec![1, 3]);
        assert_eq!(clock.pending_calls(), 0);
    }

    #[test]
    fn test_same_tick_fifo() {
        let mut clock = manual_clock();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            clock.call_later(2, move |_| order.borrow_mut().push(name));
        }
        run_ticks(&mut clock, 2);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_delay_is_deferred() {
        let mut clock = manual_clock();
        let (fired, record) = recorder();
        clock.call_later(1, move |clock| {
            clock.call_later(0, record);
        });

        clock.tick();
        // Registered during the pass, so not fired by it
        assert!(fired.borrow().is_empty());
        assert_eq!(clock.pending_calls(), 1);
        clock.run_until_current();
        assert_eq!(*fired.borrow(), vec![1]);
    }

    #[test]
    fn test_cancel() {
        let mut clock = manual_clock();
        let (fired, record) = recorder();
        let id = clock.call_later(2, record.clone());
        let kept = clock.call_later(2, record);
        assert!(clock.is_pending(id));
        assert!(clock.cancel(id));
        assert!(!clock.is_pending(id));
        assert!(!clock.cancel(id));
        run_ticks(&mut clock, 3);
        assert_eq!(*fired.borrow(), vec![2]);
        // Fired calls are no longer pending either
        assert!(!clock.is_pending(kept));
    }

    #[test]
    fn test_cancel_sibling_mid_pass() {
        let mut clock = manual_clock();
        let (fired, record) = recorder();
        let victim = Rc::new(Cell::new(None));
        let handle = Rc::clone(&victim);
        clock.call_later(1, move |clock| {
            if let Some(id) = handle.get() {
                clock.cancel(id);
            }
        });
        victim.set(Some(clock.call_later(1, record)));

        run_ticks(&mut clock, 2);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_call_after_measures() {
        let mut clock = manual_clock();
        run_ticks(&mut clock, 30);
        let (fired, record) = recorder();
        clock.call_after_measures(1, record.clone());
        clock.call_after_measures(2, record);
        run_ticks(&mut clock, 200);
        assert_eq!(*fired.borrow(), vec![96, 192]);
    }

    #[test]
    fn test_call_when_running() {
        let mut clock = manual_clock();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            clock.call_when_running(move |_| order.borrow_mut().push(i));
        }
        assert!(order.borrow().is_empty());

        clock.start();
        assert!(clock.is_running());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);

        let after = Rc::clone(&order);
        clock.call_when_running(move |_| after.borrow_mut().push(3));
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_start_and_stop() {
        let driver = ManualDriver::new();
        let log = driver.log();
        let mut clock = BeatClock::builder().driver(driver).build();
        clock.start();
        clock.start();
        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(
            *log.borrow(),
            vec![
                DriverEvent::Start {
                    interval: Tempo::default().tick_interval(),
                    fire_immediately: true
                },
                DriverEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_run_until_driver_stops() {
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new().with_budget(10))
            .build();
        let (fired, record) = recorder();
        clock.call_later(4, record);
        clock.run();
        assert_eq!(clock.ticks(), 10);
        assert_eq!(*fired.borrow(), vec![4]);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_set_tempo_restarts_driver() {
        let driver = ManualDriver::new();
        let log = driver.log();
        let mut clock = BeatClock::builder()
            .tempo(Tempo::from_bpm(135))
            .driver(driver)
            .build();

        // Not started: nothing to restart
        clock.set_tempo(Tempo::from_bpm(60));
        assert!(log.borrow().is_empty());
        let interval_before = clock.tempo().tick_interval();

        clock.start();
        clock.set_tempo(Tempo::from_bpm(120));
        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], DriverEvent::Stop);
        let DriverEvent::Start { interval, .. } = log[2] else {
            panic!("expected a restart, got {:?}", log[2]);
        };
        let ratio = interval_before.as_secs_f64() / interval.as_secs_f64();
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_tempo_resets_meters() {
        let mut clock = manual_clock();
        clock.set_tempo(Tempo::new(120, 96));
        assert_eq!(clock.meter().ticks_per_measure(), 384);
    }

    #[test]
    fn test_set_tempo_snaps_to_sync_source() {
        let sync = SharedSync::default();
        sync.set(10, 0.0);
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new())
            .sync_source(sync.clone())
            .build();
        assert_eq!(clock.ticks(), 10);

        let (fired, record) = recorder();
        clock.call_later(5, record);
        sync.set(100, 0.0);
        clock.set_tempo(Tempo::from_bpm(90));
        // Ticks jump but the pending call keeps its absolute target
        assert_eq!(clock.ticks(), 100);
        assert_eq!(clock.next_pending_tick(), Some(15));
        clock.run_until_current();
        assert_eq!(*fired.borrow(), vec![100]);
    }

    #[test]
    fn test_nudge() {
        let driver = ManualDriver::new();
        let log = driver.log();
        let mut clock = BeatClock::builder().driver(driver).build();
        assert_eq!(
            clock.nudge(Duration::from_millis(100)),
            Err(Error::ClockNotStarted)
        );

        clock.start();
        assert_eq!(clock.nudge(Duration::from_millis(100)), Ok(()));
        assert_eq!(
            log.borrow()[1..],
            [
                DriverEvent::Stop,
                DriverEvent::StartAfter {
                    delay: Duration::from_millis(100),
                    interval: clock.tempo().tick_interval(),
                    fire_immediately: true,
                },
            ]
        );
    }

    #[test]
    fn test_sync_ahead_skips_tick() {
        let sync = SharedSync::default();
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new())
            .sync_source(sync.clone())
            .build();
        let (fired, record) = recorder();
        clock.call_later(2, record);

        clock.tick();
        assert_eq!(clock.ticks(), 1);
        // Source still at 0: we are one ahead, which is allowed once
        clock.tick();
        assert_eq!(clock.ticks(), 2);
        clock.tick();
        assert_eq!(clock.ticks(), 2);
        assert_eq!(*fired.borrow(), vec![2]);

        sync.set(2, 0.0);
        clock.tick();
        assert_eq!(clock.ticks(), 3);
    }

    #[test]
    fn test_sync_catches_up_firing_each_tick() {
        let sync = SharedSync::default();
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new())
            .sync_source(sync.clone())
            .build();
        let (fired, record) = recorder();
        for delta in [2, 5, 8, 40] {
            clock.call_later(delta, record.clone());
        }

        sync.set(10, 0.0);
        clock.tick();
        assert_eq!(clock.ticks(), 10);
        assert_eq!(*fired.borrow(), vec![2, 5, 8]);
        assert_eq!(clock.next_pending_tick(), Some(40));
    }

    #[test]
    fn test_sync_clamps_to_one_measure() {
        let mut clock = manual_clock();
        let (fired, record) = recorder();
        clock.call_later(10, record.clone());
        clock.call_later(150, record);

        // 1000 ticks behind; phase distance is 1000 % 96 = 40
        let report = clock.sync_to_tick(1000, 0.0);
        assert_eq!(report.replayed, 40);
        assert_eq!(report.offset, 960);
        assert!(report.replayed <= clock.meter().ticks_per_measure());
        assert_eq!(clock.ticks(), 1000);
        assert_eq!(*fired.borrow(), vec![10]);
        // The remaining call keeps its distance from now
        assert_eq!(clock.next_pending_tick(), Some(150 + 960));
    }

    #[test]
    fn test_sync_phase_wraps() {
        let mut clock = manual_clock();
        run_ticks(&mut clock, 90);
        // 90 % 96 = 90, 400 % 96 = 16: wrap forward 22 ticks
        let report = clock.sync_to_tick(400, 0.0);
        assert_eq!(report.replayed, 22);
        assert_eq!(report.offset, 400 - 112);
        assert_eq!(clock.ticks(), 400);
    }

    #[test]
    fn test_sync_within_measure_replays_all() {
        let mut clock = manual_clock();
        let report = clock.sync_to_tick(96, 0.0);
        assert_eq!(report, SyncReport { replayed: 96, offset: 0 });

        // Never moves backwards
        let report = clock.sync_to_tick(50, 0.0);
        assert_eq!(report, SyncReport::default());
        assert_eq!(clock.ticks(), 96);
    }

    fn skews(log: &DriverLog) -> Vec<f64> {
        log.borrow()
            .iter()
            .filter_map(|event| match event {
                DriverEvent::Skew(delta) => Some(*delta),
                _ => None,
            })
            .collect()
    }

    fn timed_sync_clock(sync: &SharedSync) -> (BeatClock, DriverLog) {
        let driver = ManualDriver::new().with_next_fire(100.0);
        let log = driver.log();
        let mut clock = BeatClock::builder()
            .driver(driver)
            .sync_source(sync.clone())
            .build();
        clock.start();
        (clock, log)
    }

    #[test]
    fn test_skew_correction() {
        let sync = SharedSync::default();
        let (mut clock, log) = timed_sync_clock(&sync);
        let interval = clock.tempo().tick_interval().as_secs_f64();

        sync.set(0, 100.0002);
        assert!(clock.driver.wait());
        clock.tick();
        assert!(skews(&log).is_empty());

        sync.set(1, 100.0 + interval - 0.01);
        assert!(clock.driver.wait());
        clock.tick();
        let skews = skews(&log);
        assert_eq!(skews.len(), 1);
        assert!((skews[0] - 0.01).abs() < 1e-9);

        // The following fire moves with the current one
        let next = clock.driver.next_fire().unwrap_or_default();
        assert!((next - (100.0 + 2.0 * interval - 0.01)).abs() < 1e-9);
    }

    #[test]
    fn test_source_on_schedule_never_skews() {
        let sync = SharedSync::default();
        let (mut clock, log) = timed_sync_clock(&sync);
        let interval = clock.tempo().tick_interval().as_secs_f64();

        for fire in 0..96u64 {
            sync.set(fire, 100.0 + fire as f64 * interval);
            assert!(clock.driver.wait());
            clock.tick();
            assert_eq!(clock.ticks(), fire + 1);
        }
        assert!(skews(&log).is_empty());
    }

    #[test]
    fn test_no_skew_before_first_fire() {
        let sync = SharedSync::default();
        let (mut clock, log) = timed_sync_clock(&sync);
        sync.set(0, 50.0);
        clock.tick();
        assert!(skews(&log).is_empty());
    }

    struct CountingBackend {
        inits: Rc<Cell<u32>>,
        fail: bool,
    }

    impl InstrumentBackend for CountingBackend {
        fn init(&mut self, settings: &ClockSettings) -> Result<()> {
            self.inits.set(self.inits.get() + 1);
            if self.fail {
                return Err(Error::Backend(format!(
                    "no device {}",
                    settings.synth_audio_device
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn test_backend_init() {
        let inits = Rc::new(Cell::new(0));
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new())
            .settings(ClockSettings {
                synth_audio_device: "null".into(),
                synth_channels: SynthChannels::Mono,
            })
            .backend(CountingBackend {
                inits: Rc::clone(&inits),
                fail: false,
            })
            .build();
        clock.start();
        clock.start();
        assert_eq!(inits.get(), 1);
        assert_eq!(clock.settings().synth_channels, SynthChannels::Mono);
    }

    #[test]
    fn test_backend_failure_still_starts() {
        let inits = Rc::new(Cell::new(0));
        let mut clock = BeatClock::builder()
            .driver(ManualDriver::new())
            .backend(CountingBackend {
                inits: Rc::clone(&inits),
                fail: true,
            })
            .build();
        clock.start();
        assert_eq!(inits.get(), 1);
        assert!(clock.is_running());
    }
}
