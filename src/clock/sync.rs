//! External tick sources a [`BeatClock`](super::BeatClock) can follow.

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use super::driver::now_seconds;
use crate::sequencing::Tempo;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Canonical source of tick/time information for a clock.
pub trait SyncClockSource {
    /// Latest `(tick, timestamp)` according to the source; the timestamp is
    /// wall-clock seconds since the UNIX epoch.
    fn last_tick(&mut self) -> (u64, f64);

    /// Called when the clock's tempo changes
    fn set_tempo(&mut self, _tempo: &Tempo) {}
}

/// Sync source derived from the system clock and a start time.
///
/// Ticks count up from `start` at the tempo's ticks-per-second rate, so two
/// processes sharing a start time and tempo agree on the current tick.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: f64,
    tempo: Tempo,
}

impl SystemClock {
    /// Start at midnight UTC of the current day
    pub fn new(tempo: Tempo) -> Self {
        let now = now_seconds();
        Self::with_start(tempo, now - now % SECONDS_PER_DAY)
    }

    pub fn with_start(tempo: Tempo, start: f64) -> Self {
        Self { start, tempo }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// `(tick, timestamp)` as of wall-clock time `now`
    pub fn tick_at(&self, now: f64) -> (u64, f64) {
        let tps = self.tempo.ticks_per_second();
        let elapsed = (now - self.start).max(0.0);
        let tick = (tps * elapsed).floor();
        (tick as u64, self.start + tick / tps)
    }
}

impl SyncClockSource for SystemClock {
    fn last_tick(&mut self) -> (u64, f64) {
        self.tick_at(now_seconds())
    }

    fn set_tempo(&mut self, tempo: &Tempo) {
        self.tempo = *tempo;
    }
}

/// A `(tick, timestamp)` pair published by an external clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPoint {
    pub tick: u64,
    pub timestamp: f64,
}

/// Producer half of [`sync_channel`]; lives on the thread that hears the
/// external clock.
#[cfg(feature = "rtrb")]
pub struct SyncFeed {
    producer: Producer<SyncPoint>,
}

#[cfg(feature = "rtrb")]
impl SyncFeed {
    /// Publish a sync point. Returns false if the ring is full and the point
    /// was dropped.
    pub fn push(&mut self, tick: u64, timestamp: f64) -> bool {
        self.producer.push(SyncPoint { tick, timestamp }).is_ok()
    }
}

/// Consumer half of [`sync_channel`]: reports the most recent point pushed
/// by the feed.
#[cfg(feature = "rtrb")]
pub struct RingSyncSource {
    consumer: Consumer<SyncPoint>,
    latest: SyncPoint,
}

#[cfg(feature = "rtrb")]
impl SyncClockSource for RingSyncSource {
    fn last_tick(&mut self) -> (u64, f64) {
        while let Ok(point) = self.consumer.pop() {
            self.latest = point;
        }
        (self.latest.tick, self.latest.timestamp)
    }
}

/// Lock-free channel from an external clock thread to a [`BeatClock`](super::BeatClock).
///
/// Until the first point arrives the source reports tick 0 at the time the
/// channel was created.
#[cfg(feature = "rtrb")]
pub fn sync_channel(capacity: usize) -> (SyncFeed, RingSyncSource) {
    let (producer, consumer) = RingBuffer::new(capacity);
    let source = RingSyncSource {
        consumer,
        latest: SyncPoint {
            tick: 0,
            timestamp: now_seconds(),
        },
    };
    (SyncFeed { producer }, source)
}
