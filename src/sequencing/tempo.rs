use std::fmt;
use std::time::Duration;

/// Tempo in three forms for ready access:
///
/// - `bpm` (beats per minute)
/// - `ticks_per_beat` (pulses per quarter note)
/// - `ticks_per_minute`
///
/// Fields are private so the three values cannot drift apart; change them
/// with [`Tempo::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo {
    bpm: u32,
    ticks_per_beat: u32,
    ticks_per_minute: u32,
}

impl Tempo {
    /// Standard resolution: 24 ticks per quarter note (MIDI clock)
    pub const DEFAULT_TICKS_PER_BEAT: u32 = 24;

    /// Create a tempo from beats per minute and ticks per beat
    pub fn new(bpm: u32, ticks_per_beat: u32) -> Self {
        assert!(bpm > 0, "Tempo bpm must be > 0");
        assert!(ticks_per_beat > 0, "Tempo ticks per beat must be > 0");
        Self {
            bpm,
            ticks_per_beat,
            ticks_per_minute: bpm * ticks_per_beat,
        }
    }

    /// Tempo at the default resolution of 24 ticks per beat
    pub fn from_bpm(bpm: u32) -> Self {
        Self::new(bpm, Self::DEFAULT_TICKS_PER_BEAT)
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn ticks_per_minute(&self) -> u32 {
        self.ticks_per_minute
    }

    /// Recompute the tempo from whichever fields are supplied.
    ///
    /// A supplied `ticks_per_minute` wins and `bpm` is re-derived from it.
    /// Otherwise `ticks_per_minute = bpm * ticks_per_beat`, with unsupplied
    /// fields keeping their previous value.
    pub fn reset(
        &mut self,
        bpm: Option<u32>,
        ticks_per_beat: Option<u32>,
        ticks_per_minute: Option<u32>,
    ) {
        if let Some(bpm) = bpm {
            self.bpm = bpm;
        }
        if let Some(tpb) = ticks_per_beat {
            self.ticks_per_beat = tpb;
        }
        if let Some(tpm) = ticks_per_minute {
            self.ticks_per_minute = tpm;
            self.bpm = tpm / self.ticks_per_beat;
            return;
        }
        self.ticks_per_minute = self.bpm * self.ticks_per_beat;
    }

    /// Ticks per second, used by wall-clock sync sources
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_minute as f64 / 60.0
    }

    /// Period of the driver that advances the clock by one tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.ticks_per_minute as f64)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120, Self::DEFAULT_TICKS_PER_BEAT)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tempo(bpm={}, tpb={})", self.bpm, self.ticks_per_beat)
    }
}
