//! Meter - time signature arithmetic over a tempo
//!
//! Converts between absolute clock ticks and musical positions: the measure a
//! tick falls in, how far into the measure it is, where the next n/d division
//! or measure boundary lands, and a hierarchical [`Beat`] decomposition.

use std::fmt;

use log::error;

use super::division::Division;
use super::tempo::Tempo;
use crate::error::Result;

/// Position of a tick within its measure, as
/// (measure, quarter, eighth, sixteenth, remaining ticks).
///
/// Decomposition stops at the first level that divides evenly, so a tick on
/// a quarter boundary reports zero for every deeper field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beat {
    pub measure: u64,
    pub quarter: u64,
    pub eighth: u64,
    pub sixteenth: u64,
    pub remainder: u64,
}

impl Beat {
    pub const fn new(measure: u64, quarter: u64, eighth: u64, sixteenth: u64, remainder: u64) -> Self {
        Self {
            measure,
            quarter,
            eighth,
            sixteenth,
            remainder,
        }
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}+{}",
            self.measure, self.quarter, self.eighth, self.sixteenth, self.remainder
        )
    }
}

/// A musical meter: beats per measure, the note value of one beat, and how
/// many of those bars make one measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meter {
    beats_per_measure: u32,
    beat_unit: u32,
    repeat_count: u32,
    ticks_per_beat: u32,
    ticks_per_measure: u64,
    strict: bool,
}

impl Meter {
    /// Create a meter bound to `tempo`.
    ///
    /// Zero for any field is a contract violation and panics here rather than
    /// dividing by zero inside the tick loop later.
    pub fn new(beats_per_measure: u32, beat_unit: u32, repeat_count: u32, tempo: Tempo) -> Self {
        assert!(beats_per_measure > 0, "Meter beats per measure must be > 0");
        assert!(beat_unit > 0, "Meter beat unit must be > 0");
        assert!(repeat_count > 0, "Meter repeat count must be > 0");
        let mut meter = Self {
            beats_per_measure,
            beat_unit,
            repeat_count,
            ticks_per_beat: 0,
            ticks_per_measure: 0,
            strict: true,
        };
        meter.reset_tempo(tempo);
        meter
    }

    /// 4/4 at the given tempo
    pub fn standard(tempo: Tempo) -> Self {
        Self::new(4, 4, 1, tempo)
    }

    /// Switch to lenient division: inexact n/d values are logged and floored
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn beat_unit(&self) -> u32 {
        self.beat_unit
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn ticks_per_measure(&self) -> u64 {
        self.ticks_per_measure
    }

    /// Recompute ticks per measure for a new tempo
    pub fn reset_tempo(&mut self, tempo: Tempo) {
        self.ticks_per_beat = tempo.ticks_per_beat();
        // floor(tpb * beats * 4 / unit * repeat), kept in integers
        self.ticks_per_measure = self.ticks_per_beat as u64
            * self.beats_per_measure as u64
            * 4
            * self.repeat_count as u64
            / self.beat_unit as u64;
    }

    /// Ticks in one quarter note: ticks per measure over quarters per measure
    fn ticks_per_quarter(&self) -> u64 {
        self.ticks_per_beat as u64
    }

    /// Decompose absolute `ticks` into a [`Beat`]
    pub fn beat(&self, ticks: u64) -> Beat {
        let (measure, rest) = divmod(ticks, self.ticks_per_measure);
        if rest == 0 {
            return Beat::new(measure, 0, 0, 0, 0);
        }

        let quarter_ticks = self.ticks_per_quarter();
        let (quarter, rest) = divmod(rest, quarter_ticks);
        if rest == 0 {
            return Beat::new(measure, quarter, 0, 0, 0);
        }

        let eighth_ticks = quarter_ticks / 2;
        if eighth_ticks == 0 {
            return Beat::new(measure, quarter, 0, 0, rest);
        }
        let (eighth, rest) = divmod(rest, eighth_ticks);
        if rest == 0 {
            return Beat::new(measure, quarter, eighth, 0, 0);
        }

        let sixteenth_ticks = quarter_ticks / 4;
        if sixteenth_ticks == 0 {
            return Beat::new(measure, quarter, eighth, 0, rest);
        }
        let (sixteenth, rest) = divmod(rest, sixteenth_ticks);
        Beat::new(measure, quarter, eighth, sixteenth, rest)
    }

    /// Ticks elapsed since the start of the measure containing `ticks`
    pub fn ticks_in_measure(&self, ticks: u64) -> u64 {
        ticks % self.ticks_per_measure
    }

    /// Zero-based index of the measure containing `ticks`
    pub fn measure_index(&self, ticks: u64) -> u64 {
        ticks / self.ticks_per_measure
    }

    /// Convert n/d of a measure to ticks.
    ///
    /// In strict mode an n/d that does not land on a whole tick is an error;
    /// in lenient mode it is logged and rounded down.
    pub fn division_to_ticks(&self, division: impl Into<Division>) -> Result<u64> {
        let division = division.into();
        match division.ticks_in(self.ticks_per_measure) {
            Ok(ticks) => Ok(ticks),
            Err(err) if self.strict => Err(err),
            Err(err) => {
                error!("<division_to_ticks> {err}");
                Ok(division.floor_ticks_in(self.ticks_per_measure))
            }
        }
    }

    /// Short alias for [`Meter::division_to_ticks`]
    pub fn dtt(&self, division: impl Into<Division>) -> Result<u64> {
        self.division_to_ticks(division)
    }

    /// Next absolute tick at or after `ticks` that lands on division n/d of
    /// some measure
    pub fn next_division(&self, ticks: u64, division: impl Into<Division>) -> Result<u64> {
        let measure_start = self.measure_index(ticks) * self.ticks_per_measure;
        let next = measure_start + self.division_to_ticks(division)?;
        if next < ticks {
            return Ok(next + self.ticks_per_measure);
        }
        Ok(next)
    }

    /// Start of the measure `measures` after the one containing `ticks`
    pub fn next_measure(&self, ticks: u64, measures: u64) -> u64 {
        self.measure_index(ticks) * self.ticks_per_measure + measures * self.ticks_per_measure
    }

    /// Ticks remaining until the next measure boundary (a full measure when
    /// `ticks` is already on one)
    pub fn until_next_measure(&self, ticks: u64) -> u64 {
        self.ticks_per_measure - self.ticks_in_measure(ticks)
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::standard(Tempo::default())
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeat_count == 1 {
            write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
        } else {
            write!(
                f,
                "{}/{} x{}",
                self.beats_per_measure, self.beat_unit, self.repeat_count
            )
        }
    }
}

fn divmod(ticks: u64, by: u64) -> (u64, u64) {
    (ticks / by, ticks % by)
}
