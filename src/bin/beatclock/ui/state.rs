//! Shared state types for UI communication
//!
//! Everything crossing the ring buffers is `Copy` so the clock thread never
//! allocates to publish.

use beatclock::{Beat, Meter, Tempo};

/// Most tracks shown in the timeline
pub const MAX_TRACKS: usize = 4;

/// Commands sent from UI thread to clock thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    /// Pause or resume the schedule on the next measure
    TogglePlayback,
    TempoUp,
    TempoDown,
    /// Hold the driver back briefly to shift phase
    Nudge,
}

/// Per-tick snapshot from the clock thread
#[derive(Clone, Copy, Debug)]
pub struct UiStateUpdate {
    pub ticks: u64,
    pub beat: Beat,
    pub bpm: u32,
    pub ticks_per_beat: u32,
    pub ticks_per_measure: u64,
    pub beats_per_measure: u32,
    pub beat_unit: u32,
    /// Whether the schedule is (or is about to be) playing
    pub is_playing: bool,
    pub pending_calls: usize,
    pub track_states: [TrackDynamicState; MAX_TRACKS],
    pub num_tracks: u8,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TrackDynamicState {
    pub hits: u32,
    /// Tick of the most recent hit
    pub last_hit: u64,
    pub last_value: i64,
}

impl UiStateUpdate {
    /// State before the clock has reported anything
    pub fn new(tempo: Tempo) -> Self {
        let meter = Meter::standard(tempo);
        Self {
            ticks: 0,
            beat: Beat::default(),
            bpm: tempo.bpm(),
            ticks_per_beat: tempo.ticks_per_beat(),
            ticks_per_measure: meter.ticks_per_measure(),
            beats_per_measure: meter.beats_per_measure(),
            beat_unit: meter.beat_unit(),
            is_playing: true,
            pending_calls: 0,
            track_states: [TrackDynamicState::default(); MAX_TRACKS],
            num_tracks: 0,
        }
    }
}
