//! Clock side of the monitor
//!
//! The clock lives on its own thread, paced by a `SleepDriver`. A one-tick
//! repeating event drains control messages from the UI and publishes a
//! `UiStateUpdate` every tick.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use log::{debug, error, info};
use rtrb::{Consumer, Producer};

use beatclock::clock::SleepDriver;
use beatclock::schedule::{Action, Arg, Args, ChildItem, Params, ScheduleItem};
use beatclock::{BeatClock, CallId, Division, SchedulePlayer, Tempo};

use super::ui::{ControlMessage, TrackDynamicState, UiStateUpdate, MAX_TRACKS};

const MIN_BPM: u32 = 30;
const MAX_BPM: u32 = 300;
const BPM_STEP: u32 = 5;
const NUDGE: Duration = Duration::from_millis(50);

pub const KICK: usize = 0;
pub const HAT: usize = 1;
pub const CLICK: usize = 2;
pub const TRACK_NAMES: [&str; 3] = ["kick", "hat", "click"];

type Tracks = Rc<RefCell<[TrackDynamicState; MAX_TRACKS]>>;

pub fn spawn(
    tempo: Tempo,
    driver: SleepDriver,
    state_tx: Producer<UiStateUpdate>,
    control_rx: Consumer<ControlMessage>,
) -> EyreResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("beatclock".into())
        .spawn(move || run_clock(tempo, driver, state_tx, control_rx))
        .wrap_err("failed to spawn clock thread")
}

fn run_clock(
    tempo: Tempo,
    driver: SleepDriver,
    mut state_tx: Producer<UiStateUpdate>,
    mut control_rx: Consumer<ControlMessage>,
) {
    let mut clock = BeatClock::builder().tempo(tempo).driver(driver).build();
    let tracks: Tracks = Rc::new(RefCell::new([TrackDynamicState::default(); MAX_TRACKS]));

    let player = demo_player(&tracks);
    let starter = player.clone();
    clock.call_when_running(move |clock| {
        starter.resume_playing(clock);
    });

    let click = clock.schedule(hit(&tracks, CLICK));
    if let Err(err) = click.start_after(&mut clock, 0, Division::ZERO, Division::EIGHTH) {
        error!("click track not started: {err}");
    }

    let playing = Rc::new(Cell::new(true));
    let toggle = Cell::new(None);
    let monitor_tracks = Rc::clone(&tracks);
    clock
        .schedule(move |clock: &mut BeatClock| {
            while let Ok(message) = control_rx.pop() {
                handle_control(clock, message, &player, &playing, &toggle);
            }
            let update = snapshot(clock, playing.get(), &monitor_tracks);
            // A full ring means the UI is behind; it only wants the latest
            let _ = state_tx.push(update);
        })
        .start_after_ticks(&mut clock, 0, 1);

    clock.run();
    info!("monitor clock thread exiting");
}

fn handle_control(
    clock: &mut BeatClock,
    message: ControlMessage,
    player: &SchedulePlayer,
    playing: &Cell<bool>,
    toggle: &Cell<Option<CallId>>,
) {
    match message {
        ControlMessage::TogglePlayback => {
            if let Some(id) = toggle.get().filter(|id| clock.is_pending(*id)) {
                debug!("toggle {id:?} already waiting for the measure");
                return;
            }
            let id = if playing.get() {
                player.pause_playing(clock)
            } else {
                player.resume_playing(clock)
            };
            toggle.set(Some(id));
            playing.set(!playing.get());
        }
        ControlMessage::TempoUp | ControlMessage::TempoDown => {
            let tempo = clock.tempo();
            let bpm = match message {
                ControlMessage::TempoUp => (tempo.bpm() + BPM_STEP).min(MAX_BPM),
                _ => tempo.bpm().saturating_sub(BPM_STEP).max(MIN_BPM),
            };
            clock.set_tempo(Tempo::new(bpm, tempo.ticks_per_beat()));
        }
        ControlMessage::Nudge => {
            if let Err(err) = clock.nudge(NUDGE) {
                error!("nudge failed: {err}");
            }
        }
    }
}

/// Action recording a hit on `track`, remembering the last `velocity` arg
fn hit(tracks: &Tracks, track: usize) -> impl FnMut(&mut BeatClock) + 'static {
    let action = record(tracks, track);
    move |clock: &mut BeatClock| action(clock, &Params::new())
}

fn record(tracks: &Tracks, track: usize) -> Action {
    let tracks = Rc::clone(tracks);
    Rc::new(move |clock: &mut BeatClock, params: &Params| {
        let mut tracks = tracks.borrow_mut();
        let state = &mut tracks[track];
        state.hits += 1;
        state.last_hit = clock.ticks();
        if let Some(velocity) = params.get("velocity").and_then(|v| v.as_int()) {
            state.last_value = velocity;
        }
    })
}

/// Kick on every quarter with a rising velocity; hats follow each kick
fn demo_player(tracks: &Tracks) -> SchedulePlayer {
    let kick = record(tracks, KICK);
    let velocity = Rc::new(Cell::new(60i64));
    let schedule = (0..).step_by(24).map(move |at| {
        let velocity = Rc::clone(&velocity);
        let args = Args::new().with(
            "velocity",
            Arg::thunk(move || {
                let next = 60 + (velocity.get() - 60 + 8) % 64;
                velocity.set(next);
                Arg::from(next)
            }),
        );
        ScheduleItem::new(at, Rc::clone(&kick), args)
    });

    let player = SchedulePlayer::new(schedule);
    let hat = record(tracks, HAT);
    player.add_child(std::iter::repeat_with(move || {
        ChildItem::new(Rc::clone(&hat), Args::new().with("velocity", 40))
    }));
    player
}

fn snapshot(clock: &BeatClock, playing: bool, tracks: &Tracks) -> UiStateUpdate {
    let tempo = clock.tempo();
    let meter = clock.meter();
    UiStateUpdate {
        ticks: clock.ticks(),
        beat: meter.beat(clock.ticks()),
        bpm: tempo.bpm(),
        ticks_per_beat: tempo.ticks_per_beat(),
        ticks_per_measure: meter.ticks_per_measure(),
        beats_per_measure: meter.beats_per_measure(),
        beat_unit: meter.beat_unit(),
        is_playing: playing,
        pending_calls: clock.pending_calls(),
        track_states: *tracks.borrow(),
        num_tracks: TRACK_NAMES.len() as u8,
    }
}
