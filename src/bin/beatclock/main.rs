//! beatclock - terminal monitor for the beat clock
//!
//! Run with: cargo run --bin beatclock

mod logging;
mod monitor;
mod ui;

use color_eyre::eyre::eyre;
use rtrb::RingBuffer;

use beatclock::clock::SleepDriver;
use beatclock::Tempo;
use ui::{UiApp, UiStateUpdate};

/// State updates buffered between clock and UI (one per tick)
const STATE_QUEUE_SIZE: usize = 256;
const CONTROL_QUEUE_SIZE: usize = 32;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    logging::setup()?;

    let tempo = Tempo::from_bpm(120);
    let (state_tx, state_rx) = RingBuffer::new(STATE_QUEUE_SIZE);
    let (control_tx, control_rx) = RingBuffer::new(CONTROL_QUEUE_SIZE);

    let driver = SleepDriver::new();
    let stop = driver.stop_handle();
    let clock_thread = monitor::spawn(tempo, driver, state_tx, control_rx)?;

    let mut terminal = ratatui::init();
    let result = UiApp::new(state_rx, control_tx, UiStateUpdate::new(tempo)).run(&mut terminal);
    ratatui::restore();

    stop.stop();
    clock_thread
        .join()
        .map_err(|_| eyre!("clock thread panicked"))?;
    result
}
