//! TUI module for beatclock
//!
//! Shows the clock position, tempo and recent track hits.

mod state;
mod timeline;
mod transport;

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::warn;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};

pub use state::{ControlMessage, TrackDynamicState, UiStateUpdate, MAX_TRACKS};

use timeline::render_timeline;
use transport::render_transport;

pub struct UiApp {
    state_rx: Consumer<UiStateUpdate>,
    control_tx: Producer<ControlMessage>,
    /// Latest state received from the clock thread
    current_state: UiStateUpdate,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        state_rx: Consumer<UiStateUpdate>,
        control_tx: Producer<ControlMessage>,
        initial_state: UiStateUpdate,
    ) -> Self {
        Self {
            state_rx,
            control_tx,
            current_state: initial_state,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_state();
            terminal.draw(|frame| self.render(frame))?;

            // Non-blocking, ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    fn poll_state(&mut self) {
        // Keep only the latest state
        while let Ok(state) = self.state_rx.pop() {
            self.current_state = state;
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let message = match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char(' ') => ControlMessage::TogglePlayback,
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => ControlMessage::TempoUp,
            KeyCode::Char('-') | KeyCode::Down => ControlMessage::TempoDown,
            KeyCode::Char('n') | KeyCode::Char('N') => ControlMessage::Nudge,
            _ => return,
        };
        if self.control_tx.push(message).is_err() {
            warn!("control queue full, dropped {message:?}");
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Min(6),    // Timeline
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        render_transport(frame, chunks[0], &self.current_state);

        let timeline_block = Block::default().title(" Measure ").borders(Borders::ALL);
        let timeline_inner = timeline_block.inner(chunks[1]);
        frame.render_widget(timeline_block, chunks[1]);
        render_timeline(frame, timeline_inner, &self.current_state);

        let help = Paragraph::new(" [Q] Quit  [Space] Play/Pause  [+/-] Tempo  [N] Nudge")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }
}
