//! Transport bar widget - shows tempo, play state and position

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::UiStateUpdate;

pub fn render_transport(frame: &mut Frame, area: Rect, state: &UiStateUpdate) {
    let block = Block::default().title(" beatclock ").borders(Borders::ALL);

    let play_symbol = if state.is_playing { "▶" } else { "⏸" };
    let play_state_str = if state.is_playing { "Playing" } else { "Paused" };

    let line = Line::from(vec![
        Span::styled(
            format!(" BPM: {}  ", state.bpm),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if state.is_playing {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        Span::styled(
            format!("{}/{}  ", state.beats_per_measure, state.beat_unit),
            Style::default().fg(Color::White),
        ),
        Span::styled(format!("{}  ", state.beat), Style::default().fg(Color::White)),
        Span::styled(
            format!("tick {}  ", state.ticks),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{} tpb  {} pending", state.ticks_per_beat, state.pending_calls),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
