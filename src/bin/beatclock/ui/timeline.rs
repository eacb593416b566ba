//! Timeline widget - one measure of beat grid with recent hits and playhead

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::UiStateUpdate;
use crate::monitor::TRACK_NAMES;

const TRACK_LABEL_WIDTH: u16 = 8;

pub fn render_timeline(frame: &mut Frame, area: Rect, state: &UiStateUpdate) {
    if area.height < 2 || area.width < 20 || state.ticks_per_measure == 0 {
        return;
    }

    let timeline_width = area.width.saturating_sub(TRACK_LABEL_WIDTH + 2);
    let chars_per_tick = timeline_width as f64 / state.ticks_per_measure as f64;
    let ticks_per_beat = (state.ticks_per_measure / state.beats_per_measure.max(1) as u64).max(1);
    let measure_start = state.ticks - state.ticks % state.ticks_per_measure;
    let playhead_char = ((state.ticks - measure_start) as f64 * chars_per_tick) as u16;
    let tick_at = |column: u16| (column as f64 / chars_per_tick) as u64;

    let mut lines = Vec::new();

    // Beat markers row
    let mut beat_markers = " ".repeat(TRACK_LABEL_WIDTH as usize);
    let mut beat = 0;
    for column in 0..timeline_width {
        let tick = tick_at(column);
        if tick >= beat * ticks_per_beat {
            beat_markers.push('|');
            beat += 1;
        } else {
            beat_markers.push(' ');
        }
    }
    lines.push(Line::from(Span::styled(
        beat_markers,
        Style::default().fg(Color::DarkGray),
    )));

    let tracks = state.num_tracks as usize;
    for (name, track) in TRACK_NAMES.iter().zip(&state.track_states).take(tracks) {
        let heard = track.hits > 0 && track.last_hit >= measure_start;
        let mut spans = vec![Span::styled(
            format!("{name:6.6}  "),
            Style::default().fg(if heard { Color::White } else { Color::DarkGray }),
        )];

        // Mark the column holding this measure's latest hit
        let hit_column = heard.then(|| ((track.last_hit - measure_start) as f64 * chars_per_tick) as u16);
        let row: String = (0..timeline_width)
            .map(|column| {
                if Some(column) == hit_column {
                    '▓'
                } else {
                    '░'
                }
            })
            .collect();
        spans.push(Span::styled(row, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
            format!(" v{}", track.last_value),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::from(spans));
    }

    // Playhead row
    let mut playhead_str = " ".repeat(TRACK_LABEL_WIDTH as usize);
    playhead_str.extend((0..timeline_width).map(|i| if i == playhead_char { '▲' } else { ' ' }));
    lines.push(Line::from(Span::styled(
        playhead_str,
        Style::default().fg(Color::Yellow),
    )));

    frame.render_widget(Paragraph::new(lines), area);
}
