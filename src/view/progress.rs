//! Progress bar rendering

use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::AppState;
use super::utils::{format_seconds, Palette};

pub fn render_progress_bar(frame: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let playback = &state.playback;

    let status_text = match &playback.current {
        None => " No track playing".to_string(),
        Some(item) => {
            let icon = if playback.is_playing { " ▶" } else { "⏸ " };
            let liked = if state.library.is_liked(&item.id) { " ♥" } else { "" };
            format!("{} {} | {}{}", icon, item.title, item.channel_title, liked)
        }
    };

    let repeat_text = if playback.repeat { "Repeat: On" } else { "Repeat: Off" };
    let mode_text = if playback.video_mode { "Video" } else { "Audio" };
    let volume_text = format!("Vol: {}%", playback.volume);
    let controls_info = format!(" {} | {} | {} ", mode_text, repeat_text, volume_text);

    let time_str = format!(
        "{} / {}",
        format_seconds(playback.position_secs),
        format_seconds(playback.duration_secs)
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text))
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(palette.accent))
        .ratio(playback.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}
