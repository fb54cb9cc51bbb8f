//! Overlay rendering (error alert, help, playlist picker, now-playing card)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::model::{AppState, PlaylistPicker};
use super::utils::{centered_rect, format_iso_duration, format_views, Palette};

pub fn render_error_notification(frame: &mut Frame, error_msg: &str) {
    let area = frame.area();

    let popup_width = 52.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize; // account for borders

    // Wrapped message lines plus the two border rows
    let error_line_count = error_msg.chars().count().div_ceil(inner_width) as u16;
    let popup_area = centered_rect(area, popup_width, 2 + error_line_count.max(1));

    frame.render_widget(Clear, popup_area);

    let error_widget = Paragraph::new(error_msg.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error (Esc to dismiss) ")
                .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        );

    frame.render_widget(error_widget, popup_area);
}

pub fn render_help_popup(frame: &mut Frame, palette: &Palette) {
    let area = frame.area();

    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Next / previous tab"),
        ("1-6", "Jump to tab"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Play / open playlist"),
        ("V", "Play as video"),
        ("Esc", "Close playlist"),
        ("/", "Search"),
        ("", ""),
        ("", "── Playback ──"),
        ("Space", "Play / Pause"),
        ("N / P", "Next / previous track"),
        ("← / →", "Seek"),
        ("R", "Toggle repeat"),
        ("+ / -", "Volume up / down"),
        ("M / C", "Resize / hide now playing"),
        ("", ""),
        ("", "── Library ──"),
        ("L", "Like / Unlike"),
        ("A", "Add to playlist"),
        ("X", "Clear history"),
        ("Shift+T", "Reload trending"),
        ("", ""),
        ("", "── General ──"),
        ("t / g", "Cycle theme / language"),
        ("I / O", "Sign in / out"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_area = centered_rect(area, 62, keybindings.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(palette.text)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.highlight))
            .title(" Help (H or Esc to close) ")
            .title_style(Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(palette.background)),
    );

    frame.render_widget(help_text, popup_area);
}

pub fn render_playlist_picker(frame: &mut Frame, state: &AppState, picker: &PlaylistPicker, palette: &Palette) {
    let area = frame.area();
    let playlists = &state.library.playlists;
    let title = format!(" Add \"{}\" to ", picker.item.title);

    if picker.naming {
        let popup_area = centered_rect(area, 50, 5);
        frame.render_widget(Clear, popup_area);
        let input = Paragraph::new(vec![
            Line::from(format!("{}▏", picker.new_name)),
            Line::from(Span::styled(
                "Enter to create, Esc to cancel",
                Style::default().fg(palette.muted),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.highlight))
                .title(" New playlist name ")
                .style(Style::default().bg(palette.background)),
        );
        frame.render_widget(input, popup_area);
        return;
    }

    let popup_area = centered_rect(area, 50, playlists.len() as u16 + 4);
    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            let present = if playlist.contains(&picker.item.id) { " ✓" } else { "" };
            let style = if i == picker.selected {
                Style::default()
                    .fg(palette.background)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            ListItem::new(format!("{}{}", playlist.name, present)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.highlight))
            .title(title)
            .title_bottom(Line::from(" ↑↓ Enter · N new · Esc ").right_aligned())
            .style(Style::default().bg(palette.background)),
    );

    let mut list_state = ListState::default();
    list_state.select(Some(picker.selected));

    frame.render_stateful_widget(list, popup_area, &mut list_state);
}

pub fn render_now_playing_card(frame: &mut Frame, card_area: Rect, state: &AppState, palette: &Palette) {
    let Some(item) = state.playback.current.as_ref() else {
        return;
    };
    frame.render_widget(Clear, card_area);

    let mut details = Vec::new();
    if let Some(duration) = item.duration.as_deref().and_then(format_iso_duration) {
        details.push(duration);
    }
    if let Some(views) = item.view_count.as_deref().and_then(format_views) {
        details.push(views);
    }
    if let Some(published) = item.published_at.as_deref() {
        details.push(published.chars().take(10).collect());
    }

    let liked = state.library.is_liked(&item.id);
    let lines = vec![
        Line::from(Span::styled(
            item.title.clone(),
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(item.channel_title.clone(), Style::default().fg(palette.highlight))),
        Line::from(Span::styled(details.join(" · "), Style::default().fg(palette.muted))),
        Line::from(Span::styled(
            if liked { "♥ Liked" } else { "♡ Not liked" },
            Style::default().fg(palette.accent),
        )),
    ];

    let card = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .title(if state.playback.video_mode { " Now Playing · Video " } else { " Now Playing " })
            .title_bottom(Line::from(" m resize · c hide ").right_aligned())
            .style(Style::default().bg(palette.background)),
    );
    frame.render_widget(card, card_area);
}
