//! Main content area rendering (track lists per tab, playlist index)

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, ListItem, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{ActiveTab, AppState, Language, MediaItem};
use super::utils::{
    calculate_num_width, format_iso_duration, render_scrollable_list, truncate_string, Palette,
};

pub fn render_main_content(frame: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let focused = !state.ui.search_focused;
    let title = content_title(state);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(palette.border(focused));

    if state.showing_playlist_index() {
        render_playlist_index(frame, area, state, block, palette, focused);
        return;
    }

    let tracks = state.tab_tracks();
    if tracks.is_empty() {
        let message = if state.content.is_loading {
            "Loading..."
        } else {
            empty_message(state)
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let items = track_items(state, &tracks, content_width, palette, focused);
    // +1 for header
    render_scrollable_list(frame, area, items, state.ui.selected() + 1, block);
}

fn content_title(state: &AppState) -> String {
    match state.ui.active_tab {
        ActiveTab::Home => match state.preferences.language {
            Language::All => " Recently Played ".to_string(),
            language => format!(" Recently Played · {} picks ", language.label()),
        },
        ActiveTab::Search if !state.content.last_query.is_empty() => {
            format!(" Results for \"{}\" ", state.content.last_query)
        }
        ActiveTab::Search => " Search ".to_string(),
        ActiveTab::Trending => " Trending Music ".to_string(),
        ActiveTab::History => " History (x to clear) ".to_string(),
        ActiveTab::Liked => format!(" Liked Songs ({}) ", state.library.liked_songs.len()),
        ActiveTab::Playlists => match state
            .ui
            .open_playlist
            .as_deref()
            .and_then(|id| state.library.playlist(id))
        {
            Some(playlist) => format!(" {} (Esc to go back) ", playlist.name),
            None => " Playlists ".to_string(),
        },
    }
}

fn empty_message(state: &AppState) -> &'static str {
    match state.ui.active_tab {
        ActiveTab::Home => "Nothing played yet\n\nPress / to search, or 3 for what's trending",
        ActiveTab::Search if state.content.last_query.is_empty() => {
            "Press / and type a query, then Enter"
        }
        ActiveTab::Search => "No results",
        ActiveTab::Trending => "No trending music right now (T to retry)",
        ActiveTab::History => "No plays yet",
        ActiveTab::Liked => "No liked songs yet (l likes the selected track)",
        ActiveTab::Playlists => "This playlist is empty",
    }
}

fn track_items(
    state: &AppState,
    tracks: &[&MediaItem],
    content_width: usize,
    palette: &Palette,
    focused: bool,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let liked_width = 2;
    let duration_width = 8;
    let fixed_width = 1 + num_width + 3 + liked_width + 3 + 3 + 3 + duration_width;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let channel_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![ListItem::new(format!(
        " {:<num_width$}   {}   {:<title_width$}   {:<channel_width$}   {}",
        "#", "  ", "Title", "Channel", "Duration",
    ))
    .style(Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD))];

    let selected = state.ui.selected();
    let current_id = state.playback.current_id();
    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = current_id == Some(track.id.as_str());
        let style = palette.row(i == selected, focused, is_playing);

        let liked = if state.library.is_liked(&track.id) { "♥ " } else { "  " };
        let playing_indicator = if is_playing { "▶" } else { " " };
        let duration = track
            .duration
            .as_deref()
            .and_then(format_iso_duration)
            .unwrap_or_default();

        ListItem::new(format!(
            "{}{:<num_width$}   {}   {}   {}   {}",
            playing_indicator,
            i + 1,
            liked,
            truncate_string(&track.title, title_width),
            truncate_string(&track.channel_title, channel_width),
            duration,
        ))
        .style(style)
    }));
    items
}

fn render_playlist_index(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    block: Block,
    palette: &Palette,
    focused: bool,
) {
    let playlists = &state.library.playlists;
    if playlists.is_empty() {
        let empty = Paragraph::new("No playlists yet\n\nPress a on any track to create one")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let selected = state.ui.selected();
    let items: Vec<ListItem> = playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            let count = playlist.tracks.len();
            let noun = if count == 1 { "track" } else { "tracks" };
            ListItem::new(format!("{}  ({} {})", playlist.name, count, noun))
                .style(palette.row(i == selected, focused, false))
        })
        .collect();
    render_scrollable_list(frame, area, items, selected, block);
}
