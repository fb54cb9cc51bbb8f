//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared helpers (theme palettes, formatting, scrollable lists)
//! - `layout`: Top bar and tab strip
//! - `content`: Track lists for the active tab
//! - `progress`: Now-playing bar
//! - `overlays`: Modal overlays (error, help, playlist picker) and the now-playing card

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::model::AppState;
use utils::Palette;

/// Size of the shrunk now-playing card.
const CARD_WIDTH: u16 = 44;
const CARD_HEIGHT: u16 = 7;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, state: &AppState, device_name: &str) {
        let palette = Palette::for_theme(state.preferences.theme);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + account
                Constraint::Length(3), // Tabs
                Constraint::Min(0),    // Main content
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], state, device_name, &palette);
        layout::render_tabs(frame, chunks[1], state, &palette);
        content::render_main_content(frame, chunks[2], state, &palette);
        progress::render_progress_bar(frame, chunks[3], state, &palette);

        if state.playback.card_visible() {
            let card_area = if state.playback.card_minimized {
                corner_rect(chunks[2], CARD_WIDTH, CARD_HEIGHT)
            } else {
                chunks[2]
            };
            overlays::render_now_playing_card(frame, card_area, state, &palette);
        }

        if let Some(picker) = state.ui.playlist_picker.as_ref() {
            overlays::render_playlist_picker(frame, state, picker, &palette);
        }

        if state.ui.show_help_popup {
            overlays::render_help_popup(frame, &palette);
        }

        // Error alert on top of everything else
        if let Some(error_msg) = state.ui.error_message.as_deref() {
            overlays::render_error_notification(frame, error_msg);
        }
    }
}

/// Bottom-right corner of `area`, at most `width` x `height`.
fn corner_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::model::{Action, AppModel, Language, MediaItem, PlayedItem};

    fn screen(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|frame| AppView::render(frame, state, "desk"))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn start(model: &AppModel, title: &str) {
        let item = MediaItem { id: title.into(), title: title.into(), ..Default::default() };
        model.dispatch(Action::TrackStarted {
            played: PlayedItem::now(item, Language::All),
            as_video: false,
        });
    }

    #[test]
    fn idle_screen_shows_tabs_and_device() {
        let model = AppModel::default();
        let text = screen(&model.snapshot());
        assert!(text.contains("1 Home"));
        assert!(text.contains("6 Playlists"));
        assert!(text.contains("desk"));
        assert!(text.contains("No track playing"));
    }

    #[test]
    fn hidden_card_leaves_the_list_visible() {
        let model = AppModel::default();
        start(&model, "Anthem");
        assert!(screen(&model.snapshot()).contains("Now Playing"));

        model.dispatch(Action::SetUserMinimized(true));
        let text = screen(&model.snapshot());
        assert!(!text.contains("Now Playing"));
        assert!(text.contains("Recently Played"));
    }

    #[test]
    fn error_alert_is_drawn() {
        let model = AppModel::default();
        model.dispatch(Action::ShowError("Sign-in was rejected".into()));
        assert!(screen(&model.snapshot()).contains("Sign-in was rejected"));
    }

    #[test]
    fn corner_rect_hugs_the_bottom_right() {
        let area = Rect::new(0, 6, 100, 20);
        assert_eq!(corner_rect(area, 44, 7), Rect::new(56, 19, 44, 7));
        assert_eq!(corner_rect(Rect::new(0, 0, 10, 3), 44, 7), Rect::new(0, 0, 10, 3));
    }
}
