//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{Action, ActiveTab, AppState, MediaItem, Preference};
use crate::playback::TransportCommand;
use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let state = self.model.snapshot();

        // Error alert blocks all other interactions
        if state.ui.error_message.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.dismiss_error();
            }
            return;
        }

        if state.ui.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?')) {
                self.model.dispatch(Action::ToggleHelp);
            }
            return;
        }

        if state.ui.playlist_picker.is_some() {
            self.handle_picker_key(key, &state);
            return;
        }

        if state.ui.search_focused {
            self.handle_search_key(key, &state);
            return;
        }

        self.handle_global_key(key, &state);
    }

    fn handle_picker_key(&self, key: KeyEvent, state: &AppState) {
        let Some(picker) = state.ui.playlist_picker.as_ref() else {
            return;
        };

        if picker.naming {
            match key.code {
                KeyCode::Enter => {
                    let name = picker.new_name.clone();
                    let item = picker.item.clone();
                    self.model.dispatch(Action::ClosePlaylistPicker);
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.create_playlist(&name, Some(item)).await;
                    });
                }
                KeyCode::Esc => self.model.dispatch(Action::ClosePlaylistPicker),
                KeyCode::Backspace => self.model.dispatch(Action::PickerBackspace),
                KeyCode::Char(c) => self.model.dispatch(Action::PickerInput(c)),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.model.dispatch(Action::PickerMove { down: false }),
            KeyCode::Down => self.model.dispatch(Action::PickerMove { down: true }),
            KeyCode::Char('n') | KeyCode::Char('N') => self.model.dispatch(Action::PickerStartNaming),
            KeyCode::Enter => {
                let target = state.library.playlists.get(picker.selected).map(|p| p.id.clone());
                let item = picker.item.clone();
                self.model.dispatch(Action::ClosePlaylistPicker);
                if let Some(playlist_id) = target {
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.add_to_playlist(&playlist_id, item).await;
                    });
                }
            }
            KeyCode::Esc | KeyCode::Char('a') => self.model.dispatch(Action::ClosePlaylistPicker),
            _ => {}
        }
    }

    fn handle_search_key(&self, key: KeyEvent, state: &AppState) {
        match key.code {
            KeyCode::Enter => {
                let query = state.ui.search_query.clone();
                self.model.dispatch(Action::FocusSearch(false));
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.search(&query).await;
                });
            }
            KeyCode::Esc | KeyCode::Tab => self.model.dispatch(Action::FocusSearch(false)),
            KeyCode::Backspace => self.model.dispatch(Action::SearchBackspace),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.model.dispatch(Action::ClearSearch);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.model.dispatch(Action::Quit);
            }
            KeyCode::Char(c) => self.model.dispatch(Action::SearchInput(c)),
            _ => {}
        }
    }

    /// Selected row, or the current track when nothing is selected.
    fn target_item(state: &AppState) -> Option<MediaItem> {
        state.selected_item().or_else(|| state.playback.current.clone())
    }

    fn handle_global_key(&self, key: KeyEvent, state: &AppState) {
        let seek_step = f64::from(self.config.player.seek_step_secs);

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.model.dispatch(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.model.dispatch(Action::Quit);
            }
            KeyCode::Tab => {
                self.model.dispatch(Action::NextTab);
                self.on_tab_shown();
            }
            KeyCode::BackTab => {
                self.model.dispatch(Action::PrevTab);
                self.on_tab_shown();
            }
            KeyCode::Char(c @ '1'..='6') => {
                let index = (c as usize) - ('1' as usize);
                self.model.dispatch(Action::SelectTab(ActiveTab::ALL[index]));
                self.on_tab_shown();
            }
            KeyCode::Char('/') => self.model.dispatch(Action::FocusSearch(true)),
            KeyCode::Up => self.model.dispatch(Action::MoveUp),
            KeyCode::Down => self.model.dispatch(Action::MoveDown),
            KeyCode::Enter | KeyCode::Char('v') | KeyCode::Char('V') => {
                if let Some(playlist_id) = state.selected_playlist_id() {
                    self.model.dispatch(Action::OpenPlaylist(Some(playlist_id)));
                } else if let Some(item) = state.selected_item() {
                    let as_video = key.code != KeyCode::Enter;
                    self.play_track(item, as_video);
                }
            }
            KeyCode::Esc | KeyCode::Backspace => {
                if state.ui.open_playlist.is_some() {
                    self.model.dispatch(Action::OpenPlaylist(None));
                }
            }
            KeyCode::Char(' ') => self.send_transport(TransportCommand::Toggle),
            KeyCode::Char('n') | KeyCode::Char('N') => self.send_transport(TransportCommand::Next),
            KeyCode::Char('p') | KeyCode::Char('P') => self.send_transport(TransportCommand::Previous),
            KeyCode::Char('r') | KeyCode::Char('R') => self.send_transport(TransportCommand::ToggleRepeat),
            KeyCode::Char('+') | KeyCode::Char('=') => self.send_transport(TransportCommand::VolumeUp),
            KeyCode::Char('-') => self.send_transport(TransportCommand::VolumeDown),
            KeyCode::Left => self.send_transport(TransportCommand::SeekRelative(-seek_step)),
            KeyCode::Right => self.send_transport(TransportCommand::SeekRelative(seek_step)),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                if let Some(item) = Self::target_item(state) {
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.toggle_like(&item).await;
                    });
                }
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                if let Some(item) = Self::target_item(state) {
                    self.model.dispatch(Action::OpenPlaylistPicker(item));
                }
            }
            KeyCode::Char('t') => {
                let theme = state.preferences.theme.next();
                self.spawn_preference(Preference::Theme(theme));
            }
            KeyCode::Char('g') | KeyCode::Char('G') => {
                let language = state.preferences.language.next();
                self.spawn_preference(Preference::Language(language));
            }
            KeyCode::Char('T') => {
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.load_trending().await;
                });
            }
            KeyCode::Char('i') | KeyCode::Char('I') => {
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.sign_in().await;
                });
            }
            KeyCode::Char('o') | KeyCode::Char('O') => {
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.sign_out().await;
                });
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                self.set_card_minimized(!state.playback.card_minimized);
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.set_user_minimized(!state.playback.user_minimized);
            }
            KeyCode::Char('x') | KeyCode::Char('X') => {
                if state.ui.active_tab == ActiveTab::History {
                    self.clear_history();
                }
            }
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                self.model.dispatch(Action::ToggleHelp);
            }
            _ => {}
        }
    }

    fn spawn_preference(&self, preference: Preference) {
        let controller = self.clone();
        tokio::spawn(async move {
            controller.set_preference(preference).await;
        });
    }

    /// Fetch the trending chart the first time its tab is shown.
    fn on_tab_shown(&self) {
        let needs_trending = self.model.read(|state| {
            state.ui.active_tab == ActiveTab::Trending
                && state.content.trending.is_empty()
                && !state.content.is_loading
        });
        if needs_trending {
            let controller = self.clone();
            tokio::spawn(async move {
                controller.load_trending().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use crate::model::{Action, ActiveTab};
    use crate::playback::TransportCommand;
    use crate::testing::{item, TestHarness};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn transport_keys_reach_the_surface() {
        let mut harness = TestHarness::new();
        for code in [KeyCode::Char(' '), KeyCode::Char('n'), KeyCode::Char('p'), KeyCode::Right] {
            harness.controller.handle_key_event(press(code)).await;
        }
        let mut received = Vec::new();
        while let Ok(command) = harness.transport_rx.try_recv() {
            received.push(command);
        }
        assert_eq!(
            received,
            vec![
                TransportCommand::Toggle,
                TransportCommand::Next,
                TransportCommand::Previous,
                TransportCommand::SeekRelative(10.0),
            ]
        );
    }

    #[tokio::test]
    async fn typing_goes_to_the_search_box_while_focused() {
        let harness = TestHarness::new();
        let controller = &harness.controller;
        controller.handle_key_event(press(KeyCode::Char('/'))).await;
        for c in "qn".chars() {
            controller.handle_key_event(press(KeyCode::Char(c))).await;
        }
        let state = controller.model.snapshot();
        assert_eq!(state.ui.search_query, "qn");
        assert!(!state.should_quit);
        assert_eq!(state.ui.active_tab, ActiveTab::Search);
    }

    #[tokio::test]
    async fn enter_plays_selected_row() {
        let harness = TestHarness::new();
        let controller = &harness.controller;
        controller.model.dispatch(Action::SetSearchResults {
            query: "q".into(),
            results: vec![item("a"), item("b")],
        });
        controller.model.dispatch(Action::SelectTab(ActiveTab::Search));
        controller.handle_key_event(press(KeyCode::Down)).await;
        controller.handle_key_event(press(KeyCode::Char('v'))).await;
        let playback = controller.model.read(|s| s.playback.clone());
        assert_eq!(playback.current_id(), Some("b"));
        assert!(playback.video_mode);
    }

    #[tokio::test]
    async fn error_alert_swallows_keys_until_dismissed() {
        let harness = TestHarness::new();
        let controller = &harness.controller;
        controller.model.dispatch(Action::ShowError("boom".into()));
        controller.handle_key_event(press(KeyCode::Char('q'))).await;
        assert!(!controller.model.read(|s| s.should_quit));
        controller.handle_key_event(press(KeyCode::Esc)).await;
        controller.handle_key_event(press(KeyCode::Char('q'))).await;
        assert!(controller.model.read(|s| s.should_quit));
    }
}
