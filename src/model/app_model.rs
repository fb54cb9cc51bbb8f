//! Main application model: one state value, changed only by dispatching actions

use std::time::{Duration, Instant};

use tokio::sync::watch;

use super::content::ContentState;
use super::library::Library;
use super::playback::PlaybackState;
use super::types::{
    ActiveTab, Language, MediaItem, PlayedItem, Playlist, PlaylistPicker, Preferences, Session,
    Theme, UiState,
};

const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Everything the local store hands back on startup or sign-out.
#[derive(Clone, Debug, Default)]
pub struct LibrarySnapshot {
    pub history: Vec<PlayedItem>,
    pub recently_played: Vec<PlayedItem>,
    pub liked_songs: Vec<MediaItem>,
    pub playlists: Vec<Playlist>,
    pub preferences: Preferences,
}

/// A named state transition.
#[derive(Clone, Debug)]
pub enum Action {
    LoadStorage(LibrarySnapshot),
    TrackStarted { played: PlayedItem, as_video: bool },
    SetPlaying(bool),
    Progress { position_secs: f64, duration_secs: f64 },
    ResetProgress,
    SetVolume(u8),
    SetRepeat(bool),
    SetLikedSongs(Vec<MediaItem>),
    SetPlaylists(Vec<Playlist>),
    SetPreferences(Preferences),
    SetTheme(Theme),
    SetLanguage(Language),
    SetCardMinimized(bool),
    SetUserMinimized(bool),
    SetSession(Option<Session>),
    ClearHistory,
    SetLoading(bool),
    SetSearchResults { query: String, results: Vec<MediaItem> },
    SetTrending(Vec<MediaItem>),
    SetLanguageSuggestions(Vec<MediaItem>),
    ShowError(String),
    DismissError,
    ShowNotice(String),
    ClearExpiredNotice,
    SelectTab(ActiveTab),
    NextTab,
    PrevTab,
    MoveUp,
    MoveDown,
    FocusSearch(bool),
    SearchInput(char),
    SearchBackspace,
    ClearSearch,
    OpenPlaylist(Option<String>),
    ToggleHelp,
    OpenPlaylistPicker(MediaItem),
    ClosePlaylistPicker,
    PickerMove { down: bool },
    PickerStartNaming,
    PickerInput(char),
    PickerBackspace,
    Quit,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::LoadStorage(_) => "LoadStorage",
            Action::TrackStarted { .. } => "TrackStarted",
            Action::SetPlaying(_) => "SetPlaying",
            Action::Progress { .. } => "Progress",
            Action::ResetProgress => "ResetProgress",
            Action::SetVolume(_) => "SetVolume",
            Action::SetRepeat(_) => "SetRepeat",
            Action::SetLikedSongs(_) => "SetLikedSongs",
            Action::SetPlaylists(_) => "SetPlaylists",
            Action::SetPreferences(_) => "SetPreferences",
            Action::SetTheme(_) => "SetTheme",
            Action::SetLanguage(_) => "SetLanguage",
            Action::SetCardMinimized(_) => "SetCardMinimized",
            Action::SetUserMinimized(_) => "SetUserMinimized",
            Action::SetSession(_) => "SetSession",
            Action::ClearHistory => "ClearHistory",
            Action::SetLoading(_) => "SetLoading",
            Action::SetSearchResults { .. } => "SetSearchResults",
            Action::SetTrending(_) => "SetTrending",
            Action::SetLanguageSuggestions(_) => "SetLanguageSuggestions",
            Action::ShowError(_) => "ShowError",
            Action::DismissError => "DismissError",
            Action::ShowNotice(_) => "ShowNotice",
            Action::ClearExpiredNotice => "ClearExpiredNotice",
            _ => "Ui",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub playback: PlaybackState,
    pub library: Library,
    pub preferences: Preferences,
    pub session: Option<Session>,
    pub content: ContentState,
    pub ui: UiState,
    pub should_quit: bool,
}

impl AppState {
    /// Apply one transition. Pure: no I/O happens here.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::LoadStorage(snapshot) => {
                self.library.history = snapshot.history;
                self.library.recently_played = snapshot.recently_played;
                self.library.liked_songs = snapshot.liked_songs;
                self.library.playlists = snapshot.playlists;
                self.preferences = snapshot.preferences;
            }
            Action::TrackStarted { played, as_video } => {
                self.library.record_play(played.clone());
                let playback = &mut self.playback;
                playback.current = Some(played.item);
                playback.is_playing = true;
                playback.video_mode = as_video;
                playback.position_secs = 0.0;
                playback.duration_secs = 0.0;
                playback.card_minimized = false;
                playback.user_minimized = false;
                playback.load_seq += 1;
            }
            Action::SetPlaying(playing) => self.playback.is_playing = playing,
            Action::Progress { position_secs, duration_secs } => {
                self.playback.position_secs = position_secs.max(0.0);
                self.playback.duration_secs = duration_secs.max(0.0);
            }
            Action::ResetProgress => {
                self.playback.position_secs = 0.0;
                self.playback.duration_secs = 0.0;
            }
            Action::SetVolume(volume) => self.playback.volume = volume.min(100),
            Action::SetRepeat(repeat) => self.playback.repeat = repeat,
            Action::SetLikedSongs(liked) => self.library.liked_songs = liked,
            Action::SetPlaylists(playlists) => {
                self.library.playlists = playlists;
                let dangling = self
                    .ui
                    .open_playlist
                    .as_deref()
                    .is_some_and(|id| self.library.playlist(id).is_none());
                if dangling {
                    self.ui.open_playlist = None;
                }
                self.clamp_selection();
            }
            Action::SetPreferences(preferences) => self.preferences = preferences,
            Action::SetTheme(theme) => self.preferences.theme = theme,
            Action::SetLanguage(language) => self.preferences.language = language,
            Action::SetCardMinimized(minimized) => self.playback.card_minimized = minimized,
            Action::SetUserMinimized(minimized) => self.playback.user_minimized = minimized,
            Action::SetSession(session) => self.session = session,
            Action::ClearHistory => {
                self.library.history.clear();
                self.library.recently_played.clear();
                self.clamp_selection();
            }
            Action::SetLoading(loading) => self.content.is_loading = loading,
            Action::SetSearchResults { query, results } => {
                self.content.search_results = results;
                self.content.last_query = query;
                self.content.is_loading = false;
                self.ui.selection[ActiveTab::Search.index()] = 0;
            }
            Action::SetTrending(items) => {
                self.content.trending = items;
                self.content.is_loading = false;
                self.ui.selection[ActiveTab::Trending.index()] = 0;
            }
            Action::SetLanguageSuggestions(items) => {
                self.content.language_suggestions = items;
                self.clamp_selection();
            }
            Action::ShowError(message) => self.ui.error_message = Some(message),
            Action::DismissError => self.ui.error_message = None,
            Action::ShowNotice(message) => {
                self.ui.notice = Some(message);
                self.ui.notice_timestamp = Some(Instant::now());
            }
            Action::ClearExpiredNotice => {
                if let Some(timestamp) = self.ui.notice_timestamp {
                    if timestamp.elapsed() > NOTICE_TTL {
                        self.ui.notice = None;
                        self.ui.notice_timestamp = None;
                    }
                }
            }
            Action::SelectTab(tab) => {
                self.ui.active_tab = tab;
                self.ui.search_focused = tab == ActiveTab::Search && self.ui.search_focused;
            }
            Action::NextTab => self.ui.active_tab = self.ui.active_tab.next(),
            Action::PrevTab => self.ui.active_tab = self.ui.active_tab.prev(),
            Action::MoveUp => {
                let selected = self.ui.selected_mut();
                *selected = selected.saturating_sub(1);
            }
            Action::MoveDown => {
                let max = self.list_len().saturating_sub(1);
                let selected = self.ui.selected_mut();
                if *selected < max {
                    *selected += 1;
                }
            }
            Action::FocusSearch(focused) => {
                self.ui.search_focused = focused;
                if focused {
                    self.ui.active_tab = ActiveTab::Search;
                }
            }
            Action::SearchInput(c) => self.ui.search_query.push(c),
            Action::SearchBackspace => {
                self.ui.search_query.pop();
            }
            Action::ClearSearch => self.ui.search_query.clear(),
            Action::OpenPlaylist(id) => {
                self.ui.open_playlist = id;
                self.ui.selection[ActiveTab::Playlists.index()] = 0;
            }
            Action::ToggleHelp => self.ui.show_help_popup = !self.ui.show_help_popup,
            Action::OpenPlaylistPicker(item) => {
                self.ui.playlist_picker = Some(PlaylistPicker {
                    item,
                    selected: 0,
                    new_name: String::new(),
                    naming: self.library.playlists.is_empty(),
                });
            }
            Action::ClosePlaylistPicker => self.ui.playlist_picker = None,
            Action::PickerMove { down } => {
                let count = self.library.playlists.len();
                if let Some(picker) = &mut self.ui.playlist_picker {
                    if down {
                        if picker.selected + 1 < count {
                            picker.selected += 1;
                        }
                    } else {
                        picker.selected = picker.selected.saturating_sub(1);
                    }
                }
            }
            Action::PickerStartNaming => {
                if let Some(picker) = &mut self.ui.playlist_picker {
                    picker.naming = true;
                }
            }
            Action::PickerInput(c) => {
                if let Some(picker) = &mut self.ui.playlist_picker {
                    picker.new_name.push(c);
                }
            }
            Action::PickerBackspace => {
                if let Some(picker) = &mut self.ui.playlist_picker {
                    picker.new_name.pop();
                }
            }
            Action::Quit => self.should_quit = true,
        }
    }

    /// Tracks listed in the active tab, in display order.
    pub fn tab_tracks(&self) -> Vec<&MediaItem> {
        match self.ui.active_tab {
            ActiveTab::Home => self
                .library
                .recently_played
                .iter()
                .map(|p| &p.item)
                .chain(self.content.language_suggestions.iter())
                .collect(),
            ActiveTab::Search => self.content.search_results.iter().collect(),
            ActiveTab::Trending => self.content.trending.iter().collect(),
            ActiveTab::History => self.library.history.iter().rev().map(|p| &p.item).collect(),
            ActiveTab::Liked => self.library.liked_songs.iter().collect(),
            ActiveTab::Playlists => self
                .ui
                .open_playlist
                .as_deref()
                .and_then(|id| self.library.playlist(id))
                .map(|p| p.tracks.iter().collect())
                .unwrap_or_default(),
        }
    }

    /// True when the playlists tab shows the list of playlists rather than tracks.
    pub fn showing_playlist_index(&self) -> bool {
        self.ui.active_tab == ActiveTab::Playlists && self.ui.open_playlist.is_none()
    }

    pub fn list_len(&self) -> usize {
        if self.showing_playlist_index() {
            self.library.playlists.len()
        } else {
            self.tab_tracks().len()
        }
    }

    pub fn selected_item(&self) -> Option<MediaItem> {
        if self.showing_playlist_index() {
            return None;
        }
        self.tab_tracks().get(self.ui.selected()).map(|item| (*item).clone())
    }

    pub fn selected_playlist_id(&self) -> Option<String> {
        if !self.showing_playlist_index() {
            return None;
        }
        self.library.playlists.get(self.ui.selected()).map(|p| p.id.clone())
    }

    fn clamp_selection(&mut self) {
        let max = self.list_len().saturating_sub(1);
        let selected = self.ui.selected_mut();
        *selected = (*selected).min(max);
    }
}

/// Observable store holding the single `AppState`.
pub struct AppModel {
    state: watch::Sender<AppState>,
}

impl AppModel {
    pub fn new(initial: AppState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn dispatch(&self, action: Action) {
        tracing::trace!(action = action.name(), "dispatch");
        self.state.send_modify(|state| state.apply(action));
    }

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Read a projection without cloning the whole state.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::library::RECENTLY_PLAYED_LIMIT;

    fn item(id: &str) -> MediaItem {
        MediaItem { id: id.to_string(), ..Default::default() }
    }

    fn start(model: &AppModel, id: &str, as_video: bool) {
        model.dispatch(Action::TrackStarted {
            played: PlayedItem::now(item(id), Language::All),
            as_video,
        });
    }

    #[test]
    fn track_started_sets_playback_and_resets_chrome() {
        let model = AppModel::default();
        model.dispatch(Action::SetUserMinimized(true));
        model.dispatch(Action::SetCardMinimized(true));
        model.dispatch(Action::Progress { position_secs: 42.0, duration_secs: 100.0 });
        start(&model, "a", true);

        let state = model.snapshot();
        assert_eq!(state.playback.current_id(), Some("a"));
        assert!(state.playback.is_playing);
        assert!(state.playback.video_mode);
        assert!(!state.playback.user_minimized);
        assert!(!state.playback.card_minimized);
        assert_eq!(state.playback.position_secs, 0.0);
        assert_eq!(state.library.recently_played[0].item.id, "a");
    }

    #[test]
    fn recently_played_head_is_last_started() {
        let model = AppModel::default();
        for i in 0..15 {
            start(&model, &format!("v{i}"), false);
            let state = model.snapshot();
            assert_eq!(state.library.recently_played[0].item.id, format!("v{i}"));
            assert!(state.library.recently_played.len() <= RECENTLY_PLAYED_LIMIT);
        }
    }

    #[test]
    fn subscribers_see_dispatched_changes() {
        let model = AppModel::default();
        let mut rx = model.subscribe();
        model.dispatch(Action::SetRepeat(true));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().playback.repeat);
    }

    #[test]
    fn selection_stays_inside_the_list() {
        let model = AppModel::default();
        model.dispatch(Action::SetSearchResults {
            query: "q".into(),
            results: vec![item("a"), item("b")],
        });
        model.dispatch(Action::SelectTab(ActiveTab::Search));
        for _ in 0..5 {
            model.dispatch(Action::MoveDown);
        }
        assert_eq!(model.read(|s| s.ui.selected()), 1);
        assert_eq!(model.read(|s| s.selected_item()).map(|i| i.id), Some("b".to_string()));
        for _ in 0..5 {
            model.dispatch(Action::MoveUp);
        }
        assert_eq!(model.read(|s| s.ui.selected()), 0);
    }

    #[test]
    fn history_tab_lists_most_recent_first() {
        let model = AppModel::default();
        start(&model, "old", false);
        start(&model, "new", false);
        model.dispatch(Action::SelectTab(ActiveTab::History));
        let ids: Vec<String> = model.read(|s| s.tab_tracks().iter().map(|i| i.id.clone()).collect());
        assert_eq!(ids, ["new", "old"]);
    }

    #[test]
    fn removed_playlist_closes_its_view() {
        let model = AppModel::default();
        let playlist = Playlist { id: "p".into(), name: "P".into(), tracks: vec![item("a")] };
        model.dispatch(Action::SetPlaylists(vec![playlist]));
        model.dispatch(Action::SelectTab(ActiveTab::Playlists));
        model.dispatch(Action::OpenPlaylist(Some("p".into())));
        assert_eq!(model.read(|s| s.selected_item()).map(|i| i.id), Some("a".to_string()));
        model.dispatch(Action::SetPlaylists(vec![]));
        assert!(model.read(|s| s.ui.open_playlist.is_none()));
    }

    #[test]
    fn clear_history_empties_both_lists() {
        let model = AppModel::default();
        start(&model, "a", false);
        model.dispatch(Action::ClearHistory);
        let state = model.snapshot();
        assert!(state.library.history.is_empty());
        assert!(state.library.recently_played.is_empty());
    }
}
