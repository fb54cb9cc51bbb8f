//! Core type definitions for the application

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A playable record from the video catalog.
///
/// Two items are the same item when their catalog ids match; the other
/// fields are display metadata and may be blank.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
}

impl PartialEq for MediaItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaItem {}

impl MediaItem {
    /// URL an external player can resolve.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// A media item stamped with the moment playback started.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedItem {
    #[serde(flatten)]
    pub item: MediaItem,
    pub played_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PlayedItem {
    pub fn now(item: MediaItem, language: Language) -> Self {
        Self {
            item,
            played_at: Utc::now(),
            language: language.code().map(str::to_string),
        }
    }
}

/// A named, ordered list of tracks. A track appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub tracks: Vec<MediaItem>,
}

impl Playlist {
    pub fn new(name: &str, first_track: Option<MediaItem>) -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            name: name.trim().to_string(),
            tracks: first_track.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == id)
    }

    /// Append `item` unless a track with the same id is already present.
    pub fn insert(&mut self, item: MediaItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.tracks.push(item);
        true
    }
}

/// Color scheme selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Neon,
    Purple,
    Blue,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Dark, Theme::Neon, Theme::Purple, Theme::Blue];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Neon => "neon",
            Theme::Purple => "purple",
            Theme::Blue => "blue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    pub fn next(self) -> Self {
        match self {
            Theme::Dark => Theme::Neon,
            Theme::Neon => Theme::Purple,
            Theme::Purple => Theme::Blue,
            Theme::Blue => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language filter applied to searches. `All` disables filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    All,
    En,
    Hi,
    Te,
    Ta,
    Pa,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::All,
        Language::En,
        Language::Hi,
        Language::Te,
        Language::Ta,
        Language::Pa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::All => "all",
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
            Language::Ta => "ta",
            Language::Pa => "pa",
        }
    }

    /// Relevance-language hint for the catalog, `None` for no filter.
    pub fn code(self) -> Option<&'static str> {
        match self {
            Language::All => None,
            other => Some(other.as_str()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::All => "All languages",
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Te => "Telugu",
            Language::Ta => "Tamil",
            Language::Pa => "Punjabi",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == value)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
}

/// A single preference change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preference {
    Theme(Theme),
    Language(Language),
}

/// An authenticated identity. Absent means local-only mode.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Which tab of the UI is currently shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveTab {
    #[default]
    Home,
    Search,
    Trending,
    History,
    Liked,
    Playlists,
}

impl ActiveTab {
    pub const ALL: [ActiveTab; 6] = [
        ActiveTab::Home,
        ActiveTab::Search,
        ActiveTab::Trending,
        ActiveTab::History,
        ActiveTab::Liked,
        ActiveTab::Playlists,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            ActiveTab::Home => "Home",
            ActiveTab::Search => "Search",
            ActiveTab::Trending => "Trending",
            ActiveTab::History => "History",
            ActiveTab::Liked => "Liked",
            ActiveTab::Playlists => "Playlists",
        }
    }
}

/// State of the "add to playlist" picker
#[derive(Clone, Debug)]
pub struct PlaylistPicker {
    pub item: MediaItem,
    pub selected: usize,
    pub new_name: String,
    pub naming: bool,
}

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub active_tab: ActiveTab,
    pub search_focused: bool,
    pub search_query: String,
    pub selection: [usize; 6],
    pub open_playlist: Option<String>,
    pub error_message: Option<String>,
    pub notice: Option<String>,
    pub notice_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    pub playlist_picker: Option<PlaylistPicker>,
}

impl UiState {
    pub fn selected(&self) -> usize {
        self.selection[self.active_tab.index()]
    }

    pub fn selected_mut(&mut self) -> &mut usize {
        &mut self.selection[self.active_tab.index()]
    }
}
