//! Model module - Application state and data types
//!
//! - `types`: domain records (media items, playlists, preferences, session) and UI enums
//! - `playback`: now-playing state
//! - `library`: liked songs, playlists, history and the merge helpers
//! - `content`: catalog result lists
//! - `app_model`: the single state value, its actions and the observable store

mod types;
mod playback;
mod library;
mod content;
mod app_model;

pub use types::{
    ActiveTab, Language, MediaItem, PlayedItem, Playlist, PlaylistPicker, Preference,
    Preferences, Session, Theme,
};

pub use library::{merge_liked, merge_playlists, toggled, RECENTLY_PLAYED_LIMIT};

pub use app_model::{Action, AppModel, AppState, LibrarySnapshot};
