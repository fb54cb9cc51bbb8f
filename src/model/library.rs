//! Library state: liked songs, playlists and play history

use std::collections::HashSet;

use super::types::{MediaItem, PlayedItem, Playlist};

pub const RECENTLY_PLAYED_LIMIT: usize = 10;

#[derive(Clone, Debug, Default)]
pub struct Library {
    pub liked_songs: Vec<MediaItem>,
    pub playlists: Vec<Playlist>,
    /// Oldest first. Only cleared explicitly.
    pub history: Vec<PlayedItem>,
    /// Most recent first, unique by id, at most `RECENTLY_PLAYED_LIMIT`.
    pub recently_played: Vec<PlayedItem>,
}

impl Library {
    pub fn is_liked(&self, id: &str) -> bool {
        self.liked_songs.iter().any(|t| t.id == id)
    }

    pub fn record_play(&mut self, played: PlayedItem) {
        self.history.push(played.clone());
        self.recently_played = push_recent(&self.recently_played, played);
    }

    pub fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }
}

/// Put `played` at the front, dropping older entries for the same id.
pub fn push_recent(recent: &[PlayedItem], played: PlayedItem) -> Vec<PlayedItem> {
    let mut updated = Vec::with_capacity(RECENTLY_PLAYED_LIMIT);
    let id = played.item.id.clone();
    updated.push(played);
    updated.extend(
        recent
            .iter()
            .filter(|p| p.item.id != id)
            .take(RECENTLY_PLAYED_LIMIT - 1)
            .cloned(),
    );
    updated
}

/// Liked list after flipping membership of `item`.
pub fn toggled(liked: &[MediaItem], item: &MediaItem) -> Vec<MediaItem> {
    let mut updated = liked.to_vec();
    match updated.iter().position(|t| t.id == item.id) {
        Some(index) => {
            updated.remove(index);
        }
        None => updated.push(item.clone()),
    }
    updated
}

/// Union of two liked lists keyed by id. Entries from `winner` take
/// precedence and keep their order; new ids from `other` are appended.
pub fn merge_liked(winner: &[MediaItem], other: &[MediaItem]) -> Vec<MediaItem> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(winner.len() + other.len());
    for item in winner.iter().chain(other) {
        if seen.insert(item.id.as_str()) {
            merged.push(item.clone());
        }
    }
    merged
}

/// Union of two playlist sets keyed by playlist id, `winner` first.
pub fn merge_playlists(winner: &[Playlist], other: &[Playlist]) -> Vec<Playlist> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(winner.len() + other.len());
    for playlist in winner.iter().chain(other) {
        if seen.insert(playlist.id.as_str()) {
            merged.push(playlist.clone());
        }
    }
    merged
}
