//! Starting tracks, likes and now-playing chrome

use crate::model::{toggled, Action, MediaItem, PlayedItem};
use super::AppController;

impl AppController {
    /// Make `item` the current track. History and recently played are
    /// persisted locally; the playback surface picks the change up from state.
    pub fn play_track(&self, item: MediaItem, as_video: bool) {
        let language = self.model.read(|state| state.preferences.language);
        tracing::info!(id = %item.id, title = %item.title, as_video, "Starting track");

        let played = PlayedItem::now(item, language);
        self.model.dispatch(Action::TrackStarted { played, as_video });

        let (history, recent) = self.model.read(|state| {
            (state.library.history.clone(), state.library.recently_played.clone())
        });
        self.local.set_history(&history);
        self.local.set_recently_played(&recent);
    }

    /// Flip whether `item` is liked.
    pub async fn toggle_like(&self, item: &MediaItem) {
        let liked = self.model.read(|state| toggled(&state.library.liked_songs, item));
        let now_liked = liked.iter().any(|t| t.id == item.id);
        tracing::debug!(id = %item.id, now_liked, "Toggling like");

        match self.persist_liked(liked).await {
            Some(updated) => {
                self.model.dispatch(Action::SetLikedSongs(updated));
                let notice = if now_liked { "Added to Liked" } else { "Removed from Liked" };
                self.model.dispatch(Action::ShowNotice(notice.to_string()));
            }
            None => {
                self.model.dispatch(Action::ShowNotice("Could not sync liked songs".to_string()));
            }
        }
    }

    pub fn set_card_minimized(&self, minimized: bool) {
        self.model.dispatch(Action::SetCardMinimized(minimized));
    }

    pub fn set_user_minimized(&self, minimized: bool) {
        self.model.dispatch(Action::SetUserMinimized(minimized));
    }
}
