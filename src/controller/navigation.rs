//! Catalog queries, playlists, preferences and startup loading

use crate::model::{Action, Language, MediaItem, Playlist, Preference};
use super::AppController;

/// Query used for the per-language suggestions on the home tab.
const SUGGESTION_QUERY: &str = "songs";

impl AppController {
    /// Load the local library and preferences into state.
    pub fn load_from_storage(&self) {
        let snapshot = self.local.snapshot();
        tracing::info!(
            history = snapshot.history.len(),
            liked = snapshot.liked_songs.len(),
            playlists = snapshot.playlists.len(),
            "Loaded local library"
        );
        self.model.dispatch(Action::LoadStorage(snapshot));
        self.model.dispatch(Action::SetVolume(self.config.player.volume));
    }

    pub async fn search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let language = self.model.read(|state| state.preferences.language);
        self.model.dispatch(Action::SelectTab(crate::model::ActiveTab::Search));
        self.model.dispatch(Action::SetLoading(true));

        let results = match self
            .catalog
            .search(query, self.config.catalog.search_limit, language)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(query, error = %e, "Search failed");
                self.model.dispatch(Action::ShowNotice("Search failed".to_string()));
                Vec::new()
            }
        };
        tracing::info!(query, count = results.len(), "Search finished");
        self.model.dispatch(Action::SetSearchResults {
            query: query.to_string(),
            results,
        });
    }

    pub async fn load_trending(&self) {
        self.model.dispatch(Action::SetLoading(true));
        let catalog = &self.config.catalog;
        let items = match self.catalog.trending(&catalog.region, catalog.trending_limit).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Loading trending failed");
                Vec::new()
            }
        };
        self.model.dispatch(Action::SetTrending(items));
    }

    /// Suggestions for the selected language; cleared when no language is chosen.
    pub async fn refresh_language_suggestions(&self) {
        let language = self.model.read(|state| state.preferences.language);
        if language == Language::All {
            self.model.dispatch(Action::SetLanguageSuggestions(Vec::new()));
            return;
        }
        let items = match self
            .catalog
            .search(SUGGESTION_QUERY, self.config.catalog.search_limit, language)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(language = language.as_str(), error = %e, "Loading suggestions failed");
                Vec::new()
            }
        };
        // The language may have changed while the request was in flight.
        if self.model.read(|state| state.preferences.language) == language {
            self.model.dispatch(Action::SetLanguageSuggestions(items));
        }
    }

    /// Change one preference and persist it to the active store.
    pub async fn set_preference(&self, preference: Preference) {
        tracing::info!(?preference, "Setting preference");
        match preference {
            Preference::Theme(theme) => self.model.dispatch(Action::SetTheme(theme)),
            Preference::Language(language) => self.model.dispatch(Action::SetLanguage(language)),
        }
        let preferences = self.model.read(|state| state.preferences);
        self.persist_preferences(preferences).await;

        if matches!(preference, Preference::Language(_)) {
            self.refresh_language_suggestions().await;
        }
    }

    /// Create a playlist, optionally seeded with one track. Returns its id.
    pub async fn create_playlist(&self, name: &str, first_track: Option<MediaItem>) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        let playlist = Playlist::new(name, first_track);
        let id = playlist.id.clone();
        let mut playlists = self.model.read(|state| state.library.playlists.clone());
        playlists.push(playlist);

        if !self.persist_playlists(&playlists).await {
            self.model.dispatch(Action::ShowNotice("Could not save playlist".to_string()));
            return None;
        }
        tracing::info!(id = %id, name = name.trim(), "Created playlist");
        self.model.dispatch(Action::SetPlaylists(playlists));
        self.model.dispatch(Action::ShowNotice(format!("Created playlist \"{}\"", name.trim())));
        Some(id)
    }

    /// Append `item` to a playlist. False when the playlist is unknown,
    /// already holds the item, or could not be saved.
    pub async fn add_to_playlist(&self, playlist_id: &str, item: MediaItem) -> bool {
        let mut playlists = self.model.read(|state| state.library.playlists.clone());
        let Some(playlist) = playlists.iter_mut().find(|p| p.id == playlist_id) else {
            tracing::warn!(playlist_id, "Unknown playlist");
            return false;
        };
        let name = playlist.name.clone();
        if !playlist.insert(item) {
            self.model.dispatch(Action::ShowNotice(format!("Already in \"{name}\"")));
            return false;
        }

        if !self.persist_playlists(&playlists).await {
            self.model.dispatch(Action::ShowNotice("Could not save playlist".to_string()));
            return false;
        }
        self.model.dispatch(Action::SetPlaylists(playlists));
        self.model.dispatch(Action::ShowNotice(format!("Added to \"{name}\"")));
        true
    }

    pub fn clear_history(&self) {
        tracing::info!("Clearing play history");
        self.model.dispatch(Action::ClearHistory);
        self.local.set_history(&[]);
        self.local.set_recently_played(&[]);
    }

    pub fn dismiss_error(&self) {
        self.model.dispatch(Action::DismissError);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{ActiveTab, Language, Preference, Session, Theme};
    use crate::testing::{item, TestHarness};

    #[tokio::test]
    async fn search_uses_language_and_fills_results() {
        let harness = TestHarness::new();
        harness.catalog.set_results(vec![item("a"), item("b")]);
        harness.controller.model.dispatch(crate::model::Action::SetLanguage(Language::Te));

        harness.controller.search("  melody ").await;

        let state = harness.controller.model.snapshot();
        assert_eq!(state.ui.active_tab, ActiveTab::Search);
        assert_eq!(state.content.last_query, "melody");
        assert_eq!(state.content.search_results.len(), 2);
        assert!(!state.content.is_loading);
        assert_eq!(harness.catalog.searches(), vec![("melody".to_string(), Language::Te)]);
    }

    #[tokio::test]
    async fn blank_search_is_ignored() {
        let harness = TestHarness::new();
        harness.controller.search("   ").await;
        assert!(harness.catalog.searches().is_empty());
    }

    #[tokio::test]
    async fn catalog_failure_degrades_to_empty_results() {
        let harness = TestHarness::new();
        harness.catalog.fail(true);
        harness.controller.search("x").await;
        harness.controller.load_trending().await;
        let state = harness.controller.model.snapshot();
        assert!(state.content.search_results.is_empty());
        assert!(state.content.trending.is_empty());
        assert!(!state.content.is_loading);
    }

    #[tokio::test]
    async fn language_preference_refreshes_suggestions() {
        let harness = TestHarness::new();
        harness.catalog.set_results(vec![item("s1")]);

        harness.controller.set_preference(Preference::Language(Language::Hi)).await;
        assert_eq!(harness.local.language(), Language::Hi);
        assert_eq!(harness.controller.model.read(|s| s.content.language_suggestions.len()), 1);
        assert_eq!(harness.catalog.searches(), vec![("songs".to_string(), Language::Hi)]);

        harness.controller.set_preference(Preference::Language(Language::All)).await;
        assert!(harness.controller.model.read(|s| s.content.language_suggestions.is_empty()));
    }

    #[tokio::test]
    async fn signed_in_preferences_go_to_the_remote_store() {
        let harness = TestHarness::new();
        harness.controller.model.dispatch(crate::model::Action::SetSession(Some(Session {
            uid: "u1".into(),
            id_token: "t".into(),
            refresh_token: None,
            expires_at: None,
        })));
        harness.controller.set_preference(Preference::Theme(Theme::Purple)).await;
        assert_eq!(harness.remote.profile("u1").preferences.map(|p| p.theme), Some(Theme::Purple));
        assert_eq!(harness.local.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn playlists_reject_blank_names_and_duplicates() {
        let harness = TestHarness::new();
        let controller = &harness.controller;
        assert!(controller.create_playlist("  ", None).await.is_none());

        let id = controller.create_playlist("Drive", Some(item("a"))).await.unwrap();
        assert!(!controller.add_to_playlist(&id, item("a")).await);
        assert!(controller.add_to_playlist(&id, item("b")).await);
        assert!(!controller.add_to_playlist("missing", item("c")).await);

        let stored = harness.local.playlists();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Drive");
        assert_eq!(stored[0].tracks, vec![item("a"), item("b")]);
    }

    #[tokio::test]
    async fn clear_history_also_clears_the_local_copy() {
        let harness = TestHarness::new();
        harness.controller.play_track(item("a"), false);
        harness.controller.clear_history();
        assert!(harness.local.history().is_empty());
        assert!(harness.local.recently_played().is_empty());
        assert!(harness.controller.model.read(|s| s.library.history.is_empty()));
    }

    #[tokio::test]
    async fn storage_load_restores_library_and_preferences() {
        let harness = TestHarness::new();
        harness.local.set_liked_songs(&[item("a")]);
        harness.local.set_theme(Theme::Neon);
        harness.controller.load_from_storage();
        let state = harness.controller.model.snapshot();
        assert!(state.library.is_liked("a"));
        assert_eq!(state.preferences.theme, Theme::Neon);
        assert_eq!(state.playback.volume, harness.controller.config.player.volume);
    }
}
