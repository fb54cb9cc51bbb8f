//! Identity listener and the library hand-over between identities

use tokio::task::JoinHandle;

use crate::model::{merge_liked, merge_playlists, Action, Session};
use crate::store::{ProfilePatch, UserProfile};
use super::AppController;

/// Handle for the identity subscription. Dropping it stops the listener.
pub struct IdentityListener {
    task: JoinHandle<()>,
}

impl IdentityListener {
    pub fn unregister(self) {
        tracing::debug!("Identity listener unregistered");
    }
}

impl Drop for IdentityListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl AppController {
    /// Follow identity changes for as long as the returned handle lives.
    pub fn register_identity_listener(&self) -> IdentityListener {
        let mut rx = self.identity.subscribe();
        let controller = self.clone();
        tracing::info!("Starting identity listener");

        let task = tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            if initial.is_some() {
                controller.on_identity_changed(initial).await;
            }
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                controller.on_identity_changed(session).await;
            }
            tracing::debug!("Identity listener shutting down");
        });
        IdentityListener { task }
    }

    pub async fn sign_in(&self) {
        tracing::info!("Sign-in requested");
        if let Err(e) = self.identity.sign_in().await {
            tracing::error!(error = %e, "Sign-in failed");
            self.model.dispatch(Action::ShowError(Self::format_error(&e)));
        }
    }

    pub async fn sign_out(&self) {
        tracing::info!("Sign-out requested");
        if let Err(e) = self.identity.sign_out().await {
            tracing::error!(error = %e, "Sign-out failed");
            self.model.dispatch(Action::ShowError(Self::format_error(&e)));
        }
    }

    /// Move the library over to the new identity (or back to the device).
    pub async fn on_identity_changed(&self, session: Option<Session>) {
        let previous = self.session();
        let language_before = self.model.read(|state| state.preferences.language);

        match session {
            None => {
                tracing::info!(had_session = previous.is_some(), "Signed out, reloading local library");
                self.model.dispatch(Action::SetSession(None));
                self.model.dispatch(Action::SetLikedSongs(Vec::new()));
                self.model.dispatch(Action::SetLikedSongs(self.local.liked_songs()));
                self.model.dispatch(Action::SetPlaylists(self.local.playlists()));
                self.model.dispatch(Action::SetPreferences(self.local.preferences()));
            }
            Some(session) => {
                if previous.as_ref().is_some_and(|p| p.uid == session.uid) {
                    // Token refresh for the same account
                    self.model.dispatch(Action::SetSession(Some(session)));
                    return;
                }
                let last = self.last_identity();
                tracing::info!(uid = %session.uid, last_identity = ?last, "Signed in");
                self.model.dispatch(Action::SetSession(Some(session.clone())));

                if last.as_deref() == Some(session.uid.as_str()) {
                    self.reload_from_remote(&session).await;
                } else {
                    self.merge_into_remote(&session, last.as_deref(), previous.as_ref()).await;
                }
                self.remember_identity(&session.uid);
            }
        }

        if self.model.read(|state| state.preferences.language) != language_before {
            self.refresh_language_suggestions().await;
        }
    }

    /// Same account as last time: the remote copy replaces what is shown.
    async fn reload_from_remote(&self, session: &Session) {
        let profile = match self.remote.get_profile(session).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(uid = %session.uid, error = %e, "Failed to load cloud library");
                self.model.dispatch(Action::ShowNotice("Could not load your cloud library".to_string()));
                return;
            }
        };
        let preferences = profile
            .preferences
            .unwrap_or_else(|| self.model.read(|state| state.preferences));
        self.model.dispatch(Action::SetLikedSongs(profile.liked_songs));
        self.model.dispatch(Action::SetPlaylists(profile.playlists));
        self.model.dispatch(Action::SetPreferences(preferences));
    }

    /// New account for this device. The remote profile is unioned with the
    /// library being left behind, remote entries winning, and written back.
    /// That library is the previous account's cloud profile when there was
    /// one, otherwise the local cache on screen.
    async fn merge_into_remote(&self, session: &Session, last: Option<&str>, shown: Option<&Session>) {
        let remote = match self.remote.get_profile(session).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(uid = %session.uid, error = %e, "Failed to load cloud library");
                self.model.dispatch(Action::ShowNotice("Could not load your cloud library".to_string()));
                return;
            }
        };

        let other = match last {
            Some(prev) => self.previous_profile(prev, session, shown).await,
            None => self.shown_library(),
        };

        let merged = UserProfile {
            liked_songs: merge_liked(&remote.liked_songs, &other.liked_songs),
            playlists: merge_playlists(&remote.playlists, &other.playlists),
            preferences: remote
                .preferences
                .or(other.preferences)
                .or_else(|| Some(self.model.read(|state| state.preferences))),
        };
        tracing::info!(
            uid = %session.uid,
            previous = ?last,
            liked = merged.liked_songs.len(),
            playlists = merged.playlists.len(),
            "Merged library into cloud profile"
        );

        if let Err(e) = self.remote.set_profile(session, ProfilePatch::full(&merged)).await {
            tracing::error!(uid = %session.uid, error = %e, "Failed to save merged library");
        }

        self.model.dispatch(Action::SetLikedSongs(merged.liked_songs));
        self.model.dispatch(Action::SetPlaylists(merged.playlists));
        if let Some(preferences) = merged.preferences {
            self.model.dispatch(Action::SetPreferences(preferences));
        }
    }

    /// The previous account's cloud profile, read with the new credentials.
    /// If that read fails, the shown library is used when it still belongs
    /// to that account.
    async fn previous_profile(&self, prev_uid: &str, session: &Session, shown: Option<&Session>) -> UserProfile {
        let prev_session = Session {
            uid: prev_uid.to_string(),
            ..session.clone()
        };
        match self.remote.get_profile(&prev_session).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(uid = %prev_uid, error = %e, "Failed to load previous cloud library");
                if shown.is_some_and(|s| s.uid == prev_uid) {
                    self.shown_library()
                } else {
                    UserProfile::default()
                }
            }
        }
    }

    fn shown_library(&self) -> UserProfile {
        self.model.read(|state| UserProfile {
            liked_songs: state.library.liked_songs.clone(),
            playlists: state.library.playlists.clone(),
            preferences: None,
        })
    }
}
