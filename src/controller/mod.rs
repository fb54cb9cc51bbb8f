//! Controller module - Side-effecting operations on the application state
//!
//! The model's reducer is pure; everything that talks to a store, the
//! catalog or the identity provider lives here. Organized by responsibility:
//!
//! - `input`: Key event handling
//! - `playback`: Starting tracks, likes, now-playing chrome, transport keys
//! - `navigation`: Catalog queries, playlists, preferences, startup load
//! - `session_events`: Identity listener and the sign-in/sign-out merge protocol

mod input;
mod playback;
mod navigation;
mod session_events;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::catalog::CatalogClient;
use crate::config::AppConfig;
use crate::identity::IdentityProvider;
use crate::model::{AppModel, MediaItem, Playlist, Preferences, Session};
use crate::playback::TransportCommand;
use crate::store::{LocalPreferenceStore, ProfilePatch, RemoteProfileStore};

/// External collaborators the controller drives.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogClient>,
    pub local: LocalPreferenceStore,
    pub remote: Arc<dyn RemoteProfileStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) catalog: Arc<dyn CatalogClient>,
    pub(crate) local: LocalPreferenceStore,
    pub(crate) remote: Arc<dyn RemoteProfileStore>,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) config: Arc<AppConfig>,
    transport: mpsc::UnboundedSender<TransportCommand>,
    last_identity: Arc<Mutex<Option<String>>>,
}

impl AppController {
    pub fn new(
        model: Arc<AppModel>,
        services: Services,
        config: Arc<AppConfig>,
        transport: mpsc::UnboundedSender<TransportCommand>,
    ) -> Self {
        let last_identity = services.local.last_identity();
        Self {
            model,
            catalog: services.catalog,
            local: services.local,
            remote: services.remote,
            identity: services.identity,
            config,
            transport,
            last_identity: Arc::new(Mutex::new(last_identity)),
        }
    }

    pub fn model(&self) -> &Arc<AppModel> {
        &self.model
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.model.read(|state| state.session.clone())
    }

    pub(crate) fn last_identity(&self) -> Option<String> {
        self.last_identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn remember_identity(&self, uid: &str) {
        *self
            .last_identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(uid.to_string());
        self.local.set_last_identity(uid);
    }

    /// Forward a transport command to the playback surface.
    pub fn send_transport(&self, command: TransportCommand) {
        if self.transport.send(command).is_err() {
            tracing::warn!(?command, "Playback surface is gone, dropping command");
        }
    }

    /// Write the liked list to the active store. With a session the remote
    /// copy is written and read back; `None` means the remote write failed.
    pub(crate) async fn persist_liked(&self, liked: Vec<MediaItem>) -> Option<Vec<MediaItem>> {
        let Some(session) = self.session() else {
            self.local.set_liked_songs(&liked);
            return Some(liked);
        };
        if let Err(e) = self
            .remote
            .set_profile(&session, ProfilePatch::liked_songs(liked))
            .await
        {
            tracing::error!(uid = %session.uid, error = %e, "Failed to save liked songs");
            return None;
        }
        match self.remote.get_profile(&session).await {
            Ok(profile) => Some(profile.liked_songs),
            Err(e) => {
                tracing::error!(uid = %session.uid, error = %e, "Failed to read back liked songs");
                None
            }
        }
    }

    /// Write playlists to the active store. Returns false if the remote write failed.
    pub(crate) async fn persist_playlists(&self, playlists: &[Playlist]) -> bool {
        let Some(session) = self.session() else {
            self.local.set_playlists(playlists);
            return true;
        };
        match self
            .remote
            .set_profile(&session, ProfilePatch::playlists(playlists.to_vec()))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(uid = %session.uid, error = %e, "Failed to save playlists");
                false
            }
        }
    }

    pub(crate) async fn persist_preferences(&self, preferences: Preferences) {
        let Some(session) = self.session() else {
            self.local.set_preferences(preferences);
            return;
        };
        if let Err(e) = self
            .remote
            .set_profile(&session, ProfilePatch::preferences(preferences))
            .await
        {
            tracing::error!(uid = %session.uid, error = %e, "Failed to save preferences");
        }
    }

    pub(crate) fn format_error(error: &dyn std::error::Error) -> String {
        let error_str = error.to_string();

        if error_str.contains("not configured") {
            "Cloud sync is not configured. Add Firebase settings to config.toml.".to_string()
        } else if error_str.contains("401") || error_str.contains("403") {
            "Sign-in was rejected. Check your Firebase API key.".to_string()
        } else if error_str.contains("HTTP error") {
            "Network error. Check your connection and try again.".to_string()
        } else {
            format!("Error: {}", error_str)
        }
    }
}
