//! Per-user cloud profile document

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use crate::model::{MediaItem, Playlist, Preferences, Session};

/// The synced part of a user's library.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub liked_songs: Vec<MediaItem>,
    pub playlists: Vec<Playlist>,
    pub preferences: Option<Preferences>,
}

/// A merge-write: only the fields that are set are written.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_songs: Option<Vec<MediaItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Vec<Playlist>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

impl ProfilePatch {
    pub fn liked_songs(liked: Vec<MediaItem>) -> Self {
        Self { liked_songs: Some(liked), ..Default::default() }
    }

    pub fn playlists(playlists: Vec<Playlist>) -> Self {
        Self { playlists: Some(playlists), ..Default::default() }
    }

    pub fn preferences(preferences: Preferences) -> Self {
        Self { preferences: Some(preferences), ..Default::default() }
    }

    /// Patch that overwrites every field with `profile`'s.
    pub fn full(profile: &UserProfile) -> Self {
        Self {
            liked_songs: Some(profile.liked_songs.clone()),
            playlists: Some(profile.playlists.clone()),
            preferences: profile.preferences,
        }
    }

    pub fn apply_to(self, profile: &mut UserProfile) {
        if let Some(liked) = self.liked_songs {
            profile.liked_songs = liked;
        }
        if let Some(playlists) = self.playlists {
            profile.playlists = playlists;
        }
        if let Some(preferences) = self.preferences {
            profile.preferences = Some(preferences);
        }
    }
}

/// Remote document store keyed by user id.
pub trait RemoteProfileStore: Send + Sync {
    /// Fetch the profile; a missing document reads as the default profile.
    fn get_profile<'a>(&'a self, session: &'a Session)
        -> BoxFuture<'a, Result<UserProfile, StoreError>>;

    fn set_profile<'a>(
        &'a self,
        session: &'a Session,
        patch: ProfilePatch,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Realtime Database REST client, one document per user at `users/{uid}`.
pub struct RealtimeDbProfileStore {
    http: Client,
    database_url: String,
}

impl RealtimeDbProfileStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            database_url: database_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn document_url(&self, session: &Session) -> String {
        format!("{}/users/{}.json", self.database_url, session.uid)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(StoreError::Remote { status, message })
    }
}

impl RemoteProfileStore for RealtimeDbProfileStore {
    fn get_profile<'a>(
        &'a self,
        session: &'a Session,
    ) -> BoxFuture<'a, Result<UserProfile, StoreError>> {
        Box::pin(async move {
            crate::log_api_request!("get_profile", uid = %session.uid);
            let result = async {
                let resp = self
                    .http
                    .get(self.document_url(session))
                    .query(&[("auth", session.id_token.as_str())])
                    .send()
                    .await?;
                let resp = Self::check(resp).await?;
                // An absent document comes back as `null`.
                let profile: Option<UserProfile> = resp.json().await?;
                Ok::<_, StoreError>(profile.unwrap_or_default())
            }
            .await;
            crate::log_api_result!("get_profile", result, uid = %session.uid);
            result
        })
    }

    fn set_profile<'a>(
        &'a self,
        session: &'a Session,
        patch: ProfilePatch,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            crate::log_api_request!("set_profile", uid = %session.uid);
            let result = async {
                let resp = self
                    .http
                    .patch(self.document_url(session))
                    .query(&[("auth", session.id_token.as_str())])
                    .json(&patch)
                    .send()
                    .await?;
                Self::check(resp).await?;
                Ok::<_, StoreError>(())
            }
            .await;
            crate::log_api_result!("set_profile", result, uid = %session.uid);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_http, ScriptedResponse};

    fn session() -> Session {
        Session {
            uid: "u1".into(),
            id_token: "tok".into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ProfilePatch::liked_songs(vec![MediaItem { id: "a".into(), ..Default::default() }]);
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json.get("likedSongs").is_some());
        assert!(json.get("playlists").is_none());
        assert!(json.get("preferences").is_none());
    }

    #[test]
    fn patch_merges_into_profile() {
        let mut profile = UserProfile {
            playlists: vec![Playlist { id: "p".into(), ..Default::default() }],
            ..Default::default()
        };
        ProfilePatch::preferences(Preferences::default()).apply_to(&mut profile);
        assert_eq!(profile.playlists.len(), 1);
        assert_eq!(profile.preferences, Some(Preferences::default()));
    }

    #[tokio::test]
    async fn missing_document_reads_as_default() {
        let server = serve_http(vec![ScriptedResponse::new(200, "null")]).await;
        let store = RealtimeDbProfileStore::new(&server.base_url);
        let profile = store.get_profile(&session()).await.unwrap();
        assert_eq!(profile, UserProfile::default());
        assert!(server.requests()[0].starts_with("GET /users/u1.json?auth=tok"));
    }

    #[tokio::test]
    async fn set_profile_patches_the_user_document() {
        let server = serve_http(vec![ScriptedResponse::new(200, "{}")]).await;
        let store = RealtimeDbProfileStore::new(&server.base_url);
        store
            .set_profile(&session(), ProfilePatch::liked_songs(vec![]))
            .await
            .unwrap();
        let request = &server.requests()[0];
        assert!(request.starts_with("PATCH /users/u1.json?auth=tok"));
        assert!(request.contains(r#""likedSongs":[]"#));
    }

    #[tokio::test]
    async fn rejected_write_is_an_error() {
        let server = serve_http(vec![ScriptedResponse::new(401, r#"{"error":"Permission denied"}"#)]).await;
        let store = RealtimeDbProfileStore::new(&server.base_url);
        let result = store.set_profile(&session(), ProfilePatch::default()).await;
        assert!(matches!(result, Err(StoreError::Remote { status: 401, .. })));
    }
}
