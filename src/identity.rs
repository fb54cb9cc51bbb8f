//! Identity provider: anonymous accounts with change notifications
//!
//! The session is published on a `watch` channel; the controller reacts to
//! changes there rather than to the return value of `sign_in`.

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::FirebaseConfig;
use crate::model::Session;
use crate::store::LocalPreferenceStore;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("cloud sync is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sign-in rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid auth response: {0}")]
    Parse(String),
}

pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self) -> BoxFuture<'_, Result<Session, AuthError>>;

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;

    /// Current session and all later changes.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

const REFRESH_RETRY: std::time::Duration = std::time::Duration::from_secs(60);

fn expiry_from(expires_in: &str) -> Result<chrono::DateTime<Utc>, AuthError> {
    let secs: i64 = expires_in
        .parse()
        .map_err(|_| AuthError::Parse(format!("expiresIn = {expires_in:?}")))?;
    Ok(Utc::now() + ChronoDuration::seconds(secs))
}

/// Anonymous accounts through the Identity Toolkit REST API.
pub struct FirebaseIdentity {
    http: Client,
    config: FirebaseConfig,
    store: LocalPreferenceStore,
    session: watch::Sender<Option<Session>>,
}

impl FirebaseIdentity {
    pub fn new(config: FirebaseConfig, store: LocalPreferenceStore) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            http: Client::new(),
            config,
            store,
            session,
        }
    }

    /// Publish the cached session from the previous run, refreshing it
    /// first when its token has expired.
    pub async fn restore(&self) {
        let Some(cached) = self.store.session() else {
            return;
        };
        if !cached.is_expired() {
            tracing::info!(uid = %cached.uid, "Restored cached session");
            self.publish(Some(cached));
            return;
        }
        match self.refresh(&cached).await {
            Ok(session) => {
                tracing::info!(uid = %session.uid, "Refreshed expired session");
                self.publish(Some(session));
            }
            Err(e) => {
                tracing::warn!(uid = %cached.uid, error = %e, "Could not refresh cached session, staying signed out");
                self.store.set_session(None);
            }
        }
    }

    /// Keep the published token fresh until the process exits.
    pub fn spawn_refresher(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            loop {
                let current = rx.borrow_and_update().clone();
                let Some(session) = current else {
                    if rx.changed().await.is_err() {
                        break;
                    }
                    continue;
                };
                let wait = session
                    .expires_at
                    .map(|at| (at - Utc::now() - ChronoDuration::seconds(60)).to_std().unwrap_or_default())
                    .unwrap_or(std::time::Duration::from_secs(3000));
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(wait) => {
                        match self.refresh(&session).await {
                            Ok(fresh) => self.publish(Some(fresh)),
                            Err(e) => {
                                tracing::warn!(uid = %session.uid, error = %e, "Token refresh failed");
                                // Back off, but a sign-out or new session ends the wait.
                                tokio::select! {
                                    changed = rx.changed() => {
                                        if changed.is_err() {
                                            break;
                                        }
                                    }
                                    _ = tokio::time::sleep(REFRESH_RETRY) => {}
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    fn publish(&self, session: Option<Session>) {
        self.store.set_session(session.as_ref());
        self.session.send_replace(session);
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(AuthError::Rejected { status, message })
    }

    async fn sign_up_anonymously(&self) -> Result<Session, AuthError> {
        crate::log_api_request!("sign_up", identity_url = %self.config.identity_url);
        let resp = self
            .http
            .post(format!("{}/accounts:signUp", self.config.identity_url))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&serde_json::json!({ "returnSecureToken": true }))
            .send()
            .await?;
        let body: SignUpResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        Ok(Session {
            uid: body.local_id,
            id_token: body.id_token,
            refresh_token: Some(body.refresh_token),
            expires_at: Some(expiry_from(&body.expires_in)?),
        })
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(AuthError::Parse("session has no refresh token".into()));
        };
        let resp = self
            .http
            .post(format!("{}/token", self.config.token_url))
            .query(&[("key", self.config.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;
        let body: RefreshResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        Ok(Session {
            uid: body.user_id,
            id_token: body.id_token,
            refresh_token: Some(body.refresh_token),
            expires_at: Some(expiry_from(&body.expires_in)?),
        })
    }
}

impl IdentityProvider for FirebaseIdentity {
    fn sign_in(&self) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            let existing = self.session.borrow().clone();
            if let Some(existing) = existing {
                return Ok(existing);
            }
            if self.config.api_key.is_empty() {
                return Err(AuthError::NotConfigured);
            }
            let result = self.sign_up_anonymously().await;
            crate::log_api_result!("sign_up", result);
            let session = result?;
            self.publish(Some(session.clone()));
            Ok(session)
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            tracing::info!("Signing out");
            self.publish(None);
            Ok(())
        })
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_http, ScriptedResponse};

    fn config(base: &str) -> FirebaseConfig {
        FirebaseConfig {
            api_key: "fb-key".into(),
            database_url: format!("{base}/db"),
            identity_url: base.to_string(),
            token_url: base.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_creates_and_publishes_anonymous_session() {
        let server = serve_http(vec![ScriptedResponse::new(
            200,
            r#"{"localId":"uid-9","idToken":"id","refreshToken":"rt","expiresIn":"3600"}"#,
        )])
        .await;
        let store = LocalPreferenceStore::in_memory();
        let identity = FirebaseIdentity::new(config(&server.base_url), store.clone());
        let mut rx = identity.subscribe();

        let session = identity.sign_in().await.unwrap();
        assert_eq!(session.uid, "uid-9");
        assert!(!session.is_expired());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.uid.clone()), Some("uid-9".into()));
        assert_eq!(store.session().map(|s| s.uid), Some("uid-9".into()));

        let request = &server.requests()[0];
        assert!(request.starts_with("POST /accounts:signUp?key=fb-key"));
        assert!(request.contains("returnSecureToken"));

        // Already signed in: no second request.
        identity.sign_in().await.unwrap();
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_sign_in_fails() {
        let identity = FirebaseIdentity::new(FirebaseConfig::default(), LocalPreferenceStore::in_memory());
        assert!(matches!(identity.sign_in().await, Err(AuthError::NotConfigured)));
        assert!(identity.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn rejected_sign_in_is_an_error() {
        let server = serve_http(vec![ScriptedResponse::new(400, r#"{"error":{"message":"OPERATION_NOT_ALLOWED"}}"#)]).await;
        let identity = FirebaseIdentity::new(config(&server.base_url), LocalPreferenceStore::in_memory());
        assert!(matches!(identity.sign_in().await, Err(AuthError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn sign_out_clears_cached_session() {
        let store = LocalPreferenceStore::in_memory();
        store.set_session(Some(&Session {
            uid: "u".into(),
            id_token: "t".into(),
            refresh_token: None,
            expires_at: None,
        }));
        let identity = FirebaseIdentity::new(FirebaseConfig::default(), store.clone());
        identity.restore().await;
        assert!(identity.subscribe().borrow().is_some());

        identity.sign_out().await.unwrap();
        assert!(identity.subscribe().borrow().is_none());
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_on_restore() {
        let server = serve_http(vec![ScriptedResponse::new(
            200,
            r#"{"user_id":"u","id_token":"fresh","refresh_token":"rt2","expires_in":"3600"}"#,
        )])
        .await;
        let store = LocalPreferenceStore::in_memory();
        store.set_session(Some(&Session {
            uid: "u".into(),
            id_token: "stale".into(),
            refresh_token: Some("rt1".into()),
            expires_at: Some(Utc::now() - ChronoDuration::seconds(5)),
        }));
        let identity = FirebaseIdentity::new(config(&server.base_url), store.clone());
        identity.restore().await;

        let session = identity.subscribe().borrow().clone().unwrap();
        assert_eq!(session.id_token, "fresh");
        assert_eq!(store.session().unwrap().refresh_token.as_deref(), Some("rt2"));
        let request = &server.requests()[0];
        assert!(request.starts_with("POST /token?key=fb-key"));
        assert!(request.contains("grant_type=refresh_token"));
    }

    #[tokio::test]
    async fn refresh_back_off_follows_session_changes() {
        let server = serve_http(vec![
            ScriptedResponse::new(500, "{}"),
            ScriptedResponse::new(
                200,
                r#"{"user_id":"u2","id_token":"fresh-b","refresh_token":"rt3","expires_in":"3600"}"#,
            ),
        ])
        .await;
        let identity = std::sync::Arc::new(FirebaseIdentity::new(
            config(&server.base_url),
            LocalPreferenceStore::in_memory(),
        ));
        let expired = |uid: &str, refresh: &str| Session {
            uid: uid.into(),
            id_token: "stale".into(),
            refresh_token: Some(refresh.into()),
            expires_at: Some(Utc::now() - ChronoDuration::seconds(5)),
        };
        identity.publish(Some(expired("u1", "rt-a")));
        let _refresher = identity.clone().spawn_refresher();

        let requests_reach = |n: usize| {
            let server = &server;
            async move {
                for _ in 0..300 {
                    if server.requests().len() >= n {
                        return true;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
                false
            }
        };

        assert!(requests_reach(1).await, "first refresh never sent");
        identity.publish(Some(expired("u2", "rt-b")));
        assert!(requests_reach(2).await, "new session waited out the back-off");
        assert!(server.requests()[1].contains("refresh_token=rt-b"));
    }
}
