//! Test doubles and a scripted HTTP server shared by the unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};

use crate::catalog::{CatalogClient, CatalogError};
use crate::config::AppConfig;
use crate::controller::{AppController, Services};
use crate::identity::{AuthError, IdentityProvider};
use crate::model::{AppModel, Language, MediaItem, Session};
use crate::playback::{Player, PlayerError, PlayerEvent, TransportCommand};
use crate::store::{LocalPreferenceStore, ProfilePatch, RemoteProfileStore, StoreError, UserProfile};

pub fn item(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: format!("Title {id}"),
        channel_title: format!("Channel {id}"),
        ..Default::default()
    }
}

pub fn session(uid: &str) -> Session {
    Session {
        uid: uid.to_string(),
        id_token: format!("token-{uid}"),
        refresh_token: None,
        expires_at: None,
    }
}

// Scripted HTTP server

pub struct ScriptedResponse {
    status: u16,
    body: String,
}

impl ScriptedResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string() }
    }
}

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Every request seen so far: the request line, a newline, then the body.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve the responses in order, one per connection.
pub async fn serve_http(responses: Vec<ScriptedResponse>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let mut responses = VecDeque::from(responses);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let response = responses
                .pop_front()
                .unwrap_or_else(|| ScriptedResponse::new(500, r#"{"error":"no scripted response"}"#));
            answer(stream, response, &recorded).await;
        }
    });

    TestServer { base_url, requests }
}

async fn answer(mut stream: TcpStream, response: ScriptedResponse, recorded: &Mutex<Vec<String>>) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body = String::from_utf8_lossy(&buffer[header_end..]).to_string();
    let request_line = head.lines().next().unwrap_or_default().to_string();
    recorded.lock().unwrap().push(format!("{request_line}\n{body}"));

    let reply = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        if response.status < 400 { "OK" } else { "Error" },
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
    Some(())
}

// Catalog

#[derive(Default)]
pub struct FakeCatalog {
    results: Mutex<Vec<MediaItem>>,
    failing: AtomicBool,
    searches: Mutex<Vec<(String, Language)>>,
}

impl FakeCatalog {
    pub fn set_results(&self, results: Vec<MediaItem>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn searches(&self) -> Vec<(String, Language)> {
        self.searches.lock().unwrap().clone()
    }

    fn respond(&self) -> Result<Vec<MediaItem>, CatalogError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Api { status: 500, message: "scripted failure".into() });
        }
        Ok(self.results.lock().unwrap().clone())
    }
}

impl CatalogClient for FakeCatalog {
    fn search<'a>(
        &'a self,
        query: &'a str,
        _limit: u32,
        language: Language,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>> {
        self.searches.lock().unwrap().push((query.to_string(), language));
        Box::pin(async move { self.respond() })
    }

    fn trending<'a>(
        &'a self,
        _region: &'a str,
        _limit: u32,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>> {
        Box::pin(async move { self.respond() })
    }
}

// Remote store

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    failing_reads: AtomicBool,
    failing_writes: AtomicBool,
}

impl MemoryProfileStore {
    pub fn profile(&self, uid: &str) -> UserProfile {
        self.profiles.lock().unwrap().get(uid).cloned().unwrap_or_default()
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn scripted_failure() -> StoreError {
        StoreError::Remote { status: 503, message: "scripted failure".into() }
    }
}

impl RemoteProfileStore for MemoryProfileStore {
    fn get_profile<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, Result<UserProfile, StoreError>> {
        Box::pin(async move {
            if self.failing_reads.load(Ordering::SeqCst) {
                return Err(Self::scripted_failure());
            }
            Ok(self.profile(&session.uid))
        })
    }

    fn set_profile<'a>(
        &'a self,
        session: &'a Session,
        patch: ProfilePatch,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(Self::scripted_failure());
            }
            let mut profiles = self.profiles.lock().unwrap();
            patch.apply_to(profiles.entry(session.uid.clone()).or_default());
            Ok(())
        })
    }
}

// Identity

pub struct FakeIdentity {
    current: watch::Sender<Option<Session>>,
    failing_sign_in: AtomicBool,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        let (current, _) = watch::channel(None);
        Self { current, failing_sign_in: AtomicBool::new(false) }
    }
}

impl FakeIdentity {
    pub fn fail_sign_in(&self, failing: bool) {
        self.failing_sign_in.store(failing, Ordering::SeqCst);
    }
}

impl IdentityProvider for FakeIdentity {
    fn sign_in(&self) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            if self.failing_sign_in.load(Ordering::SeqCst) {
                return Err(AuthError::Rejected { status: 400, message: "scripted failure".into() });
            }
            let session = session("anon");
            self.current.send_replace(Some(session.clone()));
            Ok(session)
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.current.send_replace(None);
            Ok(())
        })
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

// Player

pub struct FakePlayer {
    calls: Mutex<Vec<String>>,
    times: Mutex<(f64, f64)>,
    events: broadcast::Sender<PlayerEvent>,
}

impl Default for FakePlayer {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            calls: Mutex::default(),
            times: Mutex::new((0.0, 0.0)),
            events,
        }
    }
}

impl FakePlayer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_times(&self, position: f64, duration: f64) {
        *self.times.lock().unwrap() = (position, duration);
    }

    fn record(&self, call: String) -> BoxFuture<'_, Result<(), PlayerError>> {
        self.calls.lock().unwrap().push(call);
        Box::pin(async { Ok(()) })
    }
}

impl Player for FakePlayer {
    fn load<'a>(&'a self, item: &'a MediaItem, video: bool) -> BoxFuture<'a, Result<(), PlayerError>> {
        let mode = if video { "video" } else { "audio" };
        self.record(format!("load:{}:{mode}", item.id))
    }

    fn play(&self) -> BoxFuture<'_, Result<(), PlayerError>> {
        self.record("play".to_string())
    }

    fn pause(&self) -> BoxFuture<'_, Result<(), PlayerError>> {
        self.record("pause".to_string())
    }

    fn seek(&self, position_secs: f64) -> BoxFuture<'_, Result<(), PlayerError>> {
        self.record(format!("seek:{position_secs}"))
    }

    fn set_volume(&self, percent: u8) -> BoxFuture<'_, Result<(), PlayerError>> {
        self.record(format!("volume:{percent}"))
    }

    fn position(&self) -> BoxFuture<'_, Result<f64, PlayerError>> {
        let position = self.times.lock().unwrap().0;
        Box::pin(async move { Ok(position) })
    }

    fn duration(&self) -> BoxFuture<'_, Result<f64, PlayerError>> {
        let duration = self.times.lock().unwrap().1;
        Box::pin(async move { Ok(duration) })
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

// Controller harness

pub struct TestHarness {
    pub controller: AppController,
    pub local: LocalPreferenceStore,
    pub remote: Arc<MemoryProfileStore>,
    pub identity: Arc<FakeIdentity>,
    pub catalog: Arc<FakeCatalog>,
    pub transport_rx: mpsc::UnboundedReceiver<TransportCommand>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(
            LocalPreferenceStore::in_memory(),
            Arc::default(),
            Arc::default(),
            Arc::default(),
        )
    }

    /// A harness whose controller persists through `local`.
    pub fn with_local(local: LocalPreferenceStore) -> Self {
        Self::build(local, Arc::default(), Arc::default(), Arc::default())
    }

    /// A fresh controller over the same stores, as after an app restart.
    pub fn restart(&self) -> Self {
        Self::build(
            self.local.clone(),
            self.remote.clone(),
            Arc::default(),
            Arc::default(),
        )
    }

    fn build(
        local: LocalPreferenceStore,
        remote: Arc<MemoryProfileStore>,
        identity: Arc<FakeIdentity>,
        catalog: Arc<FakeCatalog>,
    ) -> Self {
        let (transport, transport_rx) = mpsc::unbounded_channel();
        let services = Services {
            catalog: catalog.clone(),
            local: local.clone(),
            remote: remote.clone(),
            identity: identity.clone(),
        };
        let controller = AppController::new(
            Arc::new(AppModel::default()),
            services,
            Arc::new(AppConfig::default()),
            transport,
        );
        Self { controller, local, remote, identity, catalog, transport_rx }
    }
}
