//! mpv child process driven over its JSON IPC socket

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot};

use super::player::{Player, PlayerError, PlayerEvent};
use crate::model::MediaItem;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, PlayerError>>>>>;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);
const EVENT_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MpvPlayer {
    // Killed on drop
    _child: Option<Child>,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_request: AtomicU64,
    events: broadcast::Sender<PlayerEvent>,
}

impl MpvPlayer {
    /// Start an idle mpv and connect to its IPC socket.
    pub async fn spawn(mpv_path: &str, socket_path: &Path, volume: u8) -> Result<Self, PlayerError> {
        if let Err(e) = std::fs::remove_file(socket_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %socket_path.display(), error = %e, "Could not remove stale mpv socket");
            }
        }

        tracing::info!(mpv_path, socket = %socket_path.display(), "Starting mpv");
        let child = Command::new(mpv_path)
            .arg("--idle=yes")
            .arg("--keep-open=yes")
            .arg("--no-terminal")
            .arg("--force-window=no")
            .arg("--vid=no")
            .arg(format!("--volume={volume}"))
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(PlayerError::Spawn)?;

        let stream = connect(socket_path).await?;
        Self::from_stream(stream, Some(child)).await
    }

    async fn from_stream(stream: UnixStream, child: Option<Child>) -> Result<Self, PlayerError> {
        let (reader, writer) = stream.into_split();
        let pending: Pending = Arc::default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        spawn_reader(reader, pending.clone(), events.clone());

        let player = Self {
            _child: child,
            writer: tokio::sync::Mutex::new(writer),
            pending,
            next_request: AtomicU64::new(1),
            events,
        };
        player.command(json!(["observe_property", 1, "pause"])).await?;
        player.command(json!(["observe_property", 2, "eof-reached"])).await?;
        Ok(player)
    }

    async fn command(&self, args: Value) -> Result<Value, PlayerError> {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(request_id, tx);

        tracing::trace!(request_id, command = %args, "mpv command");
        let line = format!("{}\n", json!({ "command": args, "request_id": request_id }));
        if let Err(e) = self.writer.lock().await.write_all(line.as_bytes()).await {
            lock(&self.pending).remove(&request_id);
            return Err(e.into());
        }
        rx.await.map_err(|_| PlayerError::Closed)?
    }

    async fn set_property(&self, name: &str, value: Value) -> Result<(), PlayerError> {
        self.command(json!(["set_property", name, value])).await.map(|_| ())
    }

    async fn get_number(&self, name: &str) -> Result<f64, PlayerError> {
        let value = self.command(json!(["get_property", name])).await?;
        value
            .as_f64()
            .ok_or_else(|| PlayerError::Command(format!("{name} is not a number")))
    }
}

async fn connect(path: &Path) -> Result<UnixStream, PlayerError> {
    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match UnixStream::connect(path).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    }
    Err(last_error.map(PlayerError::Io).unwrap_or(PlayerError::Closed))
}

fn spawn_reader(reader: OwnedReadHalf, pending: Pending, events: broadcast::Sender<PlayerEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => handle_line(&line, &pending, &events),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "mpv IPC read failed");
                    break;
                }
            }
        }
        for (_, waiter) in lock(&pending).drain() {
            let _ = waiter.send(Err(PlayerError::Closed));
        }
        tracing::info!("mpv IPC connection closed");
    });
}

fn handle_line(line: &str, pending: &Pending, events: &broadcast::Sender<PlayerEvent>) {
    let Ok(message) = serde_json::from_str::<Value>(line) else {
        tracing::trace!(line, "Ignoring non-JSON mpv output");
        return;
    };

    if let Some(request_id) = message.get("request_id").and_then(Value::as_u64) {
        if let Some(waiter) = lock(pending).remove(&request_id) {
            let result = match message.get("error").and_then(Value::as_str) {
                None | Some("success") => Ok(message.get("data").cloned().unwrap_or(Value::Null)),
                Some(error) => Err(PlayerError::Command(error.to_string())),
            };
            let _ = waiter.send(result);
        }
        return;
    }

    if let Some(event) = parse_event(&message) {
        // No receivers is fine
        let _ = events.send(event);
    }
}

fn parse_event(message: &Value) -> Option<PlayerEvent> {
    match message.get("event")?.as_str()? {
        "file-loaded" => Some(PlayerEvent::Ready),
        "end-file" if message.get("reason").and_then(Value::as_str) == Some("error") => {
            let detail = message
                .get("file_error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Some(PlayerEvent::Error(detail.to_string()))
        }
        "property-change" => {
            let data = message.get("data")?;
            match message.get("name")?.as_str()? {
                "pause" => Some(if data.as_bool()? {
                    PlayerEvent::Paused
                } else {
                    PlayerEvent::Playing
                }),
                "eof-reached" => data.as_bool()?.then_some(PlayerEvent::Ended),
                _ => None,
            }
        }
        _ => None,
    }
}

impl Player for MpvPlayer {
    fn load<'a>(&'a self, item: &'a MediaItem, video: bool) -> BoxFuture<'a, Result<(), PlayerError>> {
        Box::pin(async move {
            let vid = if video { "auto" } else { "no" };
            self.set_property("vid", json!(vid)).await?;
            self.command(json!(["loadfile", item.watch_url(), "replace"])).await?;
            Ok(())
        })
    }

    fn play(&self) -> BoxFuture<'_, Result<(), PlayerError>> {
        Box::pin(self.set_property("pause", json!(false)))
    }

    fn pause(&self) -> BoxFuture<'_, Result<(), PlayerError>> {
        Box::pin(self.set_property("pause", json!(true)))
    }

    fn seek(&self, position_secs: f64) -> BoxFuture<'_, Result<(), PlayerError>> {
        Box::pin(async move {
            self.command(json!(["seek", position_secs, "absolute"])).await?;
            Ok(())
        })
    }

    fn set_volume(&self, percent: u8) -> BoxFuture<'_, Result<(), PlayerError>> {
        Box::pin(self.set_property("volume", json!(percent)))
    }

    fn position(&self) -> BoxFuture<'_, Result<f64, PlayerError>> {
        Box::pin(self.get_number("time-pos"))
    }

    fn duration(&self) -> BoxFuture<'_, Result<f64, PlayerError>> {
        Box::pin(self.get_number("duration"))
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    #[test]
    fn events_map_to_player_events() {
        let cases = [
            (json!({"event": "file-loaded"}), Some(PlayerEvent::Ready)),
            (json!({"event": "property-change", "id": 1, "name": "pause", "data": true}), Some(PlayerEvent::Paused)),
            (json!({"event": "property-change", "id": 1, "name": "pause", "data": false}), Some(PlayerEvent::Playing)),
            (json!({"event": "property-change", "id": 2, "name": "eof-reached", "data": true}), Some(PlayerEvent::Ended)),
            (json!({"event": "property-change", "id": 2, "name": "eof-reached", "data": false}), None),
            (json!({"event": "end-file", "reason": "error", "file_error": "loading failed"}), Some(PlayerEvent::Error("loading failed".into()))),
            (json!({"event": "end-file", "reason": "stop"}), None),
            (json!({"event": "idle"}), None),
        ];
        for (message, expected) in cases {
            assert_eq!(parse_event(&message), expected, "{message}");
        }
    }

    /// Answer every command with `data`, after emitting `event` once.
    async fn fake_mpv(listener: UnixListener, data: Value, event: Value) -> Vec<Value> {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let mut received = Vec::new();
        let mut sent_event = false;
        while let Ok(Some(line)) = lines.next_line().await {
            let request: Value = serde_json::from_str(&line).unwrap();
            let reply = json!({"request_id": request["request_id"], "error": "success", "data": data});
            writer.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
            if !sent_event {
                writer.write_all(format!("{event}\n").as_bytes()).await.unwrap();
                sent_event = true;
            }
            received.push(request["command"].clone());
        }
        received
    }

    #[tokio::test]
    async fn commands_round_trip_over_the_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = tokio::spawn(fake_mpv(
            listener,
            json!(12.5),
            json!({"event": "property-change", "name": "pause", "data": false}),
        ));

        let stream = connect(&path).await.unwrap();
        let player = MpvPlayer::from_stream(stream, None).await.unwrap();
        let mut events = player.subscribe();

        let item = MediaItem { id: "abc".into(), ..Default::default() };
        player.load(&item, true).await.unwrap();
        assert_eq!(player.position().await.unwrap(), 12.5);
        player.set_volume(40).await.unwrap();
        drop(player);

        let received = server.await.unwrap();
        assert_eq!(received[0], json!(["observe_property", 1, "pause"]));
        assert_eq!(received[2], json!(["set_property", "vid", "auto"]));
        assert_eq!(
            received[3],
            json!(["loadfile", "https://www.youtube.com/watch?v=abc", "replace"])
        );
        assert_eq!(received[4], json!(["get_property", "time-pos"]));
        assert_eq!(received[5], json!(["set_property", "volume", 40]));

        // The event arrived before we subscribed, so only later ones count.
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_commands_surface_mpv_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&path).unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                let error = if request["command"][0] == "get_property" {
                    "property unavailable"
                } else {
                    "success"
                };
                let reply = json!({"request_id": request["request_id"], "error": error});
                writer.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
            }
        });

        let stream = connect(&path).await.unwrap();
        let player = MpvPlayer::from_stream(stream, None).await.unwrap();
        let result = player.duration().await;
        assert!(matches!(result, Err(PlayerError::Command(message)) if message == "property unavailable"));
    }
}
