use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::model::MediaItem;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("could not start the player: {0}")]
    Spawn(std::io::Error),

    #[error("player I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("player command failed: {0}")]
    Command(String),

    #[error("player connection closed")]
    Closed,
}

/// Notifications from the player backend.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    /// Media is loaded and its duration is known.
    Ready,
    Playing,
    Paused,
    /// Playback reached the end of the media.
    Ended,
    Error(String),
}

/// An embeddable media player.
pub trait Player: Send + Sync {
    /// Load `item` and start playing it, showing video when `video` is set.
    fn load<'a>(&'a self, item: &'a MediaItem, video: bool) -> BoxFuture<'a, Result<(), PlayerError>>;

    fn play(&self) -> BoxFuture<'_, Result<(), PlayerError>>;

    fn pause(&self) -> BoxFuture<'_, Result<(), PlayerError>>;

    fn seek(&self, position_secs: f64) -> BoxFuture<'_, Result<(), PlayerError>>;

    fn set_volume(&self, percent: u8) -> BoxFuture<'_, Result<(), PlayerError>>;

    fn position(&self) -> BoxFuture<'_, Result<f64, PlayerError>>;

    fn duration(&self) -> BoxFuture<'_, Result<f64, PlayerError>>;

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}
