//! Playback module - The player backend and everything that drives it
//!
//! - `player`: the `Player` trait and its events
//! - `mpv`: an mpv process controlled over its JSON IPC socket
//! - `surface`: reconciles playback state with the player
//! - `timer`: position polling while playing
//! - `media_controls`: OS media keys and now-playing metadata

mod player;
mod timer;
mod surface;
#[cfg(unix)]
mod mpv;
mod media_controls;

pub use player::{Player, PlayerError, PlayerEvent};
pub use surface::{PlaybackSurface, TransportCommand};
#[cfg(unix)]
pub use mpv::MpvPlayer;
pub use media_controls::spawn_media_controls;
