//! OS media keys and now-playing metadata (MPRIS on Linux)

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition, PlatformConfig,
    SeekDirection,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::surface::TransportCommand;
use crate::model::{AppModel, MediaItem};

/// Register with the OS media controls and keep them in sync with the
/// model until the app quits. Returns `None` when no runtime is available.
pub fn spawn_media_controls(
    model: Arc<AppModel>,
    commands: mpsc::UnboundedSender<TransportCommand>,
    seek_step: f64,
) -> Option<JoinHandle<()>> {
    let handle = Handle::try_current().ok()?;
    let spawned = std::thread::Builder::new()
        .name("media-controls".into())
        .spawn(move || run(handle, model, commands, seek_step));
    match spawned {
        Ok(thread) => Some(thread),
        Err(e) => {
            tracing::warn!(error = %e, "Could not start media controls thread");
            None
        }
    }
}

fn run(
    handle: Handle,
    model: Arc<AppModel>,
    commands: mpsc::UnboundedSender<TransportCommand>,
    seek_step: f64,
) {
    let config = PlatformConfig {
        dbus_name: "neontunes",
        display_name: "NeonTunes",
        hwnd: None,
    };
    let mut controls = match MediaControls::new(config) {
        Ok(controls) => controls,
        Err(e) => {
            tracing::warn!(error = ?e, "Media controls unavailable");
            return;
        }
    };

    let attached = controls.attach(move |event| {
        if let Some(command) = map_event(&event, seek_step) {
            tracing::debug!(?event, ?command, "Media key");
            let _ = commands.send(command);
        }
    });
    if let Err(e) = attached {
        tracing::warn!(error = ?e, "Could not attach media key handler");
        return;
    }
    tracing::info!("Media controls registered");

    let mut state_rx = model.subscribe();
    let mut shown_metadata = ShownMetadata::default();
    let mut shown_playing = None;

    loop {
        let (current, load_seq, playing, position, duration, quit) = {
            let state = state_rx.borrow_and_update();
            let playback = &state.playback;
            (
                playback.current.clone(),
                playback.load_seq,
                playback.is_playing,
                playback.position_secs,
                playback.duration_secs,
                state.should_quit,
            )
        };
        if quit {
            break;
        }

        if shown_metadata.needs_update(load_seq, duration) {
            if let Some(item) = current.as_ref() {
                if let Err(e) = controls.set_metadata(metadata(item, duration)) {
                    tracing::debug!(error = ?e, "Failed to publish media metadata");
                }
            }
        }

        let now_playing = current.as_ref().map(|_| playing);
        if shown_playing != Some(now_playing) {
            shown_playing = Some(now_playing);
            let progress = Some(MediaPosition(Duration::from_secs_f64(position.max(0.0))));
            let playback = match now_playing {
                None => MediaPlayback::Stopped,
                Some(true) => MediaPlayback::Playing { progress },
                Some(false) => MediaPlayback::Paused { progress },
            };
            if let Err(e) = controls.set_playback(playback) {
                tracing::debug!(error = ?e, "Failed to publish playback status");
            }
        }

        if handle.block_on(state_rx.changed()).is_err() {
            break;
        }
    }

    let _ = controls.detach();
    tracing::debug!("Media controls released");
}

/// Which track the OS was last told about, and whether it got a duration.
#[derive(Default)]
struct ShownMetadata {
    load_seq: Option<u64>,
    with_duration: bool,
}

impl ShownMetadata {
    /// True for a new track, and once more when its duration becomes known.
    fn needs_update(&mut self, load_seq: u64, duration_secs: f64) -> bool {
        let has_duration = duration_secs > 0.0;
        if self.load_seq != Some(load_seq) {
            self.load_seq = Some(load_seq);
            self.with_duration = has_duration;
            return true;
        }
        if has_duration && !self.with_duration {
            self.with_duration = true;
            return true;
        }
        false
    }
}

fn metadata(item: &MediaItem, duration_secs: f64) -> MediaMetadata<'_> {
    MediaMetadata {
        title: Some(item.title.as_str()),
        artist: Some(item.channel_title.as_str()),
        cover_url: (!item.thumbnail.is_empty()).then_some(item.thumbnail.as_str()),
        duration: (duration_secs > 0.0).then(|| Duration::from_secs_f64(duration_secs)),
        ..Default::default()
    }
}

fn map_event(event: &MediaControlEvent, seek_step: f64) -> Option<TransportCommand> {
    let signed = |direction: &SeekDirection, amount: f64| match direction {
        SeekDirection::Forward => amount,
        SeekDirection::Backward => -amount,
    };
    let command = match event {
        MediaControlEvent::Play => TransportCommand::Play,
        MediaControlEvent::Pause | MediaControlEvent::Stop => TransportCommand::Pause,
        MediaControlEvent::Toggle => TransportCommand::Toggle,
        MediaControlEvent::Next => TransportCommand::Next,
        MediaControlEvent::Previous => TransportCommand::Previous,
        MediaControlEvent::Seek(direction) => {
            TransportCommand::SeekRelative(signed(direction, seek_step))
        }
        MediaControlEvent::SeekBy(direction, by) => {
            TransportCommand::SeekRelative(signed(direction, by.as_secs_f64()))
        }
        MediaControlEvent::SetPosition(MediaPosition(at)) => TransportCommand::Seek(at.as_secs_f64()),
        MediaControlEvent::SetVolume(volume) => {
            TransportCommand::SetVolume((volume.clamp(0.0, 1.0) * 100.0).round() as u8)
        }
        _ => return None,
    };
    Some(command)
}
