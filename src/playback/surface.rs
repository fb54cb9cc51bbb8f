//! Binds playback state to the player backend
//!
//! The surface never owns playback state. It watches the model, pushes the
//! differences into the player, and turns player events and transport
//! commands back into model actions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use super::player::{Player, PlayerEvent};
use super::timer::ProgressTimer;
use crate::controller::AppController;
use crate::model::{Action, AppModel, MediaItem};

/// Two "previous" presses closer than this go back one track.
const PREVIOUS_WINDOW: Duration = Duration::from_secs(1);
/// A "previous" press this close to the start also goes back.
const PREVIOUS_START_SECS: f64 = 1.0;
const VOLUME_STEP: u8 = 5;

/// Playback requests from the keyboard or the OS media keys.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Seek(f64),
    SeekRelative(f64),
    SetVolume(u8),
    VolumeUp,
    VolumeDown,
    ToggleRepeat,
}

pub struct PlaybackSurface {
    controller: AppController,
    model: Arc<AppModel>,
    player: Option<Arc<dyn Player>>,
    events: Option<broadcast::Receiver<PlayerEvent>>,
    timer: ProgressTimer,
    progress_interval: Duration,
    loaded_seq: u64,
    commanded_playing: Option<bool>,
    applied_volume: Option<u8>,
    last_previous_press: Option<Instant>,
}

impl PlaybackSurface {
    pub fn new(controller: AppController) -> Self {
        let model = controller.model().clone();
        let progress_interval = Duration::from_millis(controller.config.player.progress_interval_ms.max(50));
        Self {
            controller,
            model,
            player: None,
            events: None,
            timer: ProgressTimer::default(),
            progress_interval,
            loaded_seq: 0,
            commanded_playing: None,
            applied_volume: None,
            last_previous_press: None,
        }
    }

    #[cfg(test)]
    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    #[cfg(test)]
    pub fn timer_active(&self) -> bool {
        self.timer.is_active()
    }

    /// Fill the player slot and catch the player up with the current state.
    pub async fn attach(&mut self, player: Arc<dyn Player>) {
        tracing::info!("Player attached to playback surface");
        self.events = Some(player.subscribe());
        self.player = Some(player);
        self.commanded_playing = None;
        self.applied_volume = None;
        self.reconcile().await;
    }

    /// Process state changes, commands and player events until quit.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<TransportCommand>,
        mut players: mpsc::UnboundedReceiver<Arc<dyn Player>>,
    ) {
        let mut state_rx = self.model.subscribe();
        let mut players_open = true;
        tracing::info!("Playback surface started");

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() || state_rx.borrow_and_update().should_quit {
                        break;
                    }
                    self.reconcile().await;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                player = players.recv(), if players_open => match player {
                    Some(player) => self.attach(player).await,
                    None => players_open = false,
                },
                event = next_event(&mut self.events) => self.handle_event(event).await,
            }
        }

        self.timer.stop();
        tracing::debug!("Playback surface shutting down");
    }

    /// Push state differences into the player.
    pub async fn reconcile(&mut self) {
        let (current, load_seq, playing, video, volume) = self.model.read(|state| {
            let playback = &state.playback;
            (
                playback.current.clone(),
                playback.load_seq,
                playback.is_playing,
                playback.video_mode,
                playback.volume,
            )
        });

        let Some(player) = self.player.clone() else {
            self.timer.stop();
            return;
        };

        if load_seq != self.loaded_seq {
            self.loaded_seq = load_seq;
            if let Some(item) = current.as_ref() {
                tracing::info!(id = %item.id, title = %item.title, video, "Loading media");
                if let Err(e) = player.load(item, video).await {
                    tracing::error!(id = %item.id, error = %e, "Failed to load media");
                }
                self.commanded_playing = None;
                self.model.dispatch(Action::ResetProgress);
            }
        }

        if self.applied_volume != Some(volume) {
            if let Err(e) = player.set_volume(volume).await {
                tracing::warn!(volume, error = %e, "Failed to set volume");
            }
            self.applied_volume = Some(volume);
        }

        if current.is_some() && self.commanded_playing != Some(playing) {
            let result = if playing { player.play().await } else { player.pause().await };
            if let Err(e) = result {
                tracing::warn!(playing, error = %e, "Failed to change play state");
            }
            self.commanded_playing = Some(playing);
        }

        if playing && current.is_some() {
            self.timer.start(player, self.model.clone(), self.progress_interval);
        } else {
            self.timer.stop();
        }
    }

    pub async fn handle_event(&mut self, event: PlayerEvent) {
        tracing::debug!(?event, "Player event");
        match event {
            PlayerEvent::Ready => {
                let Some(player) = self.player.clone() else {
                    return;
                };
                let duration = player.duration().await.unwrap_or_default();
                let position = player.position().await.unwrap_or_default();
                self.model.dispatch(Action::Progress {
                    position_secs: position,
                    duration_secs: duration,
                });
            }
            PlayerEvent::Playing | PlayerEvent::Paused => {
                let playing = event == PlayerEvent::Playing;
                self.commanded_playing = Some(playing);
                if self.model.read(|state| state.playback.is_playing) != playing {
                    self.model.dispatch(Action::SetPlaying(playing));
                }
            }
            PlayerEvent::Ended => self.play_next().await,
            PlayerEvent::Error(message) => {
                tracing::warn!(%message, "Player reported an error");
                self.model.dispatch(Action::ShowNotice(format!("Playback error: {message}")));
            }
        }
        self.reconcile().await;
    }

    /// Apply a transport command. Without a player this does nothing.
    pub async fn handle_command(&mut self, command: TransportCommand) {
        let Some(player) = self.player.clone() else {
            tracing::debug!(?command, "No player yet, ignoring command");
            return;
        };
        tracing::debug!(?command, "Transport command");

        let playback = self.model.read(|state| state.playback.clone());
        match command {
            TransportCommand::Play | TransportCommand::Pause | TransportCommand::Toggle => {
                if playback.current.is_some() {
                    let playing = match command {
                        TransportCommand::Play => true,
                        TransportCommand::Pause => false,
                        _ => !playback.is_playing,
                    };
                    self.model.dispatch(Action::SetPlaying(playing));
                }
            }
            TransportCommand::Next => self.play_next().await,
            TransportCommand::Previous => self.previous().await,
            TransportCommand::Seek(position) => {
                self.seek_to(&player, position, playback.duration_secs).await;
            }
            TransportCommand::SeekRelative(delta) => {
                self.seek_to(&player, playback.position_secs + delta, playback.duration_secs)
                    .await;
            }
            TransportCommand::SetVolume(volume) => self.model.dispatch(Action::SetVolume(volume)),
            TransportCommand::VolumeUp => {
                let volume = playback.volume.saturating_add(VOLUME_STEP).min(100);
                self.model.dispatch(Action::SetVolume(volume));
            }
            TransportCommand::VolumeDown => {
                let volume = playback.volume.saturating_sub(VOLUME_STEP);
                self.model.dispatch(Action::SetVolume(volume));
            }
            TransportCommand::ToggleRepeat => {
                self.model.dispatch(Action::SetRepeat(!playback.repeat));
            }
        }
        self.reconcile().await;
    }

    async fn seek_to(&self, player: &Arc<dyn Player>, position: f64, duration: f64) {
        let position = if duration > 0.0 {
            position.clamp(0.0, duration)
        } else {
            position.max(0.0)
        };
        if let Err(e) = player.seek(position).await {
            tracing::warn!(position, error = %e, "Seek failed");
            return;
        }
        self.model.dispatch(Action::Progress {
            position_secs: position,
            duration_secs: duration,
        });
    }

    /// Start the current item over from the beginning.
    async fn restart(&mut self) {
        let Some(player) = self.player.clone() else {
            return;
        };
        if let Err(e) = player.seek(0.0).await {
            tracing::warn!(error = %e, "Restart seek failed");
        }
        if let Err(e) = player.play().await {
            tracing::warn!(error = %e, "Restart play failed");
        }
        self.commanded_playing = Some(true);
        let duration = self.model.read(|state| state.playback.duration_secs);
        self.model.dispatch(Action::Progress {
            position_secs: 0.0,
            duration_secs: duration,
        });
        self.model.dispatch(Action::SetPlaying(true));
    }

    /// Repeat restarts the current item. Otherwise a random track from the
    /// same channel is played, falling back to a restart.
    async fn play_next(&mut self) {
        let (current, repeat, video, language) = self.model.read(|state| {
            (
                state.playback.current.clone(),
                state.playback.repeat,
                state.playback.video_mode,
                state.preferences.language,
            )
        });
        let Some(current) = current else {
            return;
        };
        if repeat {
            tracing::debug!(id = %current.id, "Repeat on, restarting");
            self.restart().await;
            return;
        }

        let query = format!("{} song", current.channel_title);
        let limit = self.controller.config.catalog.next_search_limit;
        let candidates = match self.controller.catalog.search(&query, limit, language).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Next-track search failed");
                Vec::new()
            }
        };

        match pick_next(&candidates, &current.id) {
            Some(next) => {
                tracing::info!(from = %current.id, to = %next.id, "Playing next track");
                self.controller.play_track(next, video);
            }
            None => {
                tracing::debug!(query = %query, "No next track found, restarting");
                self.restart().await;
            }
        }
    }

    /// A second press inside the window, or a press in the first second of
    /// the track, goes back one entry in history. Any other press restarts
    /// the current item.
    async fn previous(&mut self) {
        let now = Instant::now();
        let within_window = self
            .last_previous_press
            .is_some_and(|at| now.duration_since(at) <= PREVIOUS_WINDOW);
        let near_start = self.model.read(|state| state.playback.position_secs < PREVIOUS_START_SECS);

        if !within_window && !near_start {
            self.last_previous_press = Some(now);
            self.restart().await;
            return;
        }

        self.last_previous_press = None;
        let (target, video) = self.model.read(|state| {
            let history = &state.library.history;
            let target = history
                .len()
                .checked_sub(2)
                .map(|index| history[index].item.clone());
            (target, state.playback.video_mode)
        });
        match target {
            Some(item) => {
                tracing::info!(id = %item.id, "Going back to previous track");
                self.controller.play_track(item, video);
            }
            None => self.restart().await,
        }
    }
}

/// Random pick among the results, preferring anything but the current item.
fn pick_next(candidates: &[MediaItem], current_id: &str) -> Option<MediaItem> {
    let others: Vec<&MediaItem> = candidates.iter().filter(|item| item.id != current_id).collect();
    let mut rng = rand::thread_rng();
    others
        .choose(&mut rng)
        .map(|item| (*item).clone())
        .or_else(|| candidates.first().cloned())
}

async fn next_event(events: &mut Option<broadcast::Receiver<PlayerEvent>>) -> PlayerEvent {
    loop {
        let Some(rx) = events.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Ok(event) => return event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Player events lagged");
            }
            Err(RecvError::Closed) => {
                tracing::warn!("Player event channel closed");
                *events = None;
            }
        }
    }
}
