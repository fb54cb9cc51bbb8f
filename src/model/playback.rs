//! Playback-related state

use super::types::MediaItem;

pub const DEFAULT_VOLUME_PERCENT: u8 = 50;

/// What is playing and how. Written only by the reducer, read by the
/// playback surface and the view.
#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub current: Option<MediaItem>,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: u8,
    pub repeat: bool,
    pub video_mode: bool,
    pub card_minimized: bool,
    pub user_minimized: bool,
    /// Bumped on every track start, so replaying the same id still reloads.
    pub load_seq: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current: None,
            is_playing: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: DEFAULT_VOLUME_PERCENT,
            repeat: false,
            video_mode: false,
            card_minimized: false,
            user_minimized: false,
            load_seq: 0,
        }
    }
}

impl PlaybackState {
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|item| item.id.as_str())
    }

    pub fn progress_ratio(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether the now-playing card should be drawn at all.
    pub fn card_visible(&self) -> bool {
        self.current.is_some() && !self.user_minimized
    }
}
