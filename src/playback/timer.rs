//! Periodic position polling while media plays

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::player::Player;
use crate::model::{Action, AppModel};

/// Owns the polling task; stopping it aborts the task.
#[derive(Default)]
pub struct ProgressTimer {
    task: Option<JoinHandle<()>>,
}

impl ProgressTimer {
    pub fn start(&mut self, player: Arc<dyn Player>, model: Arc<AppModel>, interval: Duration) {
        if self.is_active() {
            return;
        }
        tracing::trace!(interval_ms = interval.as_millis() as u64, "Progress timer started");
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let (position, duration) = match (player.position().await, player.duration().await) {
                    (Ok(position), Ok(duration)) => (position, duration),
                    // Nothing loaded yet
                    _ => continue,
                };
                model.dispatch(Action::Progress {
                    position_secs: position,
                    duration_secs: duration,
                });
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!("Progress timer stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
