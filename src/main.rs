mod catalog;
mod config;
mod controller;
mod identity;
mod logging;
mod model;
mod playback;
mod store;
mod view;

#[cfg(test)]
mod testing;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use catalog::YouTubeCatalog;
use config::AppConfig;
use controller::{AppController, Services};
use identity::FirebaseIdentity;
use model::{Action, AppModel};
use playback::{PlaybackSurface, Player};
use store::{LocalPreferenceStore, RealtimeDbProfileStore};
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let data_dir = config.data_dir();

    if let Err(e) = logging::init_logging(&data_dir.join("logs")) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!(data_dir = %data_dir.display(), "=== NeonTunes Starting ===");
    match AppConfig::write_default_file() {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "Wrote default config"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not write default config"),
    }
    if !config.firebase.is_configured() {
        tracing::info!("Firebase is not configured, cloud sync is disabled");
    }
    if config.catalog.api_keys.is_empty() {
        tracing::warn!("No catalog API keys configured, search and trending will be empty");
    }

    let local = LocalPreferenceStore::open(data_dir.join("store.json"));
    let catalog = Arc::new(YouTubeCatalog::new(
        config.catalog.base_url.clone(),
        config.catalog.api_keys.clone(),
    ));
    let remote = Arc::new(RealtimeDbProfileStore::new(config.firebase.database_url.clone()));
    let identity = Arc::new(FirebaseIdentity::new(config.firebase.clone(), local.clone()));
    identity.restore().await;
    identity.clone().spawn_refresher();

    let model = Arc::new(AppModel::default());
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let services = Services {
        catalog,
        local,
        remote,
        identity,
    };
    let controller = AppController::new(model.clone(), services, config.clone(), transport_tx.clone());

    controller.load_from_storage();
    let identity_listener = controller.register_identity_listener();

    // The surface starts without a player; mpv is attached once it is up.
    let (player_tx, player_rx) = mpsc::unbounded_channel::<Arc<dyn Player>>();
    let surface = PlaybackSurface::new(controller.clone());
    let surface_task = tokio::spawn(surface.run(transport_rx, player_rx));
    spawn_player(model.clone(), config.clone(), data_dir.join("mpv.sock"), player_tx);

    let media_controls = playback::spawn_media_controls(
        model.clone(),
        transport_tx,
        f64::from(config.player.seek_step_secs),
    );

    let controller_for_init = controller.clone();
    tokio::spawn(async move {
        controller_for_init.load_trending().await;
        controller_for_init.refresh_language_suggestions().await;
    });

    let device_name = device_name();

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model.clone(), controller, &device_name).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    // Make sure background loops see the quit even after a terminal error.
    model.dispatch(Action::Quit);
    identity_listener.unregister();
    if let Err(e) = surface_task.await {
        tracing::warn!(error = %e, "Playback surface task failed");
    }
    if let Some(thread) = media_controls {
        let _ = thread.join();
    }

    tracing::info!("NeonTunes shutting down");
    Ok(())
}

/// Start mpv in the background and hand it to the playback surface.
#[cfg(unix)]
fn spawn_player(
    model: Arc<AppModel>,
    config: Arc<AppConfig>,
    socket_path: std::path::PathBuf,
    players: mpsc::UnboundedSender<Arc<dyn Player>>,
) {
    tokio::spawn(async move {
        let player = &config.player;
        match playback::MpvPlayer::spawn(&player.mpv_path, &socket_path, player.volume).await {
            Ok(mpv) => {
                let _ = players.send(Arc::new(mpv));
            }
            Err(e) => {
                tracing::error!(error = %e, mpv_path = %player.mpv_path, "Player init failed");
                model.dispatch(Action::ShowError(format!(
                    "Could not start mpv ({}). Install mpv or set player.mpv_path in config.toml.",
                    e
                )));
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_player(
    model: Arc<AppModel>,
    _config: Arc<AppConfig>,
    _socket_path: std::path::PathBuf,
    _players: mpsc::UnboundedSender<Arc<dyn Player>>,
) {
    tracing::warn!("No player backend on this platform");
    model.dispatch(Action::ShowNotice("Playback is not supported on this platform".to_string()));
}

fn device_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "this device".to_string())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
    device_name: &str,
) -> io::Result<()> {
    loop {
        model.dispatch(Action::ClearExpiredNotice);
        let state = model.snapshot();

        terminal.draw(|f| {
            AppView::render(f, &state, device_name);
        })?;

        if state.should_quit {
            break;
        }

        // Short poll keeps the progress bar moving
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key).await;
            }
        }
    }

    Ok(())
}
