mod handlers;
mod templates;
mod types;
pub mod assets;
pub mod background;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod queue;
pub mod session;
pub mod validation;

pub use types::{AppState, SharedState};

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::catalogue::Probe;
use self::config::JukeboxConfig;
use self::error::JukeboxResult;
use self::session::{MemorySessionStore, SessionStore, cleanup_stale_sessions};
use handlers::{
    add_to_queue, direct_play, get_background_folders, get_queue, next_song, player_page,
    playlist, score, serve_background, serve_video, set_background_folder, settings,
    setup_video_dir, setup_video_dir_page,
};

/// Builds the shared state: probes videos with ffprobe and starts with an empty
/// in-memory session store.
pub fn init_jukebox_state(config: JukeboxConfig) -> SharedState {
    let probe = Probe::ffprobe(&config.ffprobe_program, config.probe_timeout);
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    Arc::new(AppState::new(config, probe, sessions))
}

/// Creates the Axum router with every jukebox route.
pub fn create_jukebox_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(player_page).post(direct_play)) // Player, direct play
        .route("/playlist", get(playlist))
        .route("/add_to_queue", post(add_to_queue))
        .route("/get_queue", get(get_queue))
        .route("/next_song", get(next_song))
        .route("/get_background_folders", get(get_background_folders))
        .route("/set_background_folder", post(set_background_folder))
        .route("/score", get(score))
        .route("/settings", get(settings))
        .route("/setup_video_dir", get(setup_video_dir_page).post(setup_video_dir))
        .route("/video/{*path}", get(serve_video))
        .route("/background/{*path}", get(serve_background))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves the jukebox until Ctrl+C.
pub async fn initialize(config: JukeboxConfig) -> JukeboxResult<()> {
    tracing::info!("Starting karaoke jukebox");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    match local_ip_address::local_ip() {
        Ok(ip) => tracing::info!("✓ Jukebox listening on http://{}:{}", ip, addr.port()),
        Err(e) => {
            tracing::warn!("Could not detect the LAN address: {}", e);
            tracing::info!("✓ Jukebox listening on http://{}", addr);
        }
    }

    let state = init_jukebox_state(config);
    tracing::info!(
        "Videos from {}, backgrounds from {}",
        state.video_dir().display(),
        state.config.background_dir.display()
    );

    // Task for dropping idle sessions
    tokio::spawn(cleanup_stale_sessions(
        state.sessions.clone(),
        state.config.session_ttl,
    ));

    let router = create_jukebox_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Jukebox stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Graceful shutdown signal received");
}
