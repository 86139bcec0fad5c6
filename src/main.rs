//! makin-music-backend binary entry point

use makin_music_backend::{AppState, api, config};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load `.env` and configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Build the route table
/// 4. Initialize AppState
/// 5. Start the session sweep task
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in production
    let _ = dotenv::dotenv();

    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let default_filter = format!("makin_music_backend={},tower_http=debug", config.logging.level);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.clone().into())
    };

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting makin-music-backend...");
    tracing::info!(
        bind = %config.bind_addr(),
        static_dir = %config.server.static_dir.display(),
        "Configuration loaded"
    );
    if !config.session.secure {
        tracing::warn!("Using insecure session cookies; only suitable for local development");
    }

    makin_music_backend::metrics::init_metrics();

    // 3. Build route table; a slug collision aborts startup
    let routes = api::RouteTable::build(api::routes::modules())?;
    tracing::info!(
        mounts = ?routes.paths().collect::<Vec<_>>(),
        "Route modules registered"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone())?;

    // 5. Start background tasks
    spawn_session_sweep_task(&state);

    let app = makin_music_backend::build_router(state, &routes);

    // 6. Start HTTP server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background task that evicts expired sessions
fn spawn_session_sweep_task(state: &AppState) {
    let sessions = Arc::clone(&state.sessions);
    let period = state.config.session.check_period();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; nothing has expired yet.
        interval.tick().await;

        loop {
            interval.tick().await;
            sessions.sweep().await;
            makin_music_backend::metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
            tracing::debug!(sessions = sessions.len(), "Session sweep completed");
        }
    });

    tracing::info!(period_seconds = period.as_secs(), "Session sweep task spawned");
}
