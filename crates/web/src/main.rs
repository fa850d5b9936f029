use axum::{
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use chess_play_core::{GameStore, StockfishSession};

mod config;
mod routes;

use config::ServerConfig;

pub struct AppState {
    pub store: Mutex<GameStore>,
    /// None when no stockfish binary could be started; the server then
    /// answers with random replies instead.
    pub engine: Mutex<Option<StockfishSession>>,
    pub config: ServerConfig,
    pub started_at: chrono::DateTime<chrono::Local>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    let engine = match StockfishSession::new(&config.stockfish_path) {
        Ok(mut session) => {
            if let Some(level) = config.skill_level {
                if let Err(e) = session.set_skill_level(level) {
                    warn!("failed to set skill level {}: {}", level, e);
                }
            }
            info!("stockfish ready ('{}')", config.stockfish_path);
            Some(session)
        }
        Err(e) => {
            warn!("{}; falling back to random replies", e);
            None
        }
    };

    let state = Arc::new(AppState {
        store: Mutex::new(GameStore::new()),
        engine: Mutex::new(engine),
        config: config.clone(),
        started_at: chrono::Local::now(),
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/api/move", post(routes::play_move))
        .route("/api/new", post(routes::new_game))
        .route("/api/snapshot", get(routes::snapshot))
        .route("/api/events", get(routes::events))
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new("crates/web/static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind server address");

    info!("server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await.unwrap();
}
