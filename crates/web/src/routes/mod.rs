use askama::Template;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tracing::{info, warn};

use chess_play_core::{GameSnapshot, GameStore, SearchResult};

use crate::AppState;

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub fen: String,
    pub status: String,
    pub transcript: String,
    pub opponent: String,
    pub depth: u8,
    pub started: String,
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    /// Promotion piece; the board defaults to queen when omitted.
    pub promotion: Option<char>,
}

#[derive(Serialize)]
pub struct MoveResponse {
    pub legal: bool,
    pub snapshot: GameSnapshot,
    pub reply: Option<ReplyInfo>,
}

/// The opponent's answer to a player move
#[derive(Serialize)]
pub struct ReplyInfo {
    pub san: String,
    pub eval: Option<String>,
    pub depth: Option<u8>,
    /// "stockfish" or "random"
    pub source: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.store.lock().unwrap().snapshot();
    let has_engine = state.engine.lock().unwrap().is_some();

    let template = IndexTemplate {
        title: "Chess Play".to_string(),
        fen: snap.fen.clone(),
        status: snap.status_line(),
        transcript: snap.pgn_wrapped.clone(),
        opponent: if has_engine {
            "Stockfish".to_string()
        } else {
            "Random mover".to_string()
        },
        depth: state.config.depth,
        started: state.started_at.format("%Y-%m-%d %H:%M").to_string(),
    };
    Html(template.render().unwrap())
}

pub async fn play_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MoveRequest>,
) -> Json<MoveResponse> {
    // The store lock is only held while moves are applied, never across
    // the search, so snapshot reads and the event stream stay live while
    // the engine thinks.
    let fen = {
        let mut store = state.store.lock().unwrap();

        match store.play_move(&req.from, &req.to, req.promotion) {
            Ok(san) => info!("player played {}", san),
            Err(e) => {
                info!("rejected {}-{}: {}", req.from, req.to, e);
                return Json(MoveResponse {
                    legal: false,
                    snapshot: store.snapshot(),
                    reply: None,
                });
            }
        }

        let snap = store.snapshot();
        if snap.is_game_over {
            return Json(MoveResponse {
                legal: true,
                snapshot: snap,
                reply: None,
            });
        }
        snap.fen
    };

    let searched = tokio::task::block_in_place(|| search_reply(&state, &fen));

    let mut store = state.store.lock().unwrap();
    let reply = apply_reply(&mut store, searched);
    Json(MoveResponse {
        legal: true,
        snapshot: store.snapshot(),
        reply,
    })
}

pub async fn new_game(State(state): State<Arc<AppState>>) -> Json<GameSnapshot> {
    state.store.lock().unwrap().reset();
    info!("new game");

    if let Some(session) = state.engine.lock().unwrap().as_mut() {
        if let Err(e) = session.new_game() {
            warn!("ucinewgame failed: {}", e);
        }
    }

    Json(state.store.lock().unwrap().snapshot())
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<GameSnapshot> {
    Json(state.store.lock().unwrap().snapshot())
}

/// Pushes every snapshot the store publishes to the browser as a
/// server-sent event, starting with the current one.
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.store.lock().unwrap().subscribe();

    let stream = WatchStream::new(rx).map(|snap| {
        Ok(Event::default()
            .event("snapshot")
            .json_data(&snap)
            .unwrap_or_default())
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn health() -> &'static str {
    "OK"
}

/// Searches `fen` with the engine. None when the engine is missing or
/// errors out.
fn search_reply(state: &AppState, fen: &str) -> Option<SearchResult> {
    let mut engine = state.engine.lock().unwrap();
    let session = engine.as_mut()?;

    let searched = session
        .set_position(Some(fen), None)
        .and_then(|_| session.go_depth(state.config.depth));

    match searched {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("engine search failed: {}", e);
            None
        }
    }
}

/// Plays the searched move on the store, falling back to a random
/// legal move when there is no result or the move no longer applies.
fn apply_reply(store: &mut GameStore, searched: Option<SearchResult>) -> Option<ReplyInfo> {
    if let Some(result) = searched {
        match store.play_uci(&result.best_move) {
            Ok(san) => {
                info!("stockfish replied {} ({})", san, result.summary());
                return Some(ReplyInfo {
                    san,
                    eval: Some(result.evaluation.to_string()),
                    depth: Some(result.depth),
                    source: "stockfish".to_string(),
                });
            }
            Err(e) => warn!("engine move '{}' rejected: {}", result.best_move, e),
        }
    }

    match store.play_random() {
        Ok(san) => {
            info!("random reply {}", san);
            Some(ReplyInfo {
                san,
                eval: None,
                depth: None,
                source: "random".to_string(),
            })
        }
        Err(e) => {
            warn!("no reply possible: {}", e);
            None
        }
    }
}
