//! Server configuration from environment variables

/// Default search depth, matching the original UI's engine hook.
const DEFAULT_DEPTH: u8 = 8;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Path to the stockfish binary (or just "stockfish" if on PATH)
    pub stockfish_path: String,
    /// Search depth for engine replies
    pub depth: u8,
    /// Optional "Skill Level" to throttle the engine (0..=20)
    pub skill_level: Option<u8>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        ServerConfig {
            bind_addr: std::env::var("CHESS_PLAY_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            stockfish_path: std::env::var("STOCKFISH_PATH")
                .unwrap_or_else(|_| "stockfish".to_string()),
            depth: std::env::var("CHESS_PLAY_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DEPTH),
            skill_level: std::env::var("CHESS_PLAY_SKILL")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}
