//! Error types for chess-play-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Invalid FEN: {0}")]
    Fen(String),

    #[error("Invalid SAN: {0}")]
    San(String),

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
