//! Chess Play Core Library
//!
//! Rules handling is delegated to shakmaty and move search to an external
//! Stockfish binary. This crate is the layer in between: a game store that
//! mirrors the mutable position into an immutable snapshot for the UI, and
//! a session that drives the engine over the UCI text protocol.

pub mod engine;
pub mod error;
pub mod game;
pub mod pgn;

pub use engine::{Evaluation, SearchResult, StockfishSession};
pub use error::{Error, Result};
pub use game::{GameSnapshot, GameStore};
