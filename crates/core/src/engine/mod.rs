//! Chess engine integration
//!
//! Drives UCI-compatible engines, i.e. Stockfish.

pub mod analysis;
pub mod stockfish;

// Re-export main types for convenience
pub use analysis::{Evaluation, SearchResult};
pub use stockfish::StockfishSession;
