//! Types for representing engine search results

use serde::Serialize;
use std::fmt;

/// Engine evaluation of a position, from the side to move's point of view
/// as UCI reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Evaluation {
    /// Centipawn score
    Centipawns(i32),
    /// Forced mate in the given number of moves (negative when the
    /// engine is getting mated)
    Mate(i32),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// Outcome of a `go depth` search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Best move in UCI notation (e.g. "e2e4")
    pub best_move: String,
    /// Move the engine would ponder on, when reported
    pub ponder: Option<String>,
    /// Evaluation from the deepest info line seen
    pub evaluation: Evaluation,
    /// Depth reached
    pub depth: u8,
    /// Principal variation (best line of play)
    pub pv: Vec<String>,
    /// Nodes searched
    pub nodes: u64,
    /// Time spent searching (milliseconds)
    pub time_ms: u64,
}

impl SearchResult {
    pub(crate) fn empty() -> Self {
        SearchResult {
            best_move: String::new(),
            ponder: None,
            evaluation: Evaluation::Centipawns(0),
            depth: 0,
            pv: Vec::new(),
            nodes: 0,
            time_ms: 0,
        }
    }

    /// Returns a brief summary of the search
    pub fn summary(&self) -> String {
        format!(
            "Eval: {} | Best: {} | Depth: {} | PV: {}",
            self.evaluation,
            self.best_move,
            self.depth,
            self.pv.iter().take(5).cloned().collect::<Vec<_>>().join(" ")
        )
    }
}
