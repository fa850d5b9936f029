//! Immutable projection of the game state

use serde::Serialize;

/// Read-only view of the game, rebuilt after every mutation of the store.
///
/// All fields are plain values so the snapshot can be cloned cheaply,
/// serialized for the browser, and held by subscribers without touching
/// the live position.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    /// Current position in Forsyth-Edwards Notation
    pub fen: String,
    /// Moves played so far, in SAN
    pub history: Vec<String>,
    /// Side to move: 'w' or 'b'
    pub turn: char,
    /// Fullmove number of the side to move
    pub move_number: u32,
    /// Legal moves from the current position, in SAN
    pub legal_moves: Vec<String>,
    pub in_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_insufficient_material: bool,
    pub is_threefold_repetition: bool,
    /// Fifty-move rule, stalemate, insufficient material or threefold
    pub is_draw: bool,
    /// Checkmate or any draw
    pub is_game_over: bool,
    /// Movetext on a single line, e.g. "1. e4 e5 2. Nf3"
    pub pgn: String,
    /// Movetext wrapped for the transcript panel
    pub pgn_wrapped: String,
}

impl GameSnapshot {
    /// One-line status for logs and the UI status bar.
    pub fn status_line(&self) -> String {
        if self.is_checkmate {
            let winner = if self.turn == 'w' { "Black" } else { "White" };
            return format!("Checkmate - {} wins", winner);
        }
        if self.is_stalemate {
            return "Draw by stalemate".to_string();
        }
        if self.is_threefold_repetition {
            return "Draw by threefold repetition".to_string();
        }
        if self.is_insufficient_material {
            return "Draw by insufficient material".to_string();
        }
        if self.is_draw {
            return "Draw by fifty-move rule".to_string();
        }
        let side = if self.turn == 'w' { "White" } else { "Black" };
        if self.in_check {
            format!("{} to move (in check)", side)
        } else {
            format!("{} to move", side)
        }
    }
}
