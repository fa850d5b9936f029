//! Game-state store
//!
//! Owns the mutable shakmaty position and the SAN move history. After every
//! mutation the store rebuilds a [`GameSnapshot`] and publishes it on a
//! watch channel, so the UI always sees a consistent immutable view.

use shakmaty::{
    fen::Fen, san::SanPlus, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, File, Move,
    Position, Role, Square,
};
use rand::seq::IndexedRandom;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::pgn;

use super::snapshot::GameSnapshot;

/// Column width for the wrapped transcript shown in the side panel.
const TRANSCRIPT_WIDTH: usize = 5;

pub struct GameStore {
    position: Chess,
    history: Vec<String>,
    /// One key per position reached, including the current one.
    /// Used for threefold-repetition detection, which shakmaty
    /// does not track on its own.
    repetition_keys: Vec<String>,
    /// Fullmove number and side to move of the position the game
    /// started from, for movetext numbering after `load_fen`.
    start_fullmoves: u32,
    start_turn: Color,
    snapshot_tx: watch::Sender<GameSnapshot>,
}

impl GameStore {
    /// Creates a store holding the standard starting position.
    pub fn new() -> Self {
        let position = Chess::default();
        let history = Vec::new();
        let repetition_keys = vec![repetition_key(&position)];
        let snapshot = build_snapshot(&position, &history, &repetition_keys, 1, Color::White);
        let (snapshot_tx, _) = watch::channel(snapshot);
        GameStore {
            position,
            history,
            repetition_keys,
            start_fullmoves: 1,
            start_turn: Color::White,
            snapshot_tx,
        }
    }

    /// Current immutable view of the game.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to snapshot updates. The receiver yields the snapshot
    /// published by the most recent mutation.
    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Returns the game to the standard starting position.
    pub fn reset(&mut self) {
        self.position = Chess::default();
        self.history.clear();
        self.repetition_keys = vec![repetition_key(&self.position)];
        self.start_fullmoves = 1;
        self.start_turn = Color::White;
        self.publish();
    }

    /// Replaces the game with the position described by `fen`.
    /// The move history is cleared.
    pub fn load_fen(&mut self, fen: &str) -> Result<()> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))?;

        self.start_fullmoves = position.fullmoves().get();
        self.start_turn = position.turn();
        self.history.clear();
        self.repetition_keys = vec![repetition_key(&position)];
        self.position = position;
        self.publish();
        Ok(())
    }

    /// Replaces the game with the first game found in `text` (PGN).
    pub fn load_pgn(&mut self, text: &str) -> Result<()> {
        let moves = pgn::parse_moves(text)?;

        let mut position = Chess::default();
        let mut history = Vec::with_capacity(moves.len());
        let mut keys = vec![repetition_key(&position)];

        for san_str in &moves {
            let san: SanPlus = san_str
                .parse()
                .map_err(|e| Error::San(format!("{}: {}", san_str, e)))?;
            let mv = san
                .san
                .to_move(&position)
                .map_err(|e| Error::IllegalMove(format!("{}: {}", san_str, e)))?;
            history.push(SanPlus::from_move_and_play_unchecked(&mut position, mv).to_string());
            keys.push(repetition_key(&position));
        }

        self.position = position;
        self.history = history;
        self.repetition_keys = keys;
        self.start_fullmoves = 1;
        self.start_turn = Color::White;
        self.publish();
        Ok(())
    }

    /// Plays a move given as source and target squares, the way the board
    /// UI reports a drag or click. Castling is entered as the king's two
    /// square hop (e.g. e1 to g1). A pawn reaching the last rank promotes
    /// to the given piece, defaulting to a queen.
    ///
    /// Returns the SAN of the move as played.
    pub fn play_move(&mut self, from: &str, to: &str, promotion: Option<char>) -> Result<String> {
        let from: Square = from
            .parse()
            .map_err(|_| Error::IllegalMove(format!("bad square '{}'", from)))?;
        let to: Square = to
            .parse()
            .map_err(|_| Error::IllegalMove(format!("bad square '{}'", to)))?;
        let promo = match promotion {
            None => None,
            Some(c) => match Role::from_char(c) {
                Some(role) if role != Role::Pawn && role != Role::King => Some(role),
                _ => {
                    return Err(Error::IllegalMove(format!("bad promotion piece '{}'", c)));
                }
            },
        };

        let mv = self
            .position
            .legal_moves()
            .into_iter()
            .find(|m| matches_squares(m, from, to, promo))
            .ok_or_else(|| Error::IllegalMove(format!("{}{}", from, to)))?;

        Ok(self.apply(mv))
    }

    /// Plays a move in UCI notation (e.g. "e2e4", "a7a8q").
    pub fn play_uci(&mut self, uci: &str) -> Result<String> {
        let parsed: UciMove = uci
            .parse()
            .map_err(|e| Error::IllegalMove(format!("{}: {}", uci, e)))?;
        let mv = parsed
            .to_move(&self.position)
            .map_err(|e| Error::IllegalMove(format!("{}: {}", uci, e)))?;
        Ok(self.apply(mv))
    }

    /// Plays a move in SAN notation (e.g. "Nf3"). Check and mate
    /// suffixes are accepted and ignored.
    pub fn play_san(&mut self, san: &str) -> Result<String> {
        let parsed: SanPlus = san
            .parse()
            .map_err(|e| Error::San(format!("{}: {}", san, e)))?;
        let mv = parsed
            .san
            .to_move(&self.position)
            .map_err(|e| Error::IllegalMove(format!("{}: {}", san, e)))?;
        Ok(self.apply(mv))
    }

    /// Plays a uniformly random legal move. Used as the opponent when no
    /// engine is available.
    pub fn play_random(&mut self) -> Result<String> {
        let moves = self.position.legal_moves();
        let mv = moves
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| Error::IllegalMove("no legal moves".to_string()))?;
        Ok(self.apply(mv))
    }

    /// Applies a move known to be legal, records it and publishes the
    /// new snapshot.
    fn apply(&mut self, mv: Move) -> String {
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, mv).to_string();
        self.history.push(san.clone());
        self.repetition_keys.push(repetition_key(&self.position));
        self.publish();
        san
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(build_snapshot(
            &self.position,
            &self.history,
            &self.repetition_keys,
            self.start_fullmoves,
            self.start_turn,
        ));
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Position key for repetition counting: the first four FEN fields
/// (board, side to move, castling rights, en-passant square). With
/// `EnPassantMode::Legal` the ep square is only present when an
/// en-passant capture is actually playable, matching the FIDE rule.
fn repetition_key(position: &Chess) -> String {
    let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn matches_squares(mv: &Move, from: Square, to: Square, promo: Option<Role>) -> bool {
    match mv {
        // Shakmaty encodes castling as king-takes-rook; the UI sends the
        // king's destination square instead. Accept either form.
        Move::Castle { king, rook } => {
            *king == from && (king_castle_target(*king, *rook) == to || *rook == to)
        }
        _ => {
            mv.from() == Some(from)
                && mv.to() == to
                && match mv.promotion() {
                    None => true,
                    Some(role) => role == promo.unwrap_or(Role::Queen),
                }
        }
    }
}

fn king_castle_target(king: Square, rook: Square) -> Square {
    let file = if rook.file() > king.file() {
        File::G
    } else {
        File::C
    };
    Square::from_coords(file, king.rank())
}

fn build_snapshot(
    position: &Chess,
    history: &[String],
    repetition_keys: &[String],
    start_fullmoves: u32,
    start_turn: Color,
) -> GameSnapshot {
    let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();

    let current_key = repetition_keys.last();
    let is_threefold_repetition = match current_key {
        Some(key) => repetition_keys.iter().filter(|k| *k == key).count() >= 3,
        None => false,
    };

    let is_checkmate = position.is_checkmate();
    let is_stalemate = position.is_stalemate();
    let is_insufficient_material = position.is_insufficient_material();
    let is_draw = position.halfmoves() >= 100
        || is_stalemate
        || is_insufficient_material
        || is_threefold_repetition;

    let legal_moves = position
        .legal_moves()
        .into_iter()
        .map(|m| {
            let mut after = position.clone();
            SanPlus::from_move_and_play_unchecked(&mut after, m).to_string()
        })
        .collect();

    GameSnapshot {
        fen,
        history: history.to_vec(),
        turn: match position.turn() {
            Color::White => 'w',
            Color::Black => 'b',
        },
        move_number: position.fullmoves().get(),
        legal_moves,
        in_check: position.is_check(),
        is_checkmate,
        is_stalemate,
        is_insufficient_material,
        is_threefold_repetition,
        is_draw,
        is_game_over: is_checkmate || is_draw,
        pgn: pgn::render_movetext(history, start_fullmoves, start_turn),
        pgn_wrapped: pgn::render_movetext_wrapped(
            history,
            start_fullmoves,
            start_turn,
            TRANSCRIPT_WIDTH,
            "\n",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn play_all(store: &mut GameStore, sans: &[&str]) {
        for san in sans {
            store.play_san(san).unwrap();
        }
    }

    #[test]
    fn starting_snapshot() {
        let store = GameStore::new();
        let snap = store.snapshot();

        assert_eq!(snap.fen, START_FEN);
        assert_eq!(snap.turn, 'w');
        assert_eq!(snap.move_number, 1);
        assert_eq!(snap.legal_moves.len(), 20);
        assert!(snap.history.is_empty());
        assert!(!snap.is_game_over);
        assert_eq!(snap.pgn, "");
    }

    #[test]
    fn move_updates_snapshot() {
        let mut store = GameStore::new();
        let san = store.play_move("e2", "e4", None).unwrap();
        assert_eq!(san, "e4");

        let snap = store.snapshot();
        assert_eq!(snap.history, vec!["e4".to_string()]);
        assert_eq!(snap.turn, 'b');
        assert!(snap.fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert_eq!(snap.pgn, "1. e4");
    }

    #[test]
    fn illegal_move_leaves_store_untouched() {
        let mut store = GameStore::new();
        let before = store.snapshot();

        let err = store.play_move("e2", "e5", None).unwrap_err();
        assert!(matches!(err, Error::IllegalMove(_)));

        let after = store.snapshot();
        assert_eq!(after.fen, before.fen);
        assert!(after.history.is_empty());
    }

    #[test]
    fn bad_square_and_bad_promotion_are_rejected() {
        let mut store = GameStore::new();
        assert!(store.play_move("e9", "e4", None).is_err());
        assert!(store.play_move("e2", "e4", Some('k')).is_err());
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut store = GameStore::new();
        store.load_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();

        let san = store.play_move("a7", "a8", None).unwrap();
        assert_eq!(san, "a8=Q");
    }

    #[test]
    fn underpromotion_is_honored() {
        let mut store = GameStore::new();
        store.load_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();

        let san = store.play_move("a7", "a8", Some('n')).unwrap();
        assert_eq!(san, "a8=N");
    }

    #[test]
    fn castling_by_king_destination() {
        let mut store = GameStore::new();
        play_all(&mut store, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]);

        let san = store.play_move("e1", "g1", None).unwrap();
        assert_eq!(san, "O-O");
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut store = GameStore::new();
        play_all(&mut store, &["f3", "e5", "g4", "Qh4#"]);

        let snap = store.snapshot();
        assert!(snap.is_checkmate);
        assert!(snap.is_game_over);
        assert!(snap.in_check);
        assert!(snap.legal_moves.is_empty());
        assert_eq!(snap.status_line(), "Checkmate - Black wins");
    }

    #[test]
    fn stalemate_is_a_draw() {
        let mut store = GameStore::new();
        store
            .load_fen("8/8/8/8/8/5k2/5p2/5K2 w - - 0 1")
            .unwrap();

        let snap = store.snapshot();
        assert!(snap.is_stalemate);
        assert!(snap.is_draw);
        assert!(snap.is_game_over);
        assert!(!snap.in_check);
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let mut store = GameStore::new();
        store.load_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();

        let snap = store.snapshot();
        assert!(snap.is_insufficient_material);
        assert!(snap.is_draw);
    }

    #[test]
    fn fifty_move_clock_is_a_draw() {
        let mut store = GameStore::new();
        store
            .load_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 100 60")
            .unwrap();

        let snap = store.snapshot();
        assert!(snap.is_draw);
        assert!(!snap.is_insufficient_material);
    }

    #[test]
    fn threefold_repetition_detected() {
        let mut store = GameStore::new();
        play_all(
            &mut store,
            &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"],
        );

        let snap = store.snapshot();
        assert!(snap.is_threefold_repetition);
        assert!(snap.is_draw);
        assert!(snap.is_game_over);
    }

    #[test]
    fn two_occurrences_are_not_threefold() {
        let mut store = GameStore::new();
        play_all(&mut store, &["Nf3", "Nf6", "Ng1", "Ng8"]);
        assert!(!store.snapshot().is_threefold_repetition);
    }

    #[test]
    fn play_uci_applies_promotions() {
        let mut store = GameStore::new();
        store.load_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();

        let san = store.play_uci("a7a8q").unwrap();
        assert_eq!(san, "a8=Q");
    }

    #[test]
    fn play_uci_rejects_illegal_input() {
        let mut store = GameStore::new();
        assert!(store.play_uci("e2e5").is_err());
        assert!(store.play_uci("not a move").is_err());
    }

    #[test]
    fn play_random_picks_a_legal_move() {
        let mut store = GameStore::new();
        let san = store.play_random().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.history, vec![san]);
        assert_eq!(snap.turn, 'b');
    }

    #[test]
    fn play_random_fails_without_legal_moves() {
        let mut store = GameStore::new();
        store
            .load_fen("8/8/8/8/8/5k2/5p2/5K2 w - - 0 1")
            .unwrap();
        assert!(store.play_random().is_err());
    }

    #[test]
    fn reset_returns_to_start() {
        let mut store = GameStore::new();
        play_all(&mut store, &["e4", "e5"]);
        store.reset();

        let snap = store.snapshot();
        assert_eq!(snap.fen, START_FEN);
        assert!(snap.history.is_empty());
    }

    #[test]
    fn load_fen_rejects_garbage() {
        let mut store = GameStore::new();
        let err = store.load_fen("this is not a fen").unwrap_err();
        assert!(matches!(err, Error::Fen(_)));
    }

    #[test]
    fn movetext_numbering_after_black_to_move_fen() {
        let mut store = GameStore::new();
        store
            .load_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
            .unwrap();
        store.play_san("e5").unwrap();

        assert_eq!(store.snapshot().pgn, "1... e5");
    }

    #[test]
    fn load_pgn_replays_the_game() {
        let mut store = GameStore::new();
        store
            .load_pgn(
                "[Event \"Test\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0\n",
            )
            .unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.history.len(), 5);
        assert_eq!(snap.turn, 'b');
        assert_eq!(snap.move_number, 3);
        assert_eq!(snap.pgn, "1. e4 e5 2. Nf3 Nc6 3. Bb5");
    }

    #[tokio::test]
    async fn subscribers_see_every_mutation() {
        let mut store = GameStore::new();
        let mut rx = store.subscribe();

        store.play_san("e4").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().history, vec!["e4".to_string()]);

        store.reset();
        rx.changed().await.unwrap();
        assert!(rx.borrow().history.is_empty());
    }
}
