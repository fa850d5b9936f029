//! PGN parsing and movetext rendering
//!
//! Parsing goes through pgn-reader's streaming visitor; the SAN tokens are
//! replayed against a shakmaty position so broken games are rejected
//! instead of half-loaded. Rendering turns a SAN history back into
//! numbered movetext for the transcript panel.

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Color, Position};
use std::io::Cursor;
use std::ops::ControlFlow;

use crate::error::{Error, Result};

struct Movetext {
    moves: Vec<String>,
    position: Chess,
    success: bool,
}

struct MovesParser;

impl Visitor for MovesParser {
    type Tags = ();
    type Movetext = Movetext;
    type Output = Option<Vec<String>>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _tags: &mut Self::Tags,
        _name: &[u8],
        _value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(Movetext {
            moves: Vec::new(),
            position: Chess::default(),
            success: true,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if !movetext.success {
            return ControlFlow::Continue(());
        }

        movetext.moves.push(san.san.to_string());

        match san.san.to_move(&movetext.position) {
            Ok(m) => match movetext.position.clone().play(m) {
                Ok(new_pos) => {
                    movetext.position = new_pos;
                }
                Err(_) => {
                    movetext.success = false;
                }
            },
            Err(_) => {
                movetext.success = false;
            }
        }

        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if movetext.success {
            Some(movetext.moves)
        } else {
            None
        }
    }
}

/// Extracts the SAN move list of the first valid game in `text`.
pub fn parse_moves(text: &str) -> Result<Vec<String>> {
    let mut parser = MovesParser;
    let cursor = Cursor::new(text.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(Some(moves))) => return Ok(moves),
            // Broken game, try the next one.
            Ok(Some(None)) => continue,
            Ok(None) => return Err(Error::Pgn("no valid games found".to_string())),
            Err(e) => return Err(Error::Pgn(e.to_string())),
        }
    }
}

/// Renders a SAN history as numbered movetext on one line, e.g.
/// "1. e4 e5 2. Nf3". Games starting from a position with black to
/// move open with an ellipsis: "3... Rd8 4. Qc2".
pub fn render_movetext(history: &[String], start_fullmoves: u32, start_turn: Color) -> String {
    movetext_tokens(history, start_fullmoves, start_turn).join(" ")
}

/// Renders movetext wrapped so no line exceeds `max_width` columns,
/// joined by `newline`. Tokens are never split; a token wider than the
/// limit gets a line of its own.
pub fn render_movetext_wrapped(
    history: &[String],
    start_fullmoves: u32,
    start_turn: Color,
    max_width: usize,
    newline: &str,
) -> String {
    let tokens = movetext_tokens(history, start_fullmoves, start_turn);
    let mut lines: Vec<String> = Vec::new();

    for token in tokens {
        match lines.last_mut() {
            Some(line) if line.len() + 1 + token.len() <= max_width => {
                line.push(' ');
                line.push_str(&token);
            }
            _ => lines.push(token),
        }
    }

    lines.join(newline)
}

fn movetext_tokens(history: &[String], start_fullmoves: u32, start_turn: Color) -> Vec<String> {
    let mut tokens = Vec::with_capacity(history.len() + history.len() / 2 + 1);
    let mut number = start_fullmoves;
    let mut turn = start_turn;

    for (i, san) in history.iter().enumerate() {
        match turn {
            Color::White => tokens.push(format!("{}.", number)),
            Color::Black if i == 0 => tokens.push(format!("{}...", number)),
            Color::Black => {}
        }
        tokens.push(san.clone());
        if turn == Color::Black {
            number += 1;
        }
        turn = turn.other();
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PGN: &str = r#"[Event "Test"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0
"#;

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn parse_moves_of_first_game() {
        let moves = parse_moves(SAMPLE_PGN).unwrap();
        assert_eq!(moves, sans(&["e4", "e5", "Nf3", "Nc6", "Bb5"]));
    }

    #[test]
    fn variations_are_skipped() {
        let text = "1. e4 e5 (1... c5 2. Nf3 d6) 2. Nf3 1-0\n";
        let moves = parse_moves(text).unwrap();
        assert_eq!(moves, sans(&["e4", "e5", "Nf3"]));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_moves("").is_err());
    }

    #[test]
    fn broken_movetext_is_rejected() {
        // Second move is illegal from the start position.
        let text = "[Event \"Bad\"]\n\n1. e4 Ke7 2. d4 1-0\n";
        assert!(parse_moves(text).is_err());
    }

    #[test]
    fn broken_game_is_skipped_in_favor_of_a_valid_one() {
        let text = "[Event \"Bad\"]\n\n1. e4 Ke7 1-0\n\n[Event \"Good\"]\n\n1. d4 d5 1/2-1/2\n";
        let moves = parse_moves(text).unwrap();
        assert_eq!(moves, sans(&["d4", "d5"]));
    }

    #[test]
    fn render_empty_history() {
        assert_eq!(render_movetext(&[], 1, Color::White), "");
    }

    #[test]
    fn render_numbered_movetext() {
        let history = sans(&["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        assert_eq!(
            render_movetext(&history, 1, Color::White),
            "1. e4 e5 2. Nf3 Nc6 3. Bb5"
        );
    }

    #[test]
    fn render_black_first_movetext() {
        let history = sans(&["e5", "Nf3"]);
        assert_eq!(render_movetext(&history, 1, Color::Black), "1... e5 2. Nf3");
    }

    #[test]
    fn wrap_keeps_lines_under_width() {
        let history = sans(&["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        let wrapped = render_movetext_wrapped(&history, 1, Color::White, 5, "\n");

        for line in wrapped.lines() {
            assert!(line.len() <= 5 || !line.contains(' '), "line too wide: {}", line);
        }
        // Same moves, just re-flowed.
        assert_eq!(
            wrapped.replace('\n', " "),
            render_movetext(&history, 1, Color::White)
        );
    }

    #[test]
    fn wrap_with_custom_newline() {
        let history = sans(&["e4", "e5"]);
        let wrapped = render_movetext_wrapped(&history, 1, Color::White, 5, "<br />");
        assert_eq!(wrapped, "1. e4<br />e5");
    }
}
