//! Quick manual test for the engine session
//!
//! Usage: engine_probe [stockfish-path] [depth] [fen]

use chess_play_core::{Result, SearchResult, StockfishSession};

fn run_search(session: &mut StockfishSession, fen: Option<&str>, depth: u8) -> Result<SearchResult> {
    session.new_game()?;
    session.set_position(fen, None)?;
    session.go_depth(depth)
}

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "stockfish".to_string());
    let depth: u8 = args
        .next()
        .and_then(|d| d.parse().ok())
        .unwrap_or(12);
    let fen = args.next();

    println!("Starting engine: {}", path);

    let mut session = match StockfishSession::new(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to start engine: {}", e);
            std::process::exit(1);
        }
    };

    match fen.as_deref() {
        Some(f) => println!("Searching fen '{}' to depth {}...\n", f, depth),
        None => println!("Searching the starting position to depth {}...\n", depth),
    }

    match run_search(&mut session, fen.as_deref(), depth) {
        Ok(search) => {
            println!("{}", search.summary());
            println!("Nodes: {} in {} ms", search.nodes, search.time_ms);
            if let Some(ponder) = &search.ponder {
                println!("Ponder: {}", ponder);
            }
        }
        Err(e) => {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        }
    }
}
