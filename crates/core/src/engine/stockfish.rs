//! Stockfish engine session
//!
//! Spawns a Stockfish-compatible binary as a subprocess and talks to it
//! over the newline-delimited UCI protocol. One request is in flight at a
//! time: every command that expects an answer blocks on the output stream
//! until the matching line arrives, so responses cannot be mis-paired.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use crate::error::{Error, Result};

use super::analysis::{Evaluation, SearchResult};

const MAX_SKILL_LEVEL: u8 = 20;

/// A live UCI session with an engine subprocess
pub struct StockfishSession {
    /// The child process
    process: Child,
    /// Stdin for sending commands
    stdin: ChildStdin,
    /// Stdout reader for receiving responses
    stdout: BufReader<ChildStdout>,
    /// Whether the UCI handshake completed
    initialized: bool,
    /// Whether a `go` was sent without its bestmove collected yet
    searching: bool,
    /// Configured "Skill Level" option, when set
    skill_level: Option<u8>,
}

impl StockfishSession {
    /// Spawns the engine at `path` and performs the UCI handshake
    /// (`uci`/`uciok`, then `isready`/`readyok`).
    pub fn new(path: &str) -> Result<Self> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null()) // Ignore stderr
            .spawn()
            .map_err(|e| Error::Engine(format!("failed to start '{}': {}", path, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Engine("failed to open engine stdin".to_string()))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Engine("failed to open engine stdout".to_string()))?;

        let mut session = StockfishSession {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            initialized: false,
            searching: false,
            skill_level: None,
        };

        session.init_uci()?;

        Ok(session)
    }

    /// Sends a command line to the engine
    fn send(&mut self, cmd: &str) -> Result<()> {
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads one line from the engine. EOF means the process died.
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line)?;
        if n == 0 {
            return Err(Error::Engine("engine closed its output stream".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Buffers output lines until one starts with `expected`
    fn read_until(&mut self, expected: &str) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(expected);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    fn init_uci(&mut self) -> Result<()> {
        self.send("uci")?;
        self.read_until("uciok")?;

        self.send("isready")?;
        self.read_until("readyok")?;

        self.initialized = true;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if self.searching {
            return Err(Error::Engine("a search is already running".to_string()));
        }
        Ok(())
    }

    /// Sets the engine's "Skill Level" option (0..=20).
    pub fn set_skill_level(&mut self, level: u8) -> Result<()> {
        self.ensure_ready()?;
        if level > MAX_SKILL_LEVEL {
            return Err(Error::Engine(format!(
                "skill level {} out of range (0..={})",
                level, MAX_SKILL_LEVEL
            )));
        }

        self.send(&format!("setoption name Skill Level value {}", level))?;
        self.send("isready")?;
        self.read_until("readyok")?;
        self.skill_level = Some(level);
        Ok(())
    }

    pub fn skill_level(&self) -> Option<u8> {
        self.skill_level
    }

    /// Tells the engine a new game is starting and resyncs.
    pub fn new_game(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.read_until("readyok")?;
        Ok(())
    }

    /// Sets the position to search from.
    ///
    /// # Arguments
    /// * `fen` - FEN string, or None for the starting position
    /// * `moves` - Optional moves (UCI) to play from that position
    pub fn set_position(&mut self, fen: Option<&str>, moves: Option<&[String]>) -> Result<()> {
        self.ensure_ready()?;

        let pos_str = match fen {
            Some(f) => format!("position fen {}", f),
            None => "position startpos".to_string(),
        };

        let cmd = match moves {
            Some(m) if !m.is_empty() => format!("{} moves {}", pos_str, m.join(" ")),
            _ => pos_str,
        };

        self.send(&cmd)?;
        Ok(())
    }

    /// Searches the current position to `depth` and blocks until the
    /// engine reports its best move.
    pub fn go_depth(&mut self, depth: u8) -> Result<SearchResult> {
        self.start_search(depth)?;
        self.wait_search()
    }

    /// Sends `go depth` without waiting. Pair with [`wait_search`] or
    /// abort early with [`stop`].
    ///
    /// [`wait_search`]: StockfishSession::wait_search
    /// [`stop`]: StockfishSession::stop
    pub fn start_search(&mut self, depth: u8) -> Result<()> {
        self.ensure_ready()?;
        self.send(&format!("go depth {}", depth))?;
        self.searching = true;
        Ok(())
    }

    /// Collects `info` lines until the pending search reports `bestmove`.
    pub fn wait_search(&mut self) -> Result<SearchResult> {
        if !self.searching {
            return Err(Error::Engine("no search is running".to_string()));
        }

        let mut result = SearchResult::empty();
        loop {
            // A dead stream ends the search; the session must not stay
            // marked as searching or every later command is refused.
            let line = match self.read_line() {
                Ok(line) => line,
                Err(e) => {
                    self.searching = false;
                    return Err(e);
                }
            };

            if line.starts_with("bestmove") {
                self.searching = false;
                let (best, ponder) = parse_bestmove(&line);
                result.ponder = ponder;
                result.best_move = best
                    .ok_or_else(|| Error::Engine("engine returned no best move".to_string()))?;
                return Ok(result);
            }

            if line.starts_with("info") {
                apply_info_line(&line, &mut result);
            }
        }
    }

    /// Aborts a pending search and returns whatever the engine settled on.
    pub fn stop(&mut self) -> Result<SearchResult> {
        if !self.searching {
            return Err(Error::Engine("no search is running".to_string()));
        }
        self.send("stop")?;
        self.wait_search()
    }

    /// Quits the engine cleanly
    pub fn quit(&mut self) -> Result<()> {
        self.send("quit")?;
        // Give it a moment to exit
        std::thread::sleep(Duration::from_millis(100));
        let _ = self.process.kill(); // Kill if still running
        Ok(())
    }
}

impl Drop for StockfishSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}

/// Parses a "bestmove" line. `bestmove (none)` (no legal moves) maps to
/// `None`.
fn parse_bestmove(line: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let best = match parts.get(1) {
        Some(&"(none)") | Some(&"0000") | None => None,
        Some(mv) => Some(mv.to_string()),
    };

    let ponder = parts
        .iter()
        .position(|p| *p == "ponder")
        .and_then(|i| parts.get(i + 1))
        .map(|p| p.to_string());

    (best, ponder)
}

/// Folds an "info" line into the running result. Later lines overwrite
/// earlier ones, so the result ends up reflecting the deepest report.
fn apply_info_line(line: &str, result: &mut SearchResult) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(d) = parts.get(i + 1).and_then(|p| p.parse().ok()) {
                    result.depth = d;
                }
                i += 2;
            }
            "score" => {
                if i + 2 < parts.len() {
                    match parts[i + 1] {
                        "cp" => {
                            if let Ok(cp) = parts[i + 2].parse::<i32>() {
                                result.evaluation = Evaluation::Centipawns(cp);
                            }
                        }
                        "mate" => {
                            if let Ok(m) = parts[i + 2].parse::<i32>() {
                                result.evaluation = Evaluation::Mate(m);
                            }
                        }
                        _ => {}
                    }
                }
                i += 3;
            }
            "time" => {
                if let Some(t) = parts.get(i + 1).and_then(|p| p.parse().ok()) {
                    result.time_ms = t;
                }
                i += 2;
            }
            "nodes" => {
                if let Some(n) = parts.get(i + 1).and_then(|p| p.parse().ok()) {
                    result.nodes = n;
                }
                i += 2;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                result.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => {
                i += 1;
            }
        }
    }
}
