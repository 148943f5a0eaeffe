//! UCI engine process driven as an evaluation oracle.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use crate::board::Position;
use crate::evaluation::Evaluation;
use crate::oracle::{Oracle, OracleError};

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur while starting an engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
}

/// A UCI engine such as Stockfish, queried one position at a time.
///
/// The process lives until [`Oracle::close`] is called or the engine is
/// dropped, whichever comes first.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    name: String,
    closed: bool,
    /// Set when an overrun search could not be stopped, so the pipe may
    /// still hold its output.
    out_of_step: bool,
}

impl UciEngine {
    /// Spawns the engine and performs the UCI handshake.
    ///
    /// # Arguments
    ///
    /// * `engine_path` - Path to the UCI engine executable, or a command name
    ///   looked up on `PATH`
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable does not exist
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::InitFailed` if the UCI handshake fails
    pub fn new(engine_path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(engine_path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdout".to_string()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::new(),
            closed: false,
            out_of_step: false,
        };

        if let Err(e) = engine.init_uci() {
            // A half-initialized engine may never honour `quit`.
            let _ = engine.process.kill();
            return Err(EngineError::InitFailed(e.to_string()));
        }
        debug!(engine = %engine.name, "UCI handshake complete");

        Ok(engine)
    }

    fn init_uci(&mut self) -> Result<(), OracleError> {
        self.send_command("uci")?;

        let mut name = String::new();
        self.read_until(|line| {
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.to_string();
            }
            line == "uciok"
        })?;

        self.name = if name.is_empty() {
            "Unknown Engine".to_string()
        } else {
            name
        };

        self.send_command("isready")?;
        self.read_until(|line| line == "readyok")?;
        Ok(())
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn run_query(&mut self, fen: &str, depth: u32) -> Result<Evaluation, OracleError> {
        self.send_command(&format!("position fen {}", fen))?;
        self.send_command(&format!("go depth {}", depth))?;

        let mut evaluation = None;
        let answered = self.read_until(|line| {
            if line.starts_with("info depth ") {
                if let Some((_, eval)) = Self::parse_info_line(line) {
                    evaluation = Some(eval);
                }
            }
            line.starts_with("bestmove")
        });
        if let Err(OracleError::Timeout(reason)) = answered {
            self.abandon_search();
            return Err(OracleError::Timeout(reason));
        }
        answered?;

        evaluation.ok_or_else(|| OracleError::InvalidResponse(format!("no score for {fen}")))
    }

    /// Stops a search that overran the line budget and discards the rest of
    /// its output, so the next query starts on a clean pipe.
    fn abandon_search(&mut self) {
        let drained = self
            .send_command("stop")
            .and_then(|()| self.read_until(|line| line.starts_with("bestmove")));
        if let Err(e) = drained {
            warn!(engine = %self.name, error = %e, "Engine did not stop, refusing further queries");
            self.out_of_step = true;
        }
    }

    /// Reads lines until `done` accepts one.
    ///
    /// Gives up with [`OracleError::Timeout`] after [`MAX_UCI_LINES`].
    fn read_until(&mut self, mut done: impl FnMut(&str) -> bool) -> Result<(), OracleError> {
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line()?;
            if done(&line) {
                return Ok(());
            }
        }
        Err(OracleError::Timeout(format!(
            "no answer within {MAX_UCI_LINES} lines"
        )))
    }

    /// Parse a UCI info line to extract depth and score.
    ///
    /// Format: "info depth X ... score cp Y ..."
    /// or: "info depth X ... score mate Y ..."
    fn parse_info_line(line: &str) -> Option<(u32, Evaluation)> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let mut depth: Option<u32> = None;
        let mut cp: Option<i32> = None;
        let mut mate: Option<i32> = None;

        let mut i = 0;
        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    if i + 1 < parts.len() {
                        depth = parts[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "score" => {
                    if i + 2 < parts.len() {
                        match parts[i + 1] {
                            "cp" => {
                                cp = parts[i + 2].parse().ok();
                                i += 2;
                            }
                            "mate" => {
                                mate = parts[i + 2].parse().ok();
                                i += 2;
                            }
                            _ => {}
                        }
                    }
                }
                // Nothing after the principal variation is of interest.
                "pv" => break,
                _ => {}
            }
            i += 1;
        }

        let d = depth?;
        let eval = Evaluation::from_uci_score(cp, mate)?;

        Some((d, eval))
    }

    fn send_command(&mut self, command: &str) -> Result<(), OracleError> {
        debug!(command, "uci >");
        writeln!(self.stdin, "{}", command).map_err(unavailable)?;
        self.stdin.flush().map_err(unavailable)?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, OracleError> {
        let mut line = String::new();
        let bytes = self.stdout.read_line(&mut line).map_err(unavailable)?;
        if bytes == 0 {
            return Err(OracleError::Unavailable(
                "engine closed unexpectedly".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }
}

fn unavailable(e: std::io::Error) -> OracleError {
    OracleError::Unavailable(e.to_string())
}

impl Oracle for UciEngine {
    fn evaluate(&mut self, position: &Position, depth: u32) -> Result<Evaluation, OracleError> {
        if self.closed {
            return Err(OracleError::Unavailable("engine already closed".to_string()));
        }
        if self.out_of_step {
            return Err(OracleError::Unavailable(
                "engine still busy with an abandoned search".to_string(),
            ));
        }
        self.run_query(&position.position_string(), depth)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // The process may already be gone; quitting is best effort.
        let _ = self.send_command("quit");
        let _ = self.process.wait();
        debug!(engine = %self.name, "engine closed");
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Writing an executable while another thread forks can make the exec
    // fail with ETXTBSY, so tests that write or spawn take turns.
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn spawn_lock() -> MutexGuard<'static, ()> {
        SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_engine_not_found() {
        let _guard = spawn_lock();
        let result = UciEngine::new("/nonexistent/path/to/stockfish");
        match result {
            Err(EngineError::NotFound(path)) => {
                assert_eq!(path, "/nonexistent/path/to/stockfish");
            }
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_engine_error_display() {
        let spawn_err = EngineError::SpawnError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert!(spawn_err.to_string().contains("Failed to spawn engine"));

        let not_found = EngineError::NotFound("/path/to/engine".to_string());
        assert!(not_found.to_string().contains("/path/to/engine"));

        let init_failed = EngineError::InitFailed("no uciok".to_string());
        assert_eq!(
            init_failed.to_string(),
            "Engine initialization failed: no uciok"
        );
    }

    #[test]
    fn test_parse_info_line_centipawn() {
        let line = "info depth 15 seldepth 20 score cp 35 nodes 50000 pv e2e4 e7e5 g1f3";
        let (depth, eval) = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(depth, 15);
        assert_eq!(eval, Evaluation::Centipawns(35));
    }

    #[test]
    fn test_parse_info_line_mate() {
        let line = "info depth 12 score mate 3 nodes 10000 pv d1h5 g6h5";
        let (depth, eval) = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(depth, 12);
        assert_eq!(eval, Evaluation::Mate(3));
    }

    #[test]
    fn test_parse_info_line_negative_score() {
        let line = "info depth 10 score cp -150 nodes 25000 pv e7e5";
        let (_depth, eval) = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(eval, Evaluation::Centipawns(-150));
    }

    #[test]
    fn test_parse_info_line_bound_score() {
        let line = "info depth 9 score cp 20 lowerbound nodes 900";
        let (_depth, eval) = UciEngine::parse_info_line(line).unwrap();
        assert_eq!(eval, Evaluation::Centipawns(20));
    }

    #[test]
    fn test_parse_info_line_missing_depth() {
        let line = "info score cp 35 nodes 50000 pv e2e4";
        assert!(UciEngine::parse_info_line(line).is_none());
    }

    #[test]
    fn test_parse_info_line_missing_score() {
        let line = "info depth 15 nodes 50000 pv e2e4";
        assert!(UciEngine::parse_info_line(line).is_none());
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        /// Writes a shell script that speaks just enough UCI, answering
        /// every `go` with `go_reply`.
        fn fake_engine(dir: &Path, go_reply: &str) -> PathBuf {
            let path = dir.join("fake-engine.sh");
            let script = format!(
                "#!/bin/sh\n\
                 while read line; do\n\
                   case \"$line\" in\n\
                     uci) echo 'id name FakeFish 1.0'; echo uciok ;;\n\
                     isready) echo readyok ;;\n\
                     go*) {go_reply} ;;\n\
                     quit) exit 0 ;;\n\
                   esac\n\
                 done\n"
            );
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn spawn(dir: &Path, go_reply: &str) -> UciEngine {
            let _guard = spawn_lock();
            let path = fake_engine(dir, go_reply);
            UciEngine::new(path.to_str().unwrap()).unwrap()
        }

        #[test]
        fn test_scripted_engine_query_and_close() {
            let dir = tempfile::tempdir().unwrap();
            let mut engine = spawn(
                dir.path(),
                "echo 'info depth 1 score cp 10 pv e2e4'; \
                 echo 'info depth 2 score mate -3 pv e2e4'; \
                 echo 'bestmove e2e4'",
            );
            assert_eq!(engine.name(), "FakeFish 1.0");

            let pos = Position::initial();
            assert_eq!(engine.evaluate(&pos, 2), Ok(Evaluation::Mate(-3)));
            assert_eq!(engine.evaluate(&pos, 2), Ok(Evaluation::Mate(-3)));

            engine.close();
            engine.close();
            assert!(matches!(
                engine.evaluate(&pos, 2),
                Err(OracleError::Unavailable(_))
            ));
        }

        #[test]
        fn test_scripted_engine_without_score() {
            let dir = tempfile::tempdir().unwrap();
            let mut engine = spawn(dir.path(), "echo 'bestmove e2e4'");
            assert!(matches!(
                engine.evaluate(&Position::initial(), 12),
                Err(OracleError::InvalidResponse(_))
            ));
        }

        #[test]
        fn test_scripted_engine_line_budget() {
            let dir = tempfile::tempdir().unwrap();
            let mut engine = spawn(
                dir.path(),
                "i=0; while [ $i -lt 1100 ]; do echo 'info depth 1 score cp 1'; i=$((i+1)); done",
            );
            assert!(matches!(
                engine.evaluate(&Position::initial(), 12),
                Err(OracleError::Timeout(_))
            ));
        }

        #[test]
        fn test_overrun_search_does_not_leak_into_next_query() {
            let dir = tempfile::tempdir().unwrap();
            let mut engine = spawn(
                dir.path(),
                "n=$((n+1)); \
                 if [ $n -eq 1 ]; then \
                   i=0; while [ $i -lt 1100 ]; do echo 'info depth 1 score cp 111'; i=$((i+1)); done; \
                 else \
                   echo 'info depth 1 score cp 222'; echo 'bestmove e2e4'; \
                 fi",
            );
            let pos = Position::initial();

            assert!(matches!(
                engine.evaluate(&pos, 12),
                Err(OracleError::Timeout(_))
            ));
            assert_eq!(engine.evaluate(&pos, 12), Ok(Evaluation::Centipawns(222)));
        }

        #[test]
        fn test_engine_that_ignores_stop_is_not_queried_again() {
            let dir = tempfile::tempdir().unwrap();
            // Longer than the budget for the query and the drain together,
            // and no bestmove at all.
            let mut engine = spawn(
                dir.path(),
                "i=0; while [ $i -lt 2500 ]; do echo 'info depth 1 score cp 111'; i=$((i+1)); done; \
                 read skipped",
            );
            let pos = Position::initial();

            assert!(matches!(
                engine.evaluate(&pos, 12),
                Err(OracleError::Timeout(_))
            ));
            assert!(matches!(
                engine.evaluate(&pos, 12),
                Err(OracleError::Unavailable(_))
            ));
            engine.close();
        }

        #[test]
        fn test_scripted_engine_exit_is_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let mut engine = spawn(dir.path(), "exit 0");
            assert!(matches!(
                engine.evaluate(&Position::initial(), 12),
                Err(OracleError::Unavailable(_))
            ));
        }
    }
}
