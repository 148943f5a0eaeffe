//! The evaluation oracle capability.
//!
//! Analyses only ever see this trait. [`crate::engine::UciEngine`] is the
//! process-backed implementation; tests drive the analyses with scripted
//! closures instead.

use thiserror::Error;

use crate::board::Position;
use crate::evaluation::Evaluation;

/// Default search depth for every oracle query.
pub const DEFAULT_DEPTH: u32 = 12;

/// Errors an oracle query can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle cannot be reached (not started, crashed, pipe closed).
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
    /// The oracle did not finish the query within its line budget.
    #[error("Oracle timed out: {0}")]
    Timeout(String),
    /// The oracle answered, but without a usable score.
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),
}

/// Evaluates positions on request.
///
/// Scores are relative to the side to move in the queried position.
pub trait Oracle {
    /// Evaluates `position`, searching to `depth`.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if no evaluation could be obtained.
    fn evaluate(&mut self, position: &Position, depth: u32) -> Result<Evaluation, OracleError>;

    /// Releases the oracle. Later queries fail with
    /// [`OracleError::Unavailable`]. Calling it twice is harmless.
    fn close(&mut self) {}
}

impl<F> Oracle for F
where
    F: FnMut(&Position, u32) -> Result<Evaluation, OracleError>,
{
    fn evaluate(&mut self, position: &Position, depth: u32) -> Result<Evaluation, OracleError> {
        self(position, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_oracle() {
        let mut calls = 0;
        let mut oracle = |_: &Position, depth: u32| -> Result<Evaluation, OracleError> {
            calls += 1;
            Ok(Evaluation::Centipawns(depth as i32))
        };

        let pos = Position::initial();
        assert_eq!(oracle.evaluate(&pos, 12), Ok(Evaluation::Centipawns(12)));
        oracle.close();
        assert_eq!(oracle.evaluate(&pos, 3), Ok(Evaluation::Centipawns(3)));
        drop(oracle);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_oracle_error_display() {
        assert!(OracleError::Unavailable("pipe closed".into())
            .to_string()
            .contains("pipe closed"));
        assert!(OracleError::Timeout("depth 12".into())
            .to_string()
            .starts_with("Oracle timed out"));
        assert!(OracleError::InvalidResponse("no score".into())
            .to_string()
            .contains("no score"));
    }
}
