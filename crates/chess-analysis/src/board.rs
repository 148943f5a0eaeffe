//! Rules-service adapter.
//!
//! Position derivation, legality, notation and material counts are delegated
//! to `shakmaty`; this module only exposes the handful of queries the
//! analyses need, in the analyzer's own vocabulary.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{Chess, EnPassantMode, Piece, Position as _, Role};
use thiserror::Error;

use crate::evaluation::Side;

/// Combined material (both sides, unweighted) at or below which a position
/// counts as an endgame.
pub const ENDGAME_MATERIAL: u32 = 14;

/// Errors raised while replaying a game.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// The recorded move is not legal in the replayed position.
    #[error("Illegal move {san} at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}

/// A position derived by replay from the standard initial setup.
#[derive(Debug, Clone, Default)]
pub struct Position {
    inner: Chess,
}

impl Position {
    /// The standard starting position.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Side to move.
    pub fn turn(&self) -> Side {
        Side::from_color(self.inner.turn())
    }

    /// Number of legal moves for the side to move.
    pub fn legal_move_count(&self) -> usize {
        self.inner.legal_moves().len()
    }

    pub fn is_in_check(&self) -> bool {
        self.inner.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.inner.is_checkmate()
    }

    /// Unweighted material of `side`: every piece counts its role ordinal
    /// (pawn 1, knight 2, bishop 3, rook 4, queen 5, king 6).
    pub fn material_sum(&self, side: Side) -> u32 {
        let board = self.inner.board();
        Role::ALL
            .iter()
            .map(|&role| {
                let count = board
                    .by_piece(Piece {
                        color: side.color(),
                        role,
                    })
                    .count() as u32;
                count * role as u32
            })
            .sum()
    }

    /// White material minus black material.
    pub fn material_balance(&self) -> i32 {
        self.material_sum(Side::White) as i32 - self.material_sum(Side::Black) as i32
    }

    /// Whether combined material is low enough to call this an endgame.
    pub fn is_endgame(&self) -> bool {
        self.material_sum(Side::White) + self.material_sum(Side::Black) <= ENDGAME_MATERIAL
    }

    /// Full-move number as written in move lists.
    pub fn fullmove_number(&self) -> u32 {
        self.inner.fullmoves().get()
    }

    /// Half-moves played since the initial position.
    pub fn ply_count(&self) -> usize {
        let played_pairs = (self.fullmove_number() as usize - 1) * 2;
        match self.turn() {
            Side::White => played_pairs,
            Side::Black => played_pairs + 1,
        }
    }

    /// Canonical position string (FEN).
    pub fn position_string(&self) -> String {
        Fen::from_position(&self.inner, EnPassantMode::Legal).to_string()
    }

    /// Canonical notation of `san` in this position, with a check or mate
    /// suffix. `None` if the move is not legal here.
    pub fn notation_of(&self, san: &San) -> Option<String> {
        self.apply_move(san, self.ply_count() + 1)
            .ok()
            .map(|(_, notation)| notation)
    }

    /// Plays `san` and returns the resulting position together with the
    /// canonical notation of the move.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::IllegalMove`] if `san` does not resolve to a
    /// legal move in this position.
    pub fn apply_move(&self, san: &San, ply: usize) -> Result<(Position, String), WalkError> {
        let m = san
            .to_move(&self.inner)
            .map_err(|_| WalkError::IllegalMove {
                ply,
                san: san.to_string(),
            })?;

        let mut notation = San::from_move(&self.inner, m.clone()).to_string();
        let mut after = self.inner.clone();
        after.play_unchecked(m);

        if after.is_checkmate() {
            notation.push('#');
        } else if after.is_check() {
            notation.push('+');
        }

        Ok((Position { inner: after }, notation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn san(text: &str) -> San {
        text.parse().expect("valid SAN")
    }

    fn play(moves: &[&str]) -> Position {
        let mut pos = Position::initial();
        for (i, mv) in moves.iter().enumerate() {
            pos = pos.apply_move(&san(mv), i + 1).expect("legal move").0;
        }
        pos
    }

    #[test]
    fn initial_position_queries() {
        let pos = Position::initial();
        assert_eq!(pos.turn(), Side::White);
        assert_eq!(pos.legal_move_count(), 20);
        assert!(!pos.is_in_check());
        // 8 pawns + 2 knights + 2 bishops + 2 rooks + queen + king.
        assert_eq!(pos.material_sum(Side::White), 8 + 4 + 6 + 8 + 5 + 6);
        assert_eq!(pos.material_balance(), 0);
        assert!(!pos.is_endgame());
        assert_eq!(pos.fullmove_number(), 1);
        assert_eq!(pos.ply_count(), 0);
        assert_eq!(
            pos.position_string(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn apply_move_tracks_turn_and_ply() {
        let pos = play(&["e4", "e5", "Nf3"]);
        assert_eq!(pos.turn(), Side::Black);
        assert_eq!(pos.ply_count(), 3);
        assert_eq!(pos.fullmove_number(), 2);
    }

    #[test]
    fn illegal_move_is_reported_with_ply() {
        let pos = play(&["e4"]);
        let err = pos.apply_move(&san("Ke4"), 2).unwrap_err();
        assert_eq!(
            err,
            WalkError::IllegalMove {
                ply: 2,
                san: "Ke4".to_string()
            }
        );
        assert!(err.to_string().contains("Ke4"));
    }

    #[test]
    fn notation_carries_check_and_mate_suffixes() {
        let pos = play(&["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6"]);
        assert_eq!(pos.notation_of(&san("Qxf7")).as_deref(), Some("Qxf7#"));

        let pos = play(&["e4", "f5"]);
        assert_eq!(pos.notation_of(&san("Qh5")).as_deref(), Some("Qh5+"));
        assert_eq!(pos.notation_of(&san("Qh6")), None);
    }

    #[test]
    fn captures_shift_material_balance() {
        // 1. e4 d5 2. exd5: white is a pawn up.
        let pos = play(&["e4", "d5", "exd5"]);
        assert_eq!(pos.material_balance(), 1);
    }

    #[test]
    fn check_flag_follows_position() {
        let pos = play(&["e4", "f5", "Qh5"]);
        assert!(pos.is_in_check());
        assert_eq!(pos.turn(), Side::Black);
    }
}
