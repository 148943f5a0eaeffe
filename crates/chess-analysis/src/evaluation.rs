//! Chess position evaluation types.
//!
//! Every score the oracle produces is relative to the side to move. All sign
//! handling goes through [`EvalSample`], which pins a score to an explicit
//! perspective and converts it toward any side on request.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Magnitude that stands in for a forced mate in all score arithmetic.
pub const MATE_SCORE: i32 = 9000;

/// Centipawns per pawn.
pub const CENTIPAWNS_PER_PAWN: f64 = 100.0;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    White,
    Black,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Converts to the rules-service color.
    #[inline]
    pub const fn color(self) -> Color {
        match self {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }

    #[inline]
    pub const fn from_color(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Represents a chess position evaluation as reported by the oracle.
///
/// Both variants are relative to the side to move: positive means the side
/// to move is better (or mates), negative means it is worse (or is mated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn evaluation.
    Centipawns(i32),
    /// Mate in N moves. Zero or negative means the side to move is mated.
    Mate(i32),
}

impl Evaluation {
    /// Builds an evaluation from the `score cp` / `score mate` fields of a
    /// UCI info line. A mate score wins over a centipawn score.
    pub fn from_uci_score(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Evaluation::Mate(m)),
            (Some(c), None) => Some(Evaluation::Centipawns(c)),
            (None, None) => None,
        }
    }

    /// Score in centipawns with mates replaced by [`MATE_SCORE`].
    ///
    /// Centipawn scores are kept strictly inside the mate band so that only a
    /// real mate renders as one.
    pub fn clamped(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp.clamp(-(MATE_SCORE - 1), MATE_SCORE - 1),
            Evaluation::Mate(n) if n > 0 => MATE_SCORE,
            Evaluation::Mate(_) => -MATE_SCORE,
        }
    }

    /// Pins this evaluation to the side that was to move when it was produced.
    pub fn sample_for(self, ply: usize, to_move: Side) -> EvalSample {
        EvalSample {
            ply,
            score: self.clamped(),
            perspective: to_move,
        }
    }
}

/// A clamped score bound to an explicit perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvalSample {
    /// Ply the sample belongs to (0 for the initial position).
    pub ply: usize,
    /// Centipawns from `perspective`'s point of view.
    pub score: i32,
    /// The side the score is measured for.
    pub perspective: Side,
}

impl EvalSample {
    /// The score as seen by `side`.
    #[inline]
    pub fn toward(&self, side: Side) -> i32 {
        if self.perspective == side {
            self.score
        } else {
            -self.score
        }
    }
}

/// Drop in evaluation for `side` between two samples.
///
/// Positive values mean the position got worse for `side`.
#[inline]
pub fn eval_drop(before: &EvalSample, after: &EvalSample, side: Side) -> i32 {
    before.toward(side) - after.toward(side)
}

/// Converts centipawns to pawn units.
#[inline]
pub fn to_pawns(cp: f64) -> f64 {
    cp / CENTIPAWNS_PER_PAWN
}

/// Renders a score measured from `perspective`.
///
/// Mate-band scores become `mate for <side>`, anything else a pawn value
/// with two decimals.
pub fn render_score(score: i32, perspective: Side) -> String {
    if score >= MATE_SCORE {
        format!("mate for {perspective}")
    } else if score <= -MATE_SCORE {
        format!("mate for {}", perspective.opposite())
    } else {
        format!("{:.2}", to_pawns(f64::from(score)))
    }
}
