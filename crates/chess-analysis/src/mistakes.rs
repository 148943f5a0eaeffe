//! Mistake detection by evaluation differencing.
//!
//! For every move of the analyzed side, the oracle scores the position
//! before and after the move. Both scores are brought to the mover's
//! perspective and the difference is the evaluation drop the move caused.

use serde::Serialize;
use tracing::warn;

use crate::board::WalkError;
use crate::evaluation::{eval_drop, render_score, EvalSample, Side};
use crate::oracle::{Oracle, OracleError};
use crate::record::GameRecord;
use crate::stats::Findings;
use crate::tally::Tally;
use crate::walker::{MoveWalker, Step};

/// Default drop, in centipawns, above which a move counts as a mistake.
pub const DEFAULT_MISTAKE_THRESHOLD: i32 = 150;

/// A move of the analyzed side with its scores.
#[derive(Debug, Clone)]
pub struct ScoredMove<'a> {
    pub step: Step<'a>,
    pub before: EvalSample,
    pub after: EvalSample,
    /// Drop for the mover, in centipawns. Positive means the move hurt.
    pub drop: i32,
}

/// Outcome of scoring one game's moves for one side.
#[derive(Debug, Default)]
pub struct DropWalk<'a> {
    pub moves: Vec<ScoredMove<'a>>,
    /// Post-move queries that failed; those moves are missing from `moves`.
    pub skipped_samples: usize,
    /// The pre-move query that failed and stopped the walk.
    pub aborted: Option<OracleError>,
    /// The move that could not be replayed and stopped the walk.
    pub failure: Option<WalkError>,
}

/// Scores every move `side` made in `game`.
///
/// A failed post-move query drops that move only. A failed pre-move query
/// stops the walk; moves scored so far are kept.
pub fn side_drops<'a, O: Oracle + ?Sized>(
    oracle: &mut O,
    game: &'a GameRecord,
    side: Side,
    depth: u32,
    cutoff: usize,
) -> DropWalk<'a> {
    let mut walk = DropWalk::default();
    let mut walker = MoveWalker::new(game, cutoff);

    for step in walker.by_ref() {
        if step.before.turn() != side {
            continue;
        }

        let before = match oracle.evaluate(&step.before, depth) {
            Ok(eval) => eval.sample_for(step.ply - 1, side),
            Err(e) => {
                warn!(game = %game.id, ply = step.ply, error = %e, "Oracle failed before move, abandoning game");
                walk.aborted = Some(e);
                return walk;
            }
        };
        let after = match oracle.evaluate(&step.after, depth) {
            Ok(eval) => eval.sample_for(step.ply, step.after.turn()),
            Err(e) => {
                warn!(game = %game.id, ply = step.ply, error = %e, "Oracle failed after move, skipping sample");
                walk.skipped_samples += 1;
                continue;
            }
        };

        let drop = eval_drop(&before, &after, side);
        walk.moves.push(ScoredMove {
            step,
            before,
            after,
            drop,
        });
    }

    walk.failure = walker.failure().cloned();
    walk
}

/// Human-readable description of a move in standard notation.
///
/// Castling is spelled out; anything else becomes piece name and
/// destination square, e.g. `Knight to f3`.
pub fn describe_move(notation: &str) -> String {
    let bare = notation.trim_end_matches(['+', '#', '!', '?']);
    if bare.starts_with("O-O-O") {
        return "Castles queenside".to_string();
    }
    if bare.starts_with("O-O") {
        return "Castles kingside".to_string();
    }

    let piece = match bare.chars().next() {
        Some('K') => "King",
        Some('Q') => "Queen",
        Some('R') => "Rook",
        Some('B') => "Bishop",
        Some('N') => "Knight",
        _ => "Pawn",
    };
    let target = bare.split('=').next().unwrap_or(bare);
    let square = target
        .char_indices()
        .rev()
        .nth(1)
        .map_or(target, |(i, _)| &target[i..]);
    format!("{piece} to {square}")
}

/// A move whose evaluation drop exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MistakeRecord {
    pub ply: usize,
    pub move_number: u32,
    pub notation: String,
    pub description: String,
    /// Scores from the mover's perspective, in centipawns.
    pub eval_before: i32,
    pub eval_after: i32,
    pub eval_drop: i32,
    pub mover: Side,
    /// Position before the move.
    pub position: String,
    pub game_id: String,
    pub white: String,
    pub black: String,
    pub white_elo: String,
    pub black_elo: String,
}

impl MistakeRecord {
    pub fn from_scored(game: &GameRecord, scored: &ScoredMove<'_>) -> Self {
        let mover = scored.before.perspective;
        Self {
            ply: scored.step.ply,
            move_number: scored.step.before.fullmove_number(),
            notation: scored.step.notation.clone(),
            description: describe_move(&scored.step.notation),
            eval_before: scored.before.toward(mover),
            eval_after: scored.after.toward(mover),
            eval_drop: scored.drop,
            mover,
            position: scored.step.before.position_string(),
            game_id: game.id.clone(),
            white: game.white().to_string(),
            black: game.black().to_string(),
            white_elo: game.white_elo().to_string(),
            black_elo: game.black_elo().to_string(),
        }
    }

    /// `eval_before` rendered in pawns, or as a mate.
    pub fn render_before(&self) -> String {
        render_score(self.eval_before, self.mover)
    }

    /// `eval_after` rendered in pawns, or as a mate.
    pub fn render_after(&self) -> String {
        render_score(self.eval_after, self.mover)
    }
}

/// A notation that recurs among the mistakes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatedMistake {
    pub notation: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MistakeReport {
    /// Moves scored across the corpus.
    pub moves_scored: usize,
    pub total_mistakes: usize,
    /// Largest drops first.
    pub top: Vec<MistakeRecord>,
    /// Most repeated notations first.
    pub repeated: Vec<RepeatedMistake>,
}

/// Collects mistakes across games.
#[derive(Debug, Default)]
pub struct MistakeCollector {
    threshold: i32,
    moves_scored: usize,
    mistakes: Vec<MistakeRecord>,
    repeats: Tally<String>,
}

impl MistakeCollector {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Records every move of `walk` whose drop exceeds the threshold.
    pub fn add_game(&mut self, game: &GameRecord, walk: &DropWalk<'_>) {
        self.moves_scored += walk.moves.len();
        for scored in walk.moves.iter().filter(|m| m.drop > self.threshold) {
            let record = MistakeRecord::from_scored(game, scored);
            self.repeats.add(record.notation.clone());
            self.mistakes.push(record);
        }
    }

    /// The report, or `NoData` if no move was ever scored.
    pub fn finish(mut self, top_n: usize) -> Findings<MistakeReport> {
        if self.moves_scored == 0 {
            return Findings::NoData;
        }

        let total_mistakes = self.mistakes.len();
        self.mistakes.sort_by(|a, b| b.eval_drop.cmp(&a.eval_drop));
        self.mistakes.truncate(top_n);

        let repeated = self
            .repeats
            .most_common(top_n)
            .into_iter()
            .map(|(notation, count)| RepeatedMistake { notation, count })
            .collect();

        Findings::Found(MistakeReport {
            moves_scored: self.moves_scored,
            total_mistakes,
            top: self.mistakes,
            repeated,
        })
    }
}
