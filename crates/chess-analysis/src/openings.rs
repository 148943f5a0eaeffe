//! Recurring problem positions in the opening.
//!
//! Every move of the first plies is scored, whoever played it. A move whose
//! drop for the mover exceeds the threshold flags the position it led to, and
//! positions are counted across the corpus.

use serde::Serialize;
use tracing::warn;

use crate::board::WalkError;
use crate::evaluation::{eval_drop, EvalSample};
use crate::oracle::{Oracle, OracleError};
use crate::record::GameRecord;
use crate::stats::Findings;
use crate::tally::Tally;
use crate::walker::MoveWalker;

/// Default number of plies examined per game.
pub const DEFAULT_OPENING_PLIES: usize = 10;

/// Default drop, in centipawns, above which an opening move is flagged.
pub const DEFAULT_OPENING_THRESHOLD: i32 = 1;

/// Positions flagged in one game.
#[derive(Debug, Default)]
pub struct OpeningScan {
    /// Resulting positions of flagged moves, in move order.
    pub flagged: Vec<String>,
    /// Moves that had a score on both sides.
    pub judged: usize,
    pub skipped_samples: usize,
    /// Set when a move had no score before it and the scan stopped.
    pub aborted: Option<OracleError>,
    pub failure: Option<WalkError>,
}

/// Scores the first `plies` moves of `game`.
///
/// The score after one move doubles as the score before the next, so a game
/// costs `plies + 1` queries. A failed query skips that sample and, since the
/// next move then has nothing to be measured against, ends the scan.
pub fn scan_opening<O: Oracle + ?Sized>(
    oracle: &mut O,
    game: &GameRecord,
    plies: usize,
    threshold: i32,
    depth: u32,
) -> OpeningScan {
    let mut scan = OpeningScan::default();
    let mut walker = MoveWalker::new(game, plies);
    let mut previous: Option<EvalSample> = None;

    for step in walker.by_ref() {
        let before = match previous {
            Some(sample) => sample,
            None => match oracle.evaluate(&step.before, depth) {
                Ok(eval) => eval.sample_for(step.ply - 1, step.before.turn()),
                Err(e) => {
                    warn!(game = %game.id, ply = step.ply, error = %e, "Oracle failed before opening move, abandoning game");
                    scan.aborted = Some(e);
                    break;
                }
            },
        };

        let after = match oracle.evaluate(&step.after, depth) {
            Ok(eval) => eval.sample_for(step.ply, step.after.turn()),
            Err(e) => {
                warn!(game = %game.id, ply = step.ply, error = %e, "Oracle failed in opening, skipping sample");
                scan.skipped_samples += 1;
                // Nothing left to measure the next move against.
                scan.aborted = Some(e);
                break;
            }
        };

        scan.judged += 1;
        if eval_drop(&before, &after, step.before.turn()) > threshold {
            scan.flagged.push(step.after.position_string());
        }
        previous = Some(after);
    }

    scan.failure = walker.failure().cloned();
    scan
}

/// A position reached by a flagged move, with how often it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpeningIssue {
    pub position: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpeningReport {
    pub moves_judged: usize,
    pub flagged_moves: usize,
    /// Most frequent first.
    pub issues: Vec<OpeningIssue>,
}

/// Counts flagged positions across games.
#[derive(Debug, Default)]
pub struct OpeningCollector {
    judged: usize,
    flagged: usize,
    positions: Tally<String>,
}

impl OpeningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game(&mut self, scan: OpeningScan) {
        self.judged += scan.judged;
        self.flagged += scan.flagged.len();
        for position in scan.flagged {
            self.positions.add(position);
        }
    }

    /// The report, or `NoData` if no move was ever judged.
    pub fn finish(self, top_n: usize) -> Findings<OpeningReport> {
        if self.judged == 0 {
            return Findings::NoData;
        }
        let issues = self
            .positions
            .most_common(top_n)
            .into_iter()
            .map(|(position, occurrences)| OpeningIssue {
                position,
                occurrences,
            })
            .collect();
        Findings::Found(OpeningReport {
            moves_judged: self.judged,
            flagged_moves: self.flagged,
            issues,
        })
    }
}
