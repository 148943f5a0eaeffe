//! Traversal of a game's primary line.

use shakmaty::san::San;

use crate::board::{Position, WalkError};
use crate::record::GameRecord;

/// Plies walked per game before the walk stops on its own.
pub const DEFAULT_PLY_CUTOFF: usize = 200;

/// One replayed half-move.
#[derive(Debug, Clone)]
pub struct Step<'a> {
    /// 1-based half-move index.
    pub ply: usize,
    pub before: Position,
    pub after: Position,
    pub san: &'a San,
    /// Canonical notation of the move in `before`, with check suffix.
    pub notation: String,
    pub comment: &'a str,
}

/// Lazily replays a game from the initial position.
///
/// The walk stops at the ply cutoff or at the first move that cannot be
/// replayed. In the latter case [`MoveWalker::failure`] reports why; steps
/// already yielded stay valid.
pub struct MoveWalker<'a> {
    game: &'a GameRecord,
    position: Position,
    next: usize,
    cutoff: usize,
    failure: Option<WalkError>,
}

impl<'a> MoveWalker<'a> {
    pub fn new(game: &'a GameRecord, cutoff: usize) -> Self {
        Self {
            game,
            position: Position::initial(),
            next: 0,
            cutoff,
            failure: None,
        }
    }

    /// Why the walk ended early, if it did.
    pub fn failure(&self) -> Option<&WalkError> {
        self.failure.as_ref()
    }
}

impl<'a> Iterator for MoveWalker<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failure.is_some() || self.next >= self.cutoff {
            return None;
        }
        let ply = self.game.plies.get(self.next)?;
        let index = self.next + 1;

        match self.position.apply_move(&ply.san, index) {
            Ok((after, notation)) => {
                let before = std::mem::replace(&mut self.position, after.clone());
                self.next += 1;
                Some(Step {
                    ply: index,
                    before,
                    after,
                    san: &ply.san,
                    notation,
                    comment: &ply.comment,
                })
            }
            Err(e) => {
                self.failure = Some(e);
                None
            }
        }
    }
}
