//! Time usage: where the clock went, and how long games took.
//!
//! Clock samples are read from move comments. A single running value per game
//! tracks the previous sample; the difference to the next sample is the time
//! spent on that move. Clock increases (increment, added time) are ignored.

use serde::Serialize;
use tracing::warn;

use crate::board::WalkError;
use crate::clock::{scan_clock, ClockSample, ClockToken};
use crate::evaluation::Side;
use crate::record::GameRecord;
use crate::stats::Findings;
use crate::walker::{MoveWalker, Step};

/// Positions with at most this many legal moves count as low complexity.
pub const LOW_COMPLEXITY_MOVES: usize = 10;

/// Tracks the previous clock sample of one game.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeTracker {
    previous: Option<u32>,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next clock sample and returns the time spent since the
    /// previous one, if positive. The first sample only seeds the tracker.
    pub fn observe(&mut self, seconds: u32) -> Option<u32> {
        let spent = self
            .previous
            .and_then(|prev| prev.checked_sub(seconds))
            .filter(|&spent| spent > 0);
        self.previous = Some(seconds);
        spent
    }
}

/// One move on which time was spent, with the position it was played in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRecord {
    pub seconds_spent: u32,
    pub ply: usize,
    pub move_number: u32,
    pub mover: Side,
    pub notation: String,
    /// Position before the move.
    pub position: String,
    pub legal_moves: usize,
    pub in_check: bool,
    pub material_balance: i32,
    pub endgame: bool,
    pub game_id: String,
}

impl TimeRecord {
    fn from_step(game_id: &str, step: &Step<'_>, seconds_spent: u32) -> Self {
        Self {
            seconds_spent,
            ply: step.ply,
            move_number: step.before.fullmove_number(),
            mover: step.before.turn(),
            notation: step.notation.clone(),
            position: step.before.position_string(),
            legal_moves: step.before.legal_move_count(),
            in_check: step.before.is_in_check(),
            material_balance: step.before.material_balance(),
            endgame: step.before.is_endgame(),
            game_id: game_id.to_string(),
        }
    }

    pub fn is_low_complexity(&self) -> bool {
        self.legal_moves <= LOW_COMPLEXITY_MOVES
    }
}

/// Clock data gathered from one game.
#[derive(Debug, Default)]
pub struct GameClock {
    pub samples: Vec<ClockSample>,
    pub records: Vec<TimeRecord>,
    /// Sum of every positive decrease between consecutive samples.
    pub played_seconds: u64,
    pub malformed_clocks: usize,
    /// Set when the walk stopped at a move that could not be replayed.
    pub failure: Option<WalkError>,
}

/// Walks `game` and reads its clock annotations.
pub fn scan_game(game: &GameRecord, cutoff: usize) -> GameClock {
    let mut clock = GameClock::default();
    let mut tracker = TimeTracker::new();
    let mut walker = MoveWalker::new(game, cutoff);

    for step in walker.by_ref() {
        let seconds = match scan_clock(step.comment) {
            ClockToken::Seconds(seconds) => seconds,
            ClockToken::Missing => continue,
            ClockToken::Malformed => {
                warn!(game = %game.id, ply = step.ply, comment = step.comment, "Skipping malformed clock");
                clock.malformed_clocks += 1;
                continue;
            }
        };

        clock.samples.push(ClockSample {
            elapsed_seconds: seconds,
            ply: step.ply,
        });
        if let Some(spent) = tracker.observe(seconds) {
            clock.played_seconds += u64::from(spent);
            clock.records.push(TimeRecord::from_step(&game.id, &step, spent));
        }
    }

    clock.failure = walker.failure().cloned();
    clock
}

/// Count and share of records matching one position feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Share {
    pub count: usize,
    pub ratio: f64,
}

impl Share {
    fn of(count: usize, total: usize) -> Self {
        let ratio = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        };
        Self { count, ratio }
    }
}

/// Where the most time went, across the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HesitationReport {
    pub total_records: usize,
    pub low_complexity: Share,
    pub in_check: Share,
    pub endgame: Share,
    /// Longest thinks, longest first.
    pub top: Vec<TimeRecord>,
}

impl HesitationReport {
    /// Ranks `records` by time spent. Equal spends keep their corpus order.
    ///
    /// `samples` is the number of clock readings seen in the corpus. Without
    /// any the result is `NoData`; with readings but no positive spend it is
    /// an empty report.
    pub fn from_records(
        mut records: Vec<TimeRecord>,
        samples: usize,
        top_n: usize,
    ) -> Findings<Self> {
        if samples == 0 {
            return Findings::NoData;
        }
        let total = records.len();

        let count = |pred: fn(&TimeRecord) -> bool| records.iter().filter(|r| pred(r)).count();
        let low_complexity = Share::of(count(TimeRecord::is_low_complexity), total);
        let in_check = Share::of(count(|r| r.in_check), total);
        let endgame = Share::of(count(|r| r.endgame), total);

        records.sort_by(|a, b| b.seconds_spent.cmp(&a.seconds_spent));
        records.truncate(top_n);

        Findings::Found(Self {
            total_records: total,
            low_complexity,
            in_check,
            endgame,
            top: records,
        })
    }
}

/// Total time on the clock across the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayingTime {
    pub total_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl PlayingTime {
    pub fn from_seconds(total_seconds: u64) -> Self {
        Self {
            total_seconds,
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
        }
    }
}
