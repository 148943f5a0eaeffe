//! Day-by-day blunder trend.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::evaluation::to_pawns;
use crate::mistakes::DropWalk;
use crate::stats::Findings;

/// Default cap, in centipawns, on what one blunder adds to the daily total.
pub const DEFAULT_DROP_CLAMP: i32 = 1000;

/// Blunders of one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameCounters {
    pub blunders: usize,
    /// Sum of clamped drops, in centipawns.
    pub total_drop: i64,
}

impl GameCounters {
    /// Counts every drop above `threshold`, each capped at `clamp`.
    pub fn from_drops(drops: impl IntoIterator<Item = i32>, threshold: i32, clamp: i32) -> Self {
        drops
            .into_iter()
            .filter(|&d| d > threshold)
            .fold(Self::default(), |mut acc, d| {
                acc.blunders += 1;
                acc.total_drop += i64::from(d.min(clamp));
                acc
            })
    }

    pub fn from_walk(walk: &DropWalk<'_>, threshold: i32, clamp: i32) -> Self {
        Self::from_drops(walk.moves.iter().map(|m| m.drop), threshold, clamp)
    }
}

/// One day of the trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub games: usize,
    pub blunders: usize,
    pub total_drop: i64,
    /// Average drop per blunder, in pawns.
    pub average_drop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    /// Oldest day first.
    pub days: Vec<DailyStat>,
}

/// Merges per-game counters into per-day totals.
#[derive(Debug, Default)]
pub struct TrendCollector {
    days: BTreeMap<NaiveDate, (usize, GameCounters)>,
}

impl TrendCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game(&mut self, date: NaiveDate, counters: GameCounters) {
        let (games, day) = self.days.entry(date).or_default();
        *games += 1;
        day.blunders += counters.blunders;
        day.total_drop += counters.total_drop;
    }

    /// The report, or `NoData` if no dated game was added.
    pub fn finish(self) -> Findings<TrendReport> {
        if self.days.is_empty() {
            return Findings::NoData;
        }
        let days = self
            .days
            .into_iter()
            .map(|(date, (games, counters))| DailyStat {
                date,
                games,
                blunders: counters.blunders,
                total_drop: counters.total_drop,
                average_drop: to_pawns(
                    counters.total_drop as f64 / counters.blunders.max(1) as f64,
                ),
            })
            .collect();
        Findings::Found(TrendReport { days })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_drops_are_clamped_before_summing() {
        let counters = GameCounters::from_drops([300, 1200], 150, 1000);
        assert_eq!(
            counters,
            GameCounters {
                blunders: 2,
                total_drop: 1300
            }
        );

        let mut trend = TrendCollector::new();
        trend.add_game(day(1), counters);
        let report = trend.finish();
        let stat = &report.found().unwrap().days[0];
        assert_eq!(stat.total_drop, 1300);
        assert!((stat.average_drop - 6.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_small_drops_are_not_blunders() {
        let counters = GameCounters::from_drops([150, -400, 20, 151], 150, 1000);
        assert_eq!(counters.blunders, 1);
        assert_eq!(counters.total_drop, 151);
    }

    #[test]
    fn test_days_are_sorted_and_merged() {
        let mut trend = TrendCollector::new();
        trend.add_game(day(9), GameCounters::from_drops([400], 150, 1000));
        trend.add_game(day(2), GameCounters::default());
        trend.add_game(day(9), GameCounters::from_drops([200, 300], 150, 1000));

        let report = trend.finish();
        let days = &report.found().unwrap().days;
        assert_eq!(days.len(), 2);

        assert_eq!(days[0].date, day(2));
        assert_eq!(days[0].games, 1);
        assert_eq!(days[0].blunders, 0);
        assert_eq!(days[0].average_drop, 0.0);

        assert_eq!(days[1].date, day(9));
        assert_eq!(days[1].games, 2);
        assert_eq!(days[1].blunders, 3);
        assert_eq!(days[1].total_drop, 900);
        assert!((days[1].average_drop - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_dated_games_is_no_data() {
        assert_eq!(TrendCollector::new().finish(), Findings::NoData);
    }
}
