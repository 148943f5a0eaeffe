//! Corpus-level analyses.
//!
//! This module provides the [`GameAnalyzer`], which owns one oracle and one
//! record source for its whole lifetime and runs each report as an
//! independent pass over the corpus.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::WalkError;
use crate::engine::{EngineError, UciEngine};
use crate::evaluation::Side;
use crate::mistakes::{side_drops, MistakeCollector, MistakeReport, DEFAULT_MISTAKE_THRESHOLD};
use crate::openings::{
    scan_opening, OpeningCollector, OpeningReport, DEFAULT_OPENING_PLIES,
    DEFAULT_OPENING_THRESHOLD,
};
use crate::oracle::{Oracle, DEFAULT_DEPTH};
use crate::record::{GameRecord, RecordError, RecordSource};
use crate::stats::{Analysis, CorpusStats, Findings};
use crate::time::{scan_game, HesitationReport, PlayingTime};
use crate::trends::{GameCounters, TrendCollector, TrendReport, DEFAULT_DROP_CLAMP};
use crate::walker::DEFAULT_PLY_CUTOFF;

/// Errors that can occur during corpus analysis.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error from the analysis engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// The corpus could not be listed.
    #[error("Cannot list games: {0}")]
    Corpus(#[from] RecordError),
}

/// Configuration for corpus analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Search depth for every oracle query.
    pub depth: u32,
    /// Plies walked per game at most.
    pub ply_cutoff: usize,
    /// Entries kept in each ranked list.
    pub top_n: usize,
    /// Drop, in centipawns, above which a move is a mistake.
    pub mistake_threshold_cp: i32,
    /// Plies examined per game for opening issues.
    pub opening_plies: usize,
    /// Drop, in centipawns, above which an opening move is flagged.
    pub opening_threshold_cp: i32,
    /// Cap on one blunder's contribution to the daily total.
    pub drop_clamp_cp: i32,
    /// Side whose moves are judged for mistakes and trends.
    pub analyzed_side: Side,
    /// Analyze only the first this many records.
    pub max_games: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            ply_cutoff: DEFAULT_PLY_CUTOFF,
            top_n: 5,
            mistake_threshold_cp: DEFAULT_MISTAKE_THRESHOLD,
            opening_plies: DEFAULT_OPENING_PLIES,
            opening_threshold_cp: DEFAULT_OPENING_THRESHOLD,
            drop_clamp_cp: DEFAULT_DROP_CLAMP,
            analyzed_side: Side::White,
            max_games: None,
        }
    }
}

/// Runs reports over a corpus of recorded games.
///
/// The oracle is acquired at construction and released exactly once: by
/// [`GameAnalyzer::close`], or on drop if `close` was never called.
pub struct GameAnalyzer<O: Oracle, S: RecordSource> {
    oracle: O,
    source: S,
    config: AnalysisConfig,
    closed: bool,
}

impl<S: RecordSource> GameAnalyzer<UciEngine, S> {
    /// Creates an analyzer backed by a UCI engine process.
    ///
    /// # Arguments
    ///
    /// * `engine_path` - Path to the UCI engine executable.
    /// * `source` - Where the games come from.
    /// * `config` - Analysis configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be started.
    pub fn with_stockfish(
        engine_path: &str,
        source: S,
        config: AnalysisConfig,
    ) -> Result<Self, AnalyzerError> {
        let engine = UciEngine::new(engine_path)?;
        info!(engine = engine.name(), "Evaluation engine ready");
        Ok(Self::new(engine, source, config))
    }
}

impl<O: Oracle, S: RecordSource> GameAnalyzer<O, S> {
    pub fn new(oracle: O, source: S, config: AnalysisConfig) -> Self {
        Self {
            oracle,
            source,
            config,
            closed: false,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Moves on which the most clock time was spent, with the share of such
    /// moves played in simple, in-check and endgame positions.
    ///
    /// # Errors
    ///
    /// Returns an error only if the corpus cannot be listed.
    pub fn time_consuming_positions(&self) -> Result<Analysis<HesitationReport>, AnalyzerError> {
        info!("Analyzing time usage");
        let mut stats = CorpusStats::default();
        let mut samples = 0;
        let mut records = Vec::new();

        for id in self.corpus(&mut stats)? {
            let Some(game) = self.load(&id, &mut stats) else {
                continue;
            };
            let clock = scan_game(&game, self.config.ply_cutoff);
            stats.malformed_clocks += clock.malformed_clocks;
            note_walk_failure(&mut stats, &game, clock.failure.as_ref());
            samples += clock.samples.len();
            records.extend(clock.records);
        }

        Ok(Analysis {
            stats,
            findings: HesitationReport::from_records(records, samples, self.config.top_n),
        })
    }

    /// Total time spent on the clock across the corpus.
    ///
    /// # Errors
    ///
    /// Returns an error only if the corpus cannot be listed.
    pub fn total_time_played(&self) -> Result<Analysis<PlayingTime>, AnalyzerError> {
        info!("Summing playing time");
        let mut stats = CorpusStats::default();
        let mut samples = 0;
        let mut total_seconds = 0;

        for id in self.corpus(&mut stats)? {
            let Some(game) = self.load(&id, &mut stats) else {
                continue;
            };
            let clock = scan_game(&game, self.config.ply_cutoff);
            stats.malformed_clocks += clock.malformed_clocks;
            note_walk_failure(&mut stats, &game, clock.failure.as_ref());
            samples += clock.samples.len();
            total_seconds += clock.played_seconds;
        }

        let findings = if samples == 0 {
            Findings::NoData
        } else {
            Findings::Found(PlayingTime::from_seconds(total_seconds))
        };
        Ok(Analysis { stats, findings })
    }

    /// The analyzed side's largest evaluation drops, plus the moves it
    /// blundered most often.
    ///
    /// # Errors
    ///
    /// Returns an error only if the corpus cannot be listed.
    pub fn common_mistakes(&mut self) -> Result<Analysis<MistakeReport>, AnalyzerError> {
        let side = self.config.analyzed_side;
        info!(%side, "Analyzing mistakes");
        let mut stats = CorpusStats::default();
        let mut collector = MistakeCollector::new(self.config.mistake_threshold_cp);

        for id in self.corpus(&mut stats)? {
            let Some(game) = self.load(&id, &mut stats) else {
                continue;
            };
            let walk = side_drops(
                &mut self.oracle,
                &game,
                side,
                self.config.depth,
                self.config.ply_cutoff,
            );
            stats.skipped_samples += walk.skipped_samples;
            stats.aborted_games += usize::from(walk.aborted.is_some());
            note_walk_failure(&mut stats, &game, walk.failure.as_ref());
            collector.add_game(&game, &walk);
        }

        Ok(Analysis {
            stats,
            findings: collector.finish(self.config.top_n),
        })
    }

    /// Positions reached in the opening by moves that lost evaluation,
    /// most frequent first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the corpus cannot be listed.
    pub fn opening_issues(&mut self) -> Result<Analysis<OpeningReport>, AnalyzerError> {
        info!(plies = self.config.opening_plies, "Analyzing openings");
        let mut stats = CorpusStats::default();
        let mut collector = OpeningCollector::new();
        let plies = self.config.opening_plies.min(self.config.ply_cutoff);

        for id in self.corpus(&mut stats)? {
            let Some(game) = self.load(&id, &mut stats) else {
                continue;
            };
            let scan = scan_opening(
                &mut self.oracle,
                &game,
                plies,
                self.config.opening_threshold_cp,
                self.config.depth,
            );
            stats.skipped_samples += scan.skipped_samples;
            stats.aborted_games += usize::from(scan.aborted.is_some());
            note_walk_failure(&mut stats, &game, scan.failure.as_ref());
            collector.add_game(scan);
        }

        Ok(Analysis {
            stats,
            findings: collector.finish(self.config.top_n),
        })
    }

    /// Blunders of the analyzed side per calendar day, oldest first.
    ///
    /// Games without a usable `Date` header are left out of this report.
    ///
    /// # Errors
    ///
    /// Returns an error only if the corpus cannot be listed.
    pub fn progress_over_time(&mut self) -> Result<Analysis<TrendReport>, AnalyzerError> {
        let side = self.config.analyzed_side;
        info!(%side, "Analyzing progress over time");
        let mut stats = CorpusStats::default();
        let mut trend = TrendCollector::new();

        for id in self.corpus(&mut stats)? {
            let Some(game) = self.load(&id, &mut stats) else {
                continue;
            };
            let Some(date) = game.date() else {
                warn!(game = %game.id, date = game.header("Date"), "Skipping undated game");
                stats.undated_games += 1;
                continue;
            };

            let walk = side_drops(
                &mut self.oracle,
                &game,
                side,
                self.config.depth,
                self.config.ply_cutoff,
            );
            stats.skipped_samples += walk.skipped_samples;
            stats.aborted_games += usize::from(walk.aborted.is_some());
            note_walk_failure(&mut stats, &game, walk.failure.as_ref());

            let counters = GameCounters::from_walk(
                &walk,
                self.config.mistake_threshold_cp,
                self.config.drop_clamp_cp,
            );
            trend.add_game(date, counters);
        }

        Ok(Analysis {
            stats,
            findings: trend.finish(),
        })
    }

    /// Releases the oracle.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.oracle.close();
            debug!("Oracle released");
        }
    }

    /// Record ids of this run, honouring `max_games`.
    fn corpus(&self, stats: &mut CorpusStats) -> Result<Vec<String>, AnalyzerError> {
        let mut ids = self.source.list_records()?;
        if let Some(max) = self.config.max_games {
            ids.truncate(max);
        }
        stats.files_listed = ids.len();
        info!(games = ids.len(), "Corpus listed");
        Ok(ids)
    }

    fn load(&self, id: &str, stats: &mut CorpusStats) -> Option<GameRecord> {
        match self.source.load(id) {
            Ok(game) => {
                debug!(game = id, plies = game.plies.len(), "Analyzing game");
                stats.games_analyzed += 1;
                Some(game)
            }
            Err(e) => {
                warn!(game = id, error = %e, "Skipping unreadable game");
                stats.unreadable_files += 1;
                None
            }
        }
    }
}

impl<O: Oracle, S: RecordSource> Drop for GameAnalyzer<O, S> {
    fn drop(&mut self) {
        self.release();
    }
}

fn note_walk_failure(stats: &mut CorpusStats, game: &GameRecord, failure: Option<&WalkError>) {
    if let Some(e) = failure {
        warn!(game = %game.id, error = %e, "Abandoning rest of game");
        stats.abandoned_games += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::evaluation::Evaluation;
    use crate::oracle::OracleError;
    use std::cell::Cell;
    use std::rc::Rc;

    const DATED: &str = "[Date \"2024.01.02\"]\n\n1. e4 {[%clk 0:05:00]} e5 {[%clk 0:05:00]} 2. Nf3 {[%clk 0:04:40]} *\n";

    /// Oracle that scores everything as equal and counts closes.
    struct Flat {
        closes: Rc<Cell<usize>>,
    }

    impl Oracle for Flat {
        fn evaluate(&mut self, _: &Position, _: u32) -> Result<Evaluation, OracleError> {
            Ok(Evaluation::Centipawns(0))
        }

        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    fn corpus(texts: &[&str]) -> Vec<GameRecord> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| GameRecord::from_pgn(format!("g{i}.pgn"), t).unwrap())
            .collect()
    }

    #[test]
    fn test_analysis_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.depth, 12);
        assert_eq!(config.ply_cutoff, 200);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.mistake_threshold_cp, 150);
        assert_eq!(config.opening_plies, 10);
        assert_eq!(config.opening_threshold_cp, 1);
        assert_eq!(config.drop_clamp_cp, 1000);
        assert_eq!(config.analyzed_side, Side::White);
        assert_eq!(config.max_games, None);
    }

    #[test]
    fn test_analyzer_error_display() {
        let engine_err = AnalyzerError::Engine(EngineError::NotFound("stockfish".to_string()));
        let display = format!("{}", engine_err);
        assert!(display.contains("Engine error"));
        assert!(display.contains("stockfish"));

        let corpus_err = AnalyzerError::Corpus(RecordError::NotFound("games".to_string()));
        assert!(corpus_err.to_string().contains("Cannot list games"));
    }

    #[test]
    fn test_close_releases_oracle_once() {
        let closes = Rc::new(Cell::new(0));
        let analyzer = GameAnalyzer::new(
            Flat {
                closes: closes.clone(),
            },
            corpus(&[DATED]),
            AnalysisConfig::default(),
        );
        analyzer.close();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_drop_releases_oracle_once() {
        let closes = Rc::new(Cell::new(0));
        {
            let mut analyzer = GameAnalyzer::new(
                Flat {
                    closes: closes.clone(),
                },
                corpus(&[DATED]),
                AnalysisConfig::default(),
            );
            analyzer.common_mistakes().unwrap();
        }
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_max_games_limits_corpus() {
        let config = AnalysisConfig {
            max_games: Some(1),
            ..AnalysisConfig::default()
        };
        let analyzer = GameAnalyzer::new(
            |_: &Position, _: u32| -> Result<Evaluation, OracleError> {
                Ok(Evaluation::Centipawns(0))
            },
            corpus(&[DATED, DATED, DATED]),
            config,
        );

        let analysis = analyzer.total_time_played().unwrap();
        assert_eq!(analysis.stats.files_listed, 1);
        assert_eq!(analysis.stats.games_analyzed, 1);
        assert_eq!(analysis.findings, Findings::Found(PlayingTime::from_seconds(20)));
    }

    #[test]
    fn test_undated_games_only_leave_the_trend() {
        let undated = "[White \"x\"]\n\n1. e4 e5 *\n";
        let mut analyzer = GameAnalyzer::new(
            |_: &Position, _: u32| -> Result<Evaluation, OracleError> {
                Ok(Evaluation::Centipawns(0))
            },
            corpus(&[DATED, undated]),
            AnalysisConfig::default(),
        );

        let trend = analyzer.progress_over_time().unwrap();
        assert_eq!(trend.stats.undated_games, 1);
        let days = &trend.findings.found().unwrap().days;
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].games, 1);

        let mistakes = analyzer.common_mistakes().unwrap();
        assert_eq!(mistakes.stats.games_analyzed, 2);
        assert_eq!(mistakes.findings.found().unwrap().moves_scored, 3);
    }

    #[test]
    fn test_oracle_outage_aborts_games_but_not_the_run() {
        let mut analyzer = GameAnalyzer::new(
            |_: &Position, _: u32| -> Result<Evaluation, OracleError> {
                Err(OracleError::Unavailable("down".into()))
            },
            corpus(&[DATED, DATED]),
            AnalysisConfig::default(),
        );

        let analysis = analyzer.common_mistakes().unwrap();
        assert_eq!(analysis.stats.aborted_games, 2);
        assert_eq!(analysis.findings, Findings::NoData);

        let openings = analyzer.opening_issues().unwrap();
        assert_eq!(openings.stats.aborted_games, 2);
        assert_eq!(openings.stats.skipped_samples, 0);
        assert_eq!(openings.findings, Findings::NoData);

        let trend = analyzer.progress_over_time().unwrap();
        let day = &trend.findings.found().unwrap().days[0];
        assert_eq!((day.games, day.blunders), (2, 0));
    }

    #[test]
    fn test_unreadable_listing_is_an_error() {
        let analyzer = GameAnalyzer::new(
            |_: &Position, _: u32| -> Result<Evaluation, OracleError> {
                Ok(Evaluation::Centipawns(0))
            },
            crate::record::PgnFolder::new("/nonexistent/games"),
            AnalysisConfig::default(),
        );
        assert!(matches!(
            analyzer.time_consuming_positions(),
            Err(AnalyzerError::Corpus(_))
        ));
    }
}
