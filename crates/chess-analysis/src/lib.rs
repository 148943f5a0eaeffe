//! Offline analysis of recorded chess games.
//!
//! This crate walks the primary line of each game in a corpus, correlates the
//! moves with clock annotations and with evaluations from an external engine,
//! and aggregates the results into ranked reports.
//!
//! # Overview
//!
//! - [`GameAnalyzer`] - Runs every report over one corpus with one oracle
//! - [`Oracle`] - Evaluation capability; [`UciEngine`] drives Stockfish
//! - [`RecordSource`] - Where games come from; [`PgnFolder`] reads `.pgn` files
//! - [`MoveWalker`] - Replays a game's primary line step by step
//! - [`parse_clock`] - Reads `[%clk ...]` annotations
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisConfig, GameAnalyzer, PgnFolder};
//!
//! let mut analyzer =
//!     GameAnalyzer::with_stockfish("stockfish", PgnFolder::new("games"), AnalysisConfig::default())?;
//! let mistakes = analyzer.common_mistakes()?;
//! analyzer.close();
//! ```

pub mod analyzer;
pub mod board;
pub mod clock;
pub mod engine;
pub mod evaluation;
pub mod mistakes;
pub mod openings;
pub mod oracle;
pub mod record;
pub mod stats;
pub mod tally;
pub mod time;
pub mod trends;
pub mod walker;

pub use analyzer::{AnalysisConfig, AnalyzerError, GameAnalyzer};
pub use board::{Position, WalkError};
pub use clock::{parse_clock, scan_clock, ClockSample, ClockToken};
pub use engine::{EngineError, UciEngine};
pub use evaluation::{render_score, EvalSample, Evaluation, Side, MATE_SCORE};
pub use mistakes::{describe_move, MistakeRecord, MistakeReport, RepeatedMistake};
pub use openings::{OpeningIssue, OpeningReport};
pub use oracle::{Oracle, OracleError};
pub use record::{GameRecord, PgnFolder, Ply, RecordError, RecordSource};
pub use stats::{Analysis, CorpusStats, Findings};
pub use time::{HesitationReport, PlayingTime, Share, TimeRecord};
pub use trends::{DailyStat, TrendReport};
pub use walker::{MoveWalker, Step};
