//! chess-insights - Behavioral reports over a folder of recorded games.
//!
//! Loads `insights.toml`, applies command-line overrides, starts one
//! evaluation engine, runs the requested reports and prints them as text or
//! JSON.

mod config;
mod report;

use std::path::PathBuf;

use anyhow::Context;
use chess_analysis::{GameAnalyzer, Oracle, PgnFolder, RecordSource, Side};
use clap::{Parser, Subcommand};
use config::InsightsConfig;
use report::Reports;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "chess-insights")]
#[command(about = "Time usage, mistakes, opening issues and trends in recorded games")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to insights.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the .pgn files
    #[arg(short, long, global = true)]
    folder: Option<PathBuf>,

    /// Path to the UCI engine
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Side whose moves are judged (white or black)
    #[arg(long, global = true)]
    side: Option<Side>,

    /// Engine search depth
    #[arg(long, global = true)]
    depth: Option<u32>,

    /// Analyze at most this many games
    #[arg(long, global = true)]
    max_games: Option<usize>,

    /// Entries per ranked list
    #[arg(long, global = true)]
    top: Option<usize>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log every game and engine exchange
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Moves that took the most clock time
    Time,
    /// Largest evaluation drops and repeated mistakes
    Mistakes,
    /// Recurring problem positions in the opening
    Openings,
    /// Total time spent on the clock
    TotalTime,
    /// Blunders per day
    Trends,
    /// Every report
    All,
}

impl Cli {
    /// Applies command-line overrides to the file configuration.
    fn apply(&self, config: &mut InsightsConfig) {
        if let Some(folder) = &self.folder {
            config.games_folder = folder.clone();
        }
        if let Some(engine) = &self.engine {
            config.stockfish_path = engine.clone();
        }
        if let Some(side) = self.side {
            config.analysis.analyzed_side = side;
        }
        if let Some(depth) = self.depth {
            config.analysis.depth = depth;
        }
        if let Some(max) = self.max_games {
            config.analysis.max_games = Some(max);
        }
        if let Some(top) = self.top {
            config.analysis.top_n = top;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(InsightsConfig::config_path);
    let mut config = InsightsConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    cli.apply(&mut config);

    tracing::info!("Games folder: {:?}", config.games_folder);
    tracing::info!("Engine: {}", config.stockfish_path);

    let mut analyzer = GameAnalyzer::with_stockfish(
        &config.stockfish_path,
        PgnFolder::new(&config.games_folder),
        config.analysis.clone(),
    )
    .with_context(|| format!("starting engine {}", config.stockfish_path))?;

    let command = cli.command.unwrap_or(Commands::All);
    let reports = run(&mut analyzer, command);
    analyzer.close();
    let reports = reports?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{}", reports.render_text());
    }
    Ok(())
}

/// Runs the reports `command` asks for.
fn run<O: Oracle, S: RecordSource>(
    analyzer: &mut GameAnalyzer<O, S>,
    command: Commands,
) -> anyhow::Result<Reports> {
    let wants = |c: Commands| command == c || command == Commands::All;
    let mut reports = Reports::default();

    if wants(Commands::Time) {
        reports.time_usage = Some(analyzer.time_consuming_positions()?);
    }
    if wants(Commands::Mistakes) {
        reports.mistakes = Some(analyzer.common_mistakes()?);
    }
    if wants(Commands::Openings) {
        reports.openings = Some(analyzer.opening_issues()?);
    }
    if wants(Commands::TotalTime) {
        reports.total_time = Some(analyzer.total_time_played()?);
    }
    if wants(Commands::Trends) {
        reports.trends = Some(analyzer.progress_over_time()?);
    }
    Ok(reports)
}
