//! Text rendering of analysis results.

use std::fmt::Write;

use chess_analysis::{
    Analysis, CorpusStats, Findings, HesitationReport, MistakeReport, OpeningReport,
    PlayingTime, TrendReport,
};
use serde::Serialize;

/// Everything one invocation produced, for JSON output.
#[derive(Debug, Default, Serialize)]
pub struct Reports {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_usage: Option<Analysis<HesitationReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistakes: Option<Analysis<MistakeReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openings: Option<Analysis<OpeningReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<Analysis<PlayingTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<Analysis<TrendReport>>,
}

impl Reports {
    /// All present reports as text, in a fixed order.
    pub fn render_text(&self) -> String {
        let mut sections = Vec::new();
        if let Some(a) = &self.time_usage {
            sections.push(render_time_usage(a));
        }
        if let Some(a) = &self.mistakes {
            sections.push(render_mistakes(a));
        }
        if let Some(a) = &self.openings {
            sections.push(render_openings(a));
        }
        if let Some(a) = &self.total_time {
            sections.push(render_total_time(a));
        }
        if let Some(a) = &self.trends {
            sections.push(render_trends(a));
        }
        sections.join("\n")
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn no_data(out: &mut String, what: &str) {
    let _ = writeln!(out, "No {what} found.");
}

/// One line per non-zero skip counter.
fn skipped(out: &mut String, stats: &CorpusStats) {
    let counters = [
        (stats.unreadable_files, "unreadable file(s) skipped"),
        (stats.abandoned_games, "game(s) cut short by an illegal move"),
        (stats.aborted_games, "game(s) cut short by the engine"),
        (stats.skipped_samples, "engine sample(s) skipped"),
        (stats.malformed_clocks, "malformed clock annotation(s)"),
        (stats.undated_games, "undated game(s) left out"),
    ];
    for (count, label) in counters {
        if count > 0 {
            let _ = writeln!(out, "  ({count} {label})");
        }
    }
}

pub fn render_time_usage(analysis: &Analysis<HesitationReport>) -> String {
    let mut out = String::from("Time usage\n");
    let Findings::Found(report) = &analysis.findings else {
        no_data(&mut out, "clock data");
        skipped(&mut out, &analysis.stats);
        return out;
    };

    let _ = writeln!(out, "Positions analyzed: {}", report.total_records);
    let _ = writeln!(
        out,
        "Spent time in low-complexity positions (<=10 legal moves): {} ({})",
        report.low_complexity.count,
        percent(report.low_complexity.ratio)
    );
    let _ = writeln!(
        out,
        "Spent time while in check: {} ({})",
        report.in_check.count,
        percent(report.in_check.ratio)
    );
    let _ = writeln!(
        out,
        "Spent time in endgames: {} ({})",
        report.endgame.count,
        percent(report.endgame.ratio)
    );

    let _ = writeln!(out, "\nTop {} most time-consuming positions:", report.top.len());
    for (i, r) in report.top.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}s on move {} ({} played {})",
            i + 1,
            r.seconds_spent,
            r.move_number,
            r.mover,
            r.notation
        );
        let _ = writeln!(out, "   From game: {}", r.game_id);
        let _ = writeln!(out, "   FEN: {}", r.position);
    }
    skipped(&mut out, &analysis.stats);
    out
}

pub fn render_mistakes(analysis: &Analysis<MistakeReport>) -> String {
    let mut out = String::from("Mistakes\n");
    let Findings::Found(report) = &analysis.findings else {
        no_data(&mut out, "evaluated moves");
        skipped(&mut out, &analysis.stats);
        return out;
    };

    let _ = writeln!(
        out,
        "{} mistake(s) in {} evaluated move(s)",
        report.total_mistakes, report.moves_scored
    );
    for (i, m) in report.top.iter().enumerate() {
        let _ = writeln!(out, "{}. {} -> {}", i + 1, m.notation, m.description);
        let _ = writeln!(
            out,
            "   Eval dropped from {} to {} (-{:.2})",
            m.render_before(),
            m.render_after(),
            chess_analysis::evaluation::to_pawns(f64::from(m.eval_drop))
        );
        let _ = writeln!(
            out,
            "   Game: {} | {} ({}) vs {} ({})",
            m.game_id, m.white, m.white_elo, m.black, m.black_elo
        );
        let _ = writeln!(out, "   FEN: {}", m.position);
    }

    if !report.repeated.is_empty() {
        let _ = writeln!(out, "\nMost repeated mistakes:");
        for r in &report.repeated {
            let _ = writeln!(out, "- {} -> {} times", r.notation, r.count);
        }
    }
    skipped(&mut out, &analysis.stats);
    out
}

pub fn render_openings(analysis: &Analysis<OpeningReport>) -> String {
    let mut out = String::from("Opening issues\n");
    let Findings::Found(report) = &analysis.findings else {
        no_data(&mut out, "evaluated opening moves");
        skipped(&mut out, &analysis.stats);
        return out;
    };

    let _ = writeln!(
        out,
        "{} of {} opening move(s) lost evaluation",
        report.flagged_moves, report.moves_judged
    );
    for (i, issue) in report.issues.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. Eval drop in opening ({} times): {}",
            i + 1,
            issue.occurrences,
            issue.position
        );
    }
    skipped(&mut out, &analysis.stats);
    out
}

pub fn render_total_time(analysis: &Analysis<PlayingTime>) -> String {
    let mut out = String::from("Total playing time\n");
    match &analysis.findings {
        Findings::Found(t) => {
            let _ = writeln!(out, "Estimated total clocked time: {}h {}m", t.hours, t.minutes);
        }
        Findings::NoData => no_data(&mut out, "clock data"),
    }
    skipped(&mut out, &analysis.stats);
    out
}

pub fn render_trends(analysis: &Analysis<TrendReport>) -> String {
    let mut out = String::from("Progress over time\n");
    let Findings::Found(report) = &analysis.findings else {
        no_data(&mut out, "dated games");
        skipped(&mut out, &analysis.stats);
        return out;
    };

    for day in &report.days {
        let _ = writeln!(
            out,
            "{}: {} game(s), {} blunder(s), avg eval drop: {:.2} pawns",
            day.date, day.games, day.blunders, day.average_drop
        );
    }
    skipped(&mut out, &analysis.stats);
    out
}
