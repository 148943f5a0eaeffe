//! Clock annotations embedded in move comments (`[%clk 0:04:58.3]`).

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const CLOCK_TOKEN: &str = "%clk";

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%clk\s+(\d+):(\d+)(?::(\d+))?(?:\.\d+)?").expect("clock pattern is valid")
});

/// Remaining clock time read from one ply's comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockSample {
    pub elapsed_seconds: u32,
    pub ply: usize,
}

/// Result of scanning a comment for a clock token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockToken {
    /// The comment carries no clock token.
    Missing,
    /// A clock token is present but its numbers cannot be read.
    Malformed,
    /// Total seconds on the clock, fraction discarded.
    Seconds(u32),
}

/// Scans `comment` for a clock token.
///
/// Accepts `m:ss` and `h:mm:ss`, each with an optional fractional part.
pub fn scan_clock(comment: &str) -> ClockToken {
    if !comment.contains(CLOCK_TOKEN) {
        return ClockToken::Missing;
    }

    let Some(caps) = CLOCK_RE.captures(comment) else {
        return ClockToken::Malformed;
    };

    let field = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());
    let parsed = match (field(1), field(2), field(3)) {
        (Some(Ok(h)), Some(Ok(m)), Some(Ok(s))) if m < 60 && s < 60 => h
            .checked_mul(3600)
            .and_then(|hs| hs.checked_add(m * 60 + s)),
        (Some(Ok(m)), Some(Ok(s)), None) if s < 60 => {
            m.checked_mul(60).and_then(|ms| ms.checked_add(s))
        }
        _ => None,
    };

    match parsed {
        Some(seconds) => ClockToken::Seconds(seconds),
        None => ClockToken::Malformed,
    }
}

/// Total clock seconds in `comment`, or `None` if there is no readable
/// clock token.
pub fn parse_clock(comment: &str) -> Option<u32> {
    match scan_clock(comment) {
        ClockToken::Seconds(seconds) => Some(seconds),
        ClockToken::Missing | ClockToken::Malformed => None,
    }
}
