//! Report envelopes and corpus counters.

use serde::Serialize;

/// Result of one report: either nothing to report, or the report itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Findings<T> {
    /// The corpus held no usable samples for this report.
    NoData,
    Found(T),
}

impl<T> Findings<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Findings::Found(_))
    }

    /// The report, if there is one.
    pub fn found(&self) -> Option<&T> {
        match self {
            Findings::Found(t) => Some(t),
            Findings::NoData => None,
        }
    }
}

/// What happened to the corpus while producing one report.
///
/// Every skipped file, game or sample is counted here in addition to being
/// logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Record ids returned by the source.
    pub files_listed: usize,
    /// Games loaded and walked, fully or partly.
    pub games_analyzed: usize,
    /// Records that could not be loaded.
    pub unreadable_files: usize,
    /// Games whose walk stopped at a move that could not be replayed.
    pub abandoned_games: usize,
    /// Oracle samples lost to a failed query.
    pub skipped_samples: usize,
    /// Games whose oracle walk stopped on a failed pre-move query.
    pub aborted_games: usize,
    /// Clock tokens whose numbers could not be read.
    pub malformed_clocks: usize,
    /// Games left out of the daily trend for lack of a usable date.
    pub undated_games: usize,
}

/// A report together with the counters gathered while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis<T> {
    pub stats: CorpusStats,
    pub findings: Findings<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_findings_accessors() {
        let found = Findings::Found(3);
        assert!(found.is_found());
        assert_eq!(found.found(), Some(&3));

        let none: Findings<i32> = Findings::NoData;
        assert!(!none.is_found());
        assert_eq!(none.found(), None);
    }

    #[test]
    fn test_findings_serialization() {
        let none: Findings<u32> = Findings::NoData;
        assert_eq!(serde_json::to_string(&none).unwrap(), r#""no_data""#);
        assert_eq!(
            serde_json::to_string(&Findings::Found(7)).unwrap(),
            r#"{"found":7}"#
        );
    }
}
