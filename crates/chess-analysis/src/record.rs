//! Game records and the sources that supply them.
//!
//! A [`GameRecord`] holds the primary line of one game as an ordered list of
//! plies, each with the comment that followed it, plus the header tags.
//! Variations are discarded while parsing and never reach the analyses.

use std::collections::BTreeMap;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pgn_reader::{RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::san::San;
use thiserror::Error;

/// Date format of the `Date` header tag.
pub const HEADER_DATE_FORMAT: &str = "%Y.%m.%d";

const UNKNOWN_PLAYER: &str = "Unknown";
const UNKNOWN_RATING: &str = "N/A";

/// Errors raised while listing or loading game records.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The record source could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The record exists but does not contain a readable game.
    #[error("Unreadable game in {id}: {reason}")]
    Parse { id: String, reason: String },
    /// The record contains no game at all.
    #[error("No game found in {0}")]
    Empty(String),
    /// No record with this id is known to the source.
    #[error("Unknown record: {0}")]
    NotFound(String),
    /// The folder path cannot be turned into a file pattern.
    #[error("Invalid folder pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// One half-move of the primary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ply {
    /// The move as written in the record.
    pub san: San,
    /// Every comment that followed the move, joined with a space.
    pub comment: String,
}

impl Ply {
    pub fn new(san: San, comment: impl Into<String>) -> Self {
        Self {
            san,
            comment: comment.into(),
        }
    }
}

/// A parsed game: header tags plus the primary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Identifier of the record within its source (the file name for
    /// [`PgnFolder`]).
    pub id: String,
    pub headers: BTreeMap<String, String>,
    pub plies: Vec<Ply>,
}

impl GameRecord {
    /// Parses the first game of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Empty`] if `text` holds no game and
    /// [`RecordError::Parse`] if the movetext cannot be read.
    pub fn from_pgn(id: impl Into<String>, text: &str) -> Result<Self, RecordError> {
        let id = id.into();
        let mut reader = Reader::new(text.as_bytes());
        let mut visitor = RecordVisitor;

        match reader.read_game(&mut visitor) {
            Ok(Some(game)) if game.headers.is_empty() && game.plies.is_empty() => {
                Err(RecordError::Empty(id))
            }
            Ok(Some(game)) => Ok(GameRecord {
                id,
                headers: game.headers,
                plies: game.plies,
            }),
            Ok(None) => Err(RecordError::Empty(id)),
            Err(e) => Err(RecordError::Parse {
                id,
                reason: e.to_string(),
            }),
        }
    }

    /// Value of a header tag, if present.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Name of the White player, `Unknown` if not recorded.
    pub fn white(&self) -> &str {
        self.header("White").unwrap_or(UNKNOWN_PLAYER)
    }

    /// Name of the Black player, `Unknown` if not recorded.
    pub fn black(&self) -> &str {
        self.header("Black").unwrap_or(UNKNOWN_PLAYER)
    }

    /// White's rating as written, `N/A` if not recorded.
    pub fn white_elo(&self) -> &str {
        self.header("WhiteElo").unwrap_or(UNKNOWN_RATING)
    }

    /// Black's rating as written, `N/A` if not recorded.
    pub fn black_elo(&self) -> &str {
        self.header("BlackElo").unwrap_or(UNKNOWN_RATING)
    }

    /// The `Date` header as a calendar date. `None` when the tag is missing
    /// or not in `YYYY.MM.DD` form (including `????.??.??` placeholders).
    pub fn date(&self) -> Option<NaiveDate> {
        self.header("Date")
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), HEADER_DATE_FORMAT).ok())
    }
}

struct ParsedGame {
    headers: BTreeMap<String, String>,
    plies: Vec<Ply>,
}

struct RecordVisitor;

impl Visitor for RecordVisitor {
    type Tags = BTreeMap<String, String>;
    type Movetext = ParsedGame;
    type Output = ParsedGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(BTreeMap::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        tags.insert(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(ParsedGame {
            headers: tags,
            plies: Vec::new(),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, game: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        game.plies.push(Ply::new(san.san, String::new()));
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        game: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        // Comments before the first move belong to no ply.
        if let Some(ply) = game.plies.last_mut() {
            let text = String::from_utf8_lossy(comment.as_bytes());
            let text = text.trim();
            if !text.is_empty() {
                if !ply.comment.is_empty() {
                    ply.comment.push(' ');
                }
                ply.comment.push_str(text);
            }
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, game: Self::Movetext) -> Self::Output {
        game
    }
}

/// Supplies game records to the analyzer.
pub trait RecordSource {
    /// Ids of every record, in a stable order.
    ///
    /// # Errors
    ///
    /// Fails only if the corpus itself cannot be enumerated.
    fn list_records(&self) -> Result<Vec<String>, RecordError>;

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// Fails if the record cannot be read or contains no readable game.
    fn load(&self, id: &str) -> Result<GameRecord, RecordError>;
}

/// In-memory corpus, mostly useful for tests and pre-parsed games.
impl RecordSource for Vec<GameRecord> {
    fn list_records(&self) -> Result<Vec<String>, RecordError> {
        Ok(self.iter().map(|g| g.id.clone()).collect())
    }

    fn load(&self, id: &str) -> Result<GameRecord, RecordError> {
        self.iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }
}

/// A folder of `.pgn` files, one game read from each.
#[derive(Debug, Clone)]
pub struct PgnFolder {
    root: PathBuf,
}

impl PgnFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The folder being read.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RecordSource for PgnFolder {
    /// File names of every `*.pgn` file directly inside the folder, sorted.
    fn list_records(&self) -> Result<Vec<String>, RecordError> {
        if !self.root.is_dir() {
            return Err(RecordError::Io {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let escaped = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{escaped}/*.pgn");

        let mut ids: Vec<String> = glob::glob(&pattern)?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<GameRecord, RecordError> {
        let path = self.root.join(id);
        let bytes = fs::read(&path).map_err(|source| RecordError::Io {
            path: path.clone(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        GameRecord::from_pgn(id, &text)
    }
}
