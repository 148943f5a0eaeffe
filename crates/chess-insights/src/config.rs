//! Configuration file loading for chess-insights.
//!
//! Settings come from a TOML file (`insights.toml` in the current directory
//! unless another path is given). Command-line flags are applied on top.

use std::path::{Path, PathBuf};

use chess_analysis::AnalysisConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InsightsConfig {
    /// Folder holding the `.pgn` files to analyze. Defaults to `games`.
    #[serde(default = "default_games_folder")]
    pub games_folder: PathBuf,
    /// Path to Stockfish engine for analysis.
    /// Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_stockfish_path")]
    pub stockfish_path: String,
    /// Analysis settings, see [`AnalysisConfig`].
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_games_folder() -> PathBuf {
    PathBuf::from("games")
}

fn default_stockfish_path() -> String {
    "stockfish".to_string()
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            games_folder: default_games_folder(),
            stockfish_path: default_stockfish_path(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl InsightsConfig {
    /// Loads the configuration from `path`.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default path of the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("insights.toml")
    }
}
