use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Canonical base occupied by a runner. `AtBat` is the batter's box and the
/// default for any raw value that carries no base information.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Base {
    First,
    Second,
    Third,
    Home,
    AtBat,
}

impl Base {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "1B",
            Self::Second => "2B",
            Self::Third => "3B",
            Self::Home => "HM",
            Self::AtBat => "B",
        }
    }

    /// Maps a raw source label onto the canonical enum. Already-canonical
    /// tokens map to themselves, so normalization is idempotent. Keyword
    /// matching follows the export's conventions: a digit names the bag,
    /// "score"/"home" name the plate, anything else is the batter's box.
    pub fn normalize(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            return Self::AtBat;
        }

        for base in [Self::First, Self::Second, Self::Third, Self::Home, Self::AtBat] {
            if value.eq_ignore_ascii_case(base.as_str()) {
                return base;
            }
        }

        let lowered = value.to_ascii_lowercase();
        if value.contains('1') || lowered.contains("first") {
            return Self::First;
        }
        if value.contains('2') || lowered.contains("second") {
            return Self::Second;
        }
        if value.contains('3') || lowered.contains("third") {
            return Self::Third;
        }
        if lowered.contains("score") || lowered.contains("home") {
            return Self::Home;
        }

        Self::AtBat
    }
}

/// Source files describing one game, keyed by the date folder that declared
/// the game's `gamePk`. When a game shows up under multiple dates, the last
/// scanned date wins and this struct points at that date's files.
#[derive(Debug, Clone)]
pub struct GameSources {
    pub date_folder: String,
    pub games_csv: PathBuf,
    pub linescores_csv: PathBuf,
    pub runners_csv: PathBuf,
}

/// Resolved configuration for one load run. Built once from CLI arguments
/// and the environment before any processing starts.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub data_root: PathBuf,
    pub sport_dir: String,
    pub db_path: PathBuf,
    pub manifest_dir: PathBuf,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesFileEntry {
    pub date_folder: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadCounts {
    pub date_folders_scanned: usize,
    pub date_folders_skipped: usize,
    pub games_discovered: usize,
    pub game_rows_loaded: usize,
    pub games_skipped: usize,
    pub linescore_games_processed: usize,
    pub linescore_games_skipped: usize,
    pub linescore_rows_loaded: usize,
    pub runner_games_processed: usize,
    pub runner_games_skipped: usize,
    pub runner_rows_loaded: usize,
    pub runner_duplicate_rows_dropped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPaths {
    pub data_root: String,
    pub manifest_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub paths: LoadPaths,
    pub counts: LoadCounts,
    pub source_hashes: Vec<GamesFileEntry>,
    pub warnings: Vec<String>,
}
