use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::model::{GameSources, GamesFileEntry, LoadConfig};
use crate::table::Frame;
use crate::util::sha256_file;

pub const GAMES_FILE: &str = "games.csv";
pub const LINESCORES_FILE: &str = "linescores.csv";
pub const RUNNERS_FILE: &str = "runners.csv";

pub const GAME_ID_COLUMN: &str = "gamePk";

#[derive(Debug, Default)]
pub struct Discovery {
    pub sources: BTreeMap<i64, GameSources>,
    pub date_folders_scanned: usize,
    pub date_folders_skipped: usize,
    pub games_files: Vec<GamesFileEntry>,
}

/// Scans the date-partitioned tree under the data root and maps every
/// declared `gamePk` to the CSV triple describing that game. Dates are
/// visited in sorted lexical order; a `gamePk` declared under several dates
/// resolves to the last scanned one. Only an unlistable root is fatal —
/// every per-date problem downgrades to a warning and skips that date.
pub fn locate_games(config: &LoadConfig, warnings: &mut Vec<String>) -> Result<Discovery> {
    let entries = fs::read_dir(&config.data_root)
        .with_context(|| format!("failed to list data root: {}", config.data_root.display()))?;

    let mut date_folders = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to list data root: {}", config.data_root.display()))?;
        if entry.path().is_dir() {
            date_folders.push(entry.path());
        }
    }
    date_folders.sort();

    let mut discovery = Discovery::default();

    for date_folder in date_folders {
        let folder_date = date_folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sport_dir = date_folder.join(&config.sport_dir);
        let games_csv = sport_dir.join(GAMES_FILE);

        if !games_csv.exists() {
            warn!(dir = %sport_dir.display(), "games file missing, skipping date");
            warnings.push(format!("games file missing in {}", sport_dir.display()));
            discovery.date_folders_skipped += 1;
            continue;
        }

        let games = match Frame::read_csv(&games_csv) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(path = %games_csv.display(), error = %err, "unreadable games file, skipping date");
                warnings.push(format!("unreadable games file: {}", games_csv.display()));
                discovery.date_folders_skipped += 1;
                continue;
            }
        };

        if games.is_empty() {
            warn!(path = %games_csv.display(), "empty games file, skipping date");
            warnings.push(format!("empty games file: {}", games_csv.display()));
            discovery.date_folders_skipped += 1;
            continue;
        }

        let Some(gamepk_column) = games.column(GAME_ID_COLUMN) else {
            warn!(path = %games_csv.display(), "games file lacks a gamePk column, skipping date");
            warnings.push(format!(
                "games file lacks a gamePk column: {}",
                games_csv.display()
            ));
            discovery.date_folders_skipped += 1;
            continue;
        };

        for row in &games.rows {
            let raw = row[gamepk_column].trim();
            let Ok(gamepk) = raw.parse::<i64>() else {
                warn!(path = %games_csv.display(), value = raw, "unparseable gamePk, skipping row");
                warnings.push(format!(
                    "unparseable gamePk {raw:?} in {}",
                    games_csv.display()
                ));
                continue;
            };

            discovery.sources.insert(
                gamepk,
                GameSources {
                    date_folder: folder_date.clone(),
                    games_csv: games_csv.clone(),
                    linescores_csv: sport_dir.join(LINESCORES_FILE),
                    runners_csv: sport_dir.join(RUNNERS_FILE),
                },
            );
        }

        match sha256_file(&games_csv) {
            Ok(sha256) => discovery.games_files.push(GamesFileEntry {
                date_folder: folder_date,
                path: games_csv.display().to_string(),
                sha256,
            }),
            Err(err) => {
                warn!(path = %games_csv.display(), error = %err, "failed to hash games file");
            }
        }

        discovery.date_folders_scanned += 1;
    }

    info!(
        games = discovery.sources.len(),
        dates = discovery.date_folders_scanned,
        "discovery complete"
    );

    Ok(discovery)
}
