use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::model::GameSources;
use crate::table::Frame;

use super::locate::GAME_ID_COLUMN;

#[derive(Debug, Default)]
pub struct GameLoadStats {
    pub rows_loaded: usize,
    pub games_skipped: usize,
}

/// Re-reads each located game's games file and keeps the row(s) declaring
/// that `gamePk`. A game whose file cannot be read or no longer mentions the
/// identifier is skipped with a warning; every row that does match is
/// retained, so one file may legitimately contribute several rows.
pub fn load_game_rows(
    sources: &BTreeMap<i64, GameSources>,
    warnings: &mut Vec<String>,
) -> (Frame, GameLoadStats) {
    let mut output = Frame::default();
    let mut stats = GameLoadStats::default();

    for (gamepk, game) in sources {
        let games = match Frame::read_csv(&game.games_csv) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(gamepk, path = %game.games_csv.display(), error = %err, "failed to read games file, skipping game");
                warnings.push(format!("failed to read games file for gamePk {gamepk}"));
                stats.games_skipped += 1;
                continue;
            }
        };

        let Some(matched) = filter_rows_by_gamepk(&games, *gamepk) else {
            warn!(gamepk, path = %game.games_csv.display(), "games file lacks a gamePk column, skipping game");
            warnings.push(format!(
                "games file lacks a gamePk column: {}",
                game.games_csv.display()
            ));
            stats.games_skipped += 1;
            continue;
        };

        if matched.is_empty() {
            warn!(gamepk, path = %game.games_csv.display(), "gamePk not found in games file, skipping game");
            warnings.push(format!(
                "gamePk {gamepk} not found in {}",
                game.games_csv.display()
            ));
            stats.games_skipped += 1;
            continue;
        }

        stats.rows_loaded += matched.rows.len();
        output.append_aligned(&matched);
    }

    output.lowercase_headers();
    info!(rows = stats.rows_loaded, "game rows loaded");

    (output, stats)
}

/// Keeps the rows whose game-identifier cell parses to `gamepk`. Returns
/// `None` when the frame has no identifier column at all.
pub fn filter_rows_by_gamepk(frame: &Frame, gamepk: i64) -> Option<Frame> {
    let column = frame.column(GAME_ID_COLUMN)?;

    let mut filtered = Frame::new(frame.headers.clone());
    for row in &frame.rows {
        if row[column].trim().parse::<i64>() == Ok(gamepk) {
            filtered.rows.push(row.clone());
        }
    }

    Some(filtered)
}
