use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::model::GameSources;
use crate::table::Frame;

use super::games::filter_rows_by_gamepk;

const INNING_COLUMN: &str = "inning";
const HALF_COLUMN: &str = "half";
const BATTING_TEAM_COLUMN: &str = "battingteamid";
const RUNS_COLUMN: &str = "runs";

const SCORE_COLUMN: &str = "battingteam_score";
const SCORE_DIFF_COLUMN: &str = "battingteam_score_diff";

#[derive(Debug, Default)]
pub struct LinescoreStats {
    pub games_processed: usize,
    pub games_skipped: usize,
    pub rows_loaded: usize,
}

/// Rebuilds the running score for every located game's linescore. A game
/// that cannot be reconstructed (unreadable file, missing columns, not
/// exactly two batting teams, unparseable numerics) drops its entire
/// linescore with a warning; other games are unaffected.
pub fn reconstruct_linescores(
    sources: &BTreeMap<i64, GameSources>,
    warnings: &mut Vec<String>,
) -> (Frame, LinescoreStats) {
    let mut output = Frame::default();
    let mut stats = LinescoreStats::default();

    for (gamepk, game) in sources {
        let linescores = match Frame::read_csv(&game.linescores_csv) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(gamepk, path = %game.linescores_csv.display(), error = %err, "failed to read linescores file, skipping game");
                warnings.push(format!("failed to read linescores for gamePk {gamepk}"));
                stats.games_skipped += 1;
                continue;
            }
        };

        match reconstruct_game_linescore(*gamepk, &linescores) {
            Ok(reconstructed) => {
                stats.games_processed += 1;
                stats.rows_loaded += reconstructed.rows.len();
                output.append_aligned(&reconstructed);
            }
            Err(err) => {
                warn!(gamepk, error = %err, "dropping game linescore");
                warnings.push(format!("dropped linescore for gamePk {gamepk}: {err}"));
                stats.games_skipped += 1;
            }
        }
    }

    output.lowercase_headers();
    info!(rows = stats.rows_loaded, "linescore rows reconstructed");

    (output, stats)
}

/// Reconstructs one game's linescore: rows sorted by `(inning, half)` gain
/// the batting team's score as it stood *before* that half-inning and the
/// differential against the fielding team at the same point. The source row
/// order is not trusted; the sort is the authoritative chronology.
pub fn reconstruct_game_linescore(gamepk: i64, linescores: &Frame) -> Result<Frame> {
    let filtered = filter_rows_by_gamepk(linescores, gamepk)
        .context("linescores file lacks a gamePk column")?;

    let inning_column = filtered
        .column(INNING_COLUMN)
        .context("linescores file lacks an inning column")?;
    let half_column = filtered
        .column(HALF_COLUMN)
        .context("linescores file lacks a half column")?;
    let team_column = filtered
        .column(BATTING_TEAM_COLUMN)
        .context("linescores file lacks a battingteamid column")?;
    let runs_column = filtered
        .column(RUNS_COLUMN)
        .context("linescores file lacks a runs column")?;

    struct HalfInning {
        row: usize,
        inning: i64,
        half: i64,
        team: String,
        runs: i64,
    }

    let mut entries = Vec::with_capacity(filtered.rows.len());
    for (index, row) in filtered.rows.iter().enumerate() {
        let inning = row[inning_column]
            .trim()
            .parse::<i64>()
            .with_context(|| format!("unparseable inning {:?}", row[inning_column]))?;
        let half = parse_half(&row[half_column])?;
        let runs = row[runs_column]
            .trim()
            .parse::<i64>()
            .with_context(|| format!("unparseable runs {:?}", row[runs_column]))?;

        entries.push(HalfInning {
            row: index,
            inning,
            half,
            team: row[team_column].trim().to_string(),
            runs,
        });
    }

    entries.sort_by_key(|entry| (entry.inning, entry.half));

    let mut teams: Vec<String> = Vec::new();
    for entry in &entries {
        if !teams.contains(&entry.team) {
            teams.push(entry.team.clone());
        }
    }
    if teams.len() != 2 {
        bail!("expected 2 batting teams, found {}", teams.len());
    }

    let mut counters = [0_i64, 0_i64];
    let mut scores = Vec::with_capacity(entries.len());
    let mut score_diffs = Vec::with_capacity(entries.len());

    for entry in &entries {
        let batting = usize::from(entry.team != teams[0]);
        let fielding = 1 - batting;

        // Record the scoreboard as it stood before the first pitch of this
        // half-inning, then credit the half-inning's runs.
        scores.push(counters[batting].to_string());
        score_diffs.push((counters[batting] - counters[fielding]).to_string());
        counters[batting] += entry.runs;
    }

    let mut reconstructed = Frame::new(filtered.headers.clone());
    for entry in &entries {
        reconstructed.rows.push(filtered.rows[entry.row].clone());
    }
    reconstructed.push_column(SCORE_COLUMN, scores)?;
    reconstructed.push_column(SCORE_DIFF_COLUMN, score_diffs)?;

    Ok(reconstructed)
}

/// The half column may carry "top"/"bottom" text or an already-ordinal
/// encoding; both normalize to top=0, bottom=1 so that ascending sort is
/// chronological within an inning.
fn parse_half(raw: &str) -> Result<i64> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("top") {
        return Ok(0);
    }
    if value.eq_ignore_ascii_case("bottom") || value.eq_ignore_ascii_case("bot") {
        return Ok(1);
    }

    value
        .parse::<i64>()
        .with_context(|| format!("unparseable half {value:?}"))
}
