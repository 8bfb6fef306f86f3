use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::model::{Base, GameSources};
use crate::table::Frame;

use super::games::filter_rows_by_gamepk;

/// Fixed projection of the runner_play table, in output order.
pub const RUNNER_OUTPUT_COLUMNS: [&str; 15] = [
    "gamepk",
    "atbatindex",
    "playindex",
    "runnerid",
    "playid",
    "runnerfullname",
    "startbase",
    "endbase",
    "reachedbase",
    "is_out",
    "eventtype",
    "movementreason",
    "is_risp",
    "is_firsttothird",
    "is_secondtohome",
];

/// Composite natural key of a runner event; duplicates on this key keep the
/// last occurrence at merge time.
pub const RUNNER_KEY_COLUMNS: [&str; 4] = ["gamepk", "atbatindex", "playindex", "runnerid"];

#[derive(Debug, Default)]
pub struct RunnerStats {
    pub games_processed: usize,
    pub games_skipped: usize,
    pub rows_loaded: usize,
}

/// Normalizes every located game's baserunning events. A zero-row runners
/// file contributes nothing and is not an error; an unreadable file or one
/// missing required columns skips that game with a warning.
pub fn normalize_runners(
    sources: &BTreeMap<i64, GameSources>,
    warnings: &mut Vec<String>,
) -> (Frame, RunnerStats) {
    let mut output = Frame::default();
    let mut stats = RunnerStats::default();

    for (gamepk, game) in sources {
        let runners = match Frame::read_csv(&game.runners_csv) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(gamepk, path = %game.runners_csv.display(), error = %err, "failed to read runners file, skipping game");
                warnings.push(format!("failed to read runners for gamePk {gamepk}"));
                stats.games_skipped += 1;
                continue;
            }
        };

        if runners.is_empty() {
            continue;
        }

        match normalize_game_runners(*gamepk, &runners) {
            Ok(normalized) => {
                stats.games_processed += 1;
                stats.rows_loaded += normalized.rows.len();
                output.append_aligned(&normalized);
            }
            Err(err) => {
                warn!(gamepk, error = %err, "skipping game runners");
                warnings.push(format!("skipped runners for gamePk {gamepk}: {err}"));
                stats.games_skipped += 1;
            }
        }
    }

    if output.headers.is_empty() {
        output = Frame::new(
            RUNNER_OUTPUT_COLUMNS
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
    }

    info!(rows = stats.rows_loaded, "runner rows normalized");

    (output, stats)
}

/// Normalizes one game's runner events into the fixed runner_play
/// projection: canonical base labels, `reachedbase` mirroring the end base,
/// and the derived tactical flags.
pub fn normalize_game_runners(gamepk: i64, runners: &Frame) -> Result<Frame> {
    let filtered =
        filter_rows_by_gamepk(runners, gamepk).context("runners file lacks a gamePk column")?;

    let at_bat_index = required_column(&filtered, "atBatIndex")?;
    let play_index = required_column(&filtered, "playIndex")?;
    let runner_id = required_column(&filtered, "runnerid")?;
    let play_id = required_column(&filtered, "playId")?;
    let runner_name = required_column(&filtered, "runnerfullName")?;
    let is_out = required_column(&filtered, "isOut")?;
    let event = required_column(&filtered, "event")?;
    let movement_reason = required_column(&filtered, "movementReason")?;
    let end = required_column(&filtered, "end")?;

    // A dedicated start column takes precedence over the generic origin
    // field; older exports only carry originBase.
    let start = filtered.column("start");
    let origin = filtered.column("originBase");
    if start.is_none() && origin.is_none() {
        bail!("runners file lacks a start or originBase column");
    }

    let mut normalized = Frame::new(
        RUNNER_OUTPUT_COLUMNS
            .iter()
            .map(ToString::to_string)
            .collect(),
    );

    for row in &filtered.rows {
        let start_raw = start
            .or(origin)
            .map(|column| row[column].as_str())
            .unwrap_or_default();
        let start_base = Base::normalize(start_raw);
        let end_base = Base::normalize(&row[end]);

        let is_home_run = {
            let event_text = row[event].to_ascii_lowercase();
            event_text.contains("home run") || event_text.contains("homerun")
        };

        let is_risp = matches!(start_base, Base::Second | Base::Third);
        let is_first_to_third =
            start_base == Base::First && end_base == Base::Third && !is_home_run;
        let is_second_to_home =
            start_base == Base::Second && end_base == Base::Home && !is_home_run;

        normalized.rows.push(vec![
            gamepk.to_string(),
            row[at_bat_index].clone(),
            row[play_index].clone(),
            row[runner_id].clone(),
            row[play_id].clone(),
            row[runner_name].clone(),
            start_base.as_str().to_string(),
            end_base.as_str().to_string(),
            end_base.as_str().to_string(),
            row[is_out].clone(),
            row[event].clone(),
            row[movement_reason].clone(),
            flag(is_risp),
            flag(is_first_to_third),
            flag(is_second_to_home),
        ]);
    }

    Ok(normalized)
}

fn required_column(frame: &Frame, name: &str) -> Result<usize> {
    frame
        .column(name)
        .with_context(|| format!("runners file lacks a {name} column"))
}

fn flag(value: bool) -> String {
    if value { "1".to_string() } else { "0".to_string() }
}
