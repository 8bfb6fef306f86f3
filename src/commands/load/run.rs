use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{error, info};

use crate::cli::LoadArgs;
use crate::model::{GamesFileEntry, LoadConfig, LoadCounts, LoadPaths, LoadRunManifest};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use super::{
    RUNNER_KEY_COLUMNS, dedup_keep_last, load_game_rows, locate_games, normalize_runners,
    reconstruct_linescores,
};
use super::sink::Sink;

const GAME_TABLE: &str = "game";
const LINESCORE_TABLE: &str = "linescore";
const RUNNER_TABLE: &str = "runner_play";

pub fn run(args: LoadArgs) -> Result<()> {
    let db_path = resolve_database_url(args.database_url)?;

    let config = LoadConfig {
        data_root: args.data_root,
        sport_dir: args.sport_dir,
        db_path,
        manifest_dir: args.manifest_dir,
        batch_size: args.batch_size,
    };

    execute(&config)?;
    Ok(())
}

pub fn resolve_database_url(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    match env::var("DATABASE_URL") {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => bail!("DATABASE_URL is not set; export it or pass --database-url"),
    }
}

/// Runs the full pipeline: discovery, the three independent transformation
/// phases, runner dedup, then batched appends through one sink connection.
pub fn execute(config: &LoadConfig) -> Result<LoadCounts> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    ensure_directory(&config.manifest_dir)?;
    let manifest_path = config
        .manifest_dir
        .join(format!("load_run_{}.json", utc_compact_string(started_ts)));

    info!(
        data_root = %config.data_root.display(),
        db_path = %config.db_path.display(),
        run_id = %run_id,
        "starting load"
    );

    // Sink connectivity is validated before any file work so a misconfigured
    // destination fails the run immediately.
    let mut sink = Sink::open(&config.db_path, config.batch_size)?;

    let mut warnings = Vec::new();
    let mut counts = LoadCounts::default();

    let discovery = locate_games(config, &mut warnings)?;
    counts.date_folders_scanned = discovery.date_folders_scanned;
    counts.date_folders_skipped = discovery.date_folders_skipped;
    counts.games_discovered = discovery.sources.len();

    if discovery.sources.is_empty() {
        error!("no valid game CSV locations found, nothing to load");
        write_manifest(
            config,
            &manifest_path,
            &run_id,
            "empty",
            &started_at,
            &counts,
            &discovery.games_files,
            &warnings,
        )?;
        return Ok(counts);
    }

    let (games, game_stats) = load_game_rows(&discovery.sources, &mut warnings);
    counts.game_rows_loaded = game_stats.rows_loaded;
    counts.games_skipped = game_stats.games_skipped;

    let (linescores, linescore_stats) = reconstruct_linescores(&discovery.sources, &mut warnings);
    counts.linescore_games_processed = linescore_stats.games_processed;
    counts.linescore_games_skipped = linescore_stats.games_skipped;
    counts.linescore_rows_loaded = linescore_stats.rows_loaded;

    let (mut runners, runner_stats) = normalize_runners(&discovery.sources, &mut warnings);
    counts.runner_games_processed = runner_stats.games_processed;
    counts.runner_games_skipped = runner_stats.games_skipped;

    counts.runner_duplicate_rows_dropped = dedup_keep_last(&mut runners, &RUNNER_KEY_COLUMNS)
        .context("failed to deduplicate runner events")?;
    counts.runner_rows_loaded = runners.rows.len();

    sink.append_frame(GAME_TABLE, &games)?;
    sink.append_frame(LINESCORE_TABLE, &linescores)?;
    sink.append_frame(RUNNER_TABLE, &runners)?;

    write_manifest(
        config,
        &manifest_path,
        &run_id,
        "completed",
        &started_at,
        &counts,
        &discovery.games_files,
        &warnings,
    )?;

    info!(
        games = counts.game_rows_loaded,
        linescores = counts.linescore_rows_loaded,
        runners = counts.runner_rows_loaded,
        duplicates_dropped = counts.runner_duplicate_rows_dropped,
        "load complete"
    );

    Ok(counts)
}

#[allow(clippy::too_many_arguments)]
fn write_manifest(
    config: &LoadConfig,
    manifest_path: &Path,
    run_id: &str,
    status: &str,
    started_at: &str,
    counts: &LoadCounts,
    games_files: &[GamesFileEntry],
    warnings: &[String],
) -> Result<()> {
    let manifest = LoadRunManifest {
        manifest_version: 1,
        run_id: run_id.to_string(),
        status: status.to_string(),
        started_at: started_at.to_string(),
        updated_at: now_utc_string(),
        paths: LoadPaths {
            data_root: config.data_root.display().to_string(),
            manifest_dir: config.manifest_dir.display().to_string(),
            db_path: config.db_path.display().to_string(),
        },
        counts: counts.clone(),
        source_hashes: games_files.to_vec(),
        warnings: warnings.to_vec(),
    };

    write_json_pretty(manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote load manifest");

    Ok(())
}
