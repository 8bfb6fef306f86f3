use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::load::resolve_database_url;
use crate::model::LoadRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_database_url(args.database_url)?;

    if let Some(manifest_path) = latest_manifest_path(&args.manifest_dir)? {
        let raw = fs::read(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: LoadRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            status = %manifest.status,
            started_at = %manifest.started_at,
            updated_at = %manifest.updated_at,
            games_discovered = manifest.counts.games_discovered,
            game_rows = manifest.counts.game_rows_loaded,
            linescore_rows = manifest.counts.linescore_rows_loaded,
            runner_rows = manifest.counts.runner_rows_loaded,
            warnings = manifest.warnings.len(),
            "latest load manifest"
        );
    } else {
        warn!(dir = %args.manifest_dir.display(), "no load manifests found");
    }

    if db_path.exists() {
        let connection = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let games = query_count(&connection, "SELECT COUNT(*) FROM game").unwrap_or(0);
        let linescores = query_count(&connection, "SELECT COUNT(*) FROM linescore").unwrap_or(0);
        let runner_plays =
            query_count(&connection, "SELECT COUNT(*) FROM runner_play").unwrap_or(0);

        info!(
            path = %db_path.display(),
            games,
            linescores,
            runner_plays,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// Manifest filenames embed a compact UTC timestamp, so the lexically
/// greatest name is the most recent run.
fn latest_manifest_path(manifest_dir: &std::path::Path) -> Result<Option<std::path::PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?;

    let mut latest = None;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to list {}", manifest_dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("load_run_") && name.ends_with(".json") {
            let path = entry.path();
            if latest
                .as_ref()
                .is_none_or(|(latest_name, _)| *latest_name < name)
            {
                latest = Some((name, path));
            }
        }
    }

    Ok(latest.map(|(_, path)| path))
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
