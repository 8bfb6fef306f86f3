use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use rusqlite::{Connection, params_from_iter};
use tracing::info;

use crate::table::Frame;

/// Append-only SQLite sink. One connection is opened at startup and used for
/// every batched append; re-running a load against already-loaded data
/// produces duplicate rows unless the destination enforces uniqueness.
pub struct Sink {
    connection: Connection,
    batch_size: usize,
    identifier: Regex,
}

impl Sink {
    pub fn open(db_path: &Path, batch_size: usize) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        connection
            .pragma_update(None, "journal_mode", "WAL")
            .context("failed to set journal_mode=WAL")?;
        connection
            .pragma_update(None, "synchronous", "NORMAL")
            .context("failed to set synchronous=NORMAL")?;

        let identifier =
            Regex::new(r"^[a-z_][a-z0-9_]*$").context("failed to compile identifier regex")?;

        Ok(Self {
            connection,
            batch_size: batch_size.max(1),
            identifier,
        })
    }

    /// Appends a frame to `table`, creating the table from the frame's
    /// case-folded headers on first contact and adding any columns an
    /// existing table lacks. Returns the number of rows written.
    pub fn append_frame(&mut self, table: &str, frame: &Frame) -> Result<usize> {
        if frame.is_empty() {
            return Ok(0);
        }

        let columns: Vec<String> = frame
            .headers
            .iter()
            .map(|header| self.sanitize_identifier(header))
            .collect::<Result<_>>()?;
        if !self.identifier.is_match(table) {
            bail!("invalid table name: {table}");
        }

        self.ensure_table(table, &columns)?;

        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let quoted = columns
            .iter()
            .map(|column| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!("INSERT INTO \"{table}\"({quoted}) VALUES({placeholders})");

        let mut written = 0;
        for chunk in frame.rows.chunks(self.batch_size) {
            let tx = self.connection.transaction()?;
            {
                let mut statement = tx
                    .prepare(&insert_sql)
                    .with_context(|| format!("failed to prepare insert into {table}"))?;
                for row in chunk {
                    statement
                        .execute(params_from_iter(row.iter().map(|cell| {
                            if cell.trim().is_empty() {
                                None
                            } else {
                                Some(cell.as_str())
                            }
                        })))
                        .with_context(|| format!("failed to append row to {table}"))?;
                    written += 1;
                }
            }
            tx.commit()
                .with_context(|| format!("failed to commit batch into {table}"))?;
        }

        info!(table, rows = written, "appended batch");
        Ok(written)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        if !self.identifier.is_match(table) {
            bail!("invalid table name: {table}");
        }
        let count = self
            .connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn ensure_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let definitions = columns
            .iter()
            .map(|column| format!("\"{column}\" TEXT"))
            .collect::<Vec<_>>()
            .join(", ");
        self.connection
            .execute(
                &format!("CREATE TABLE IF NOT EXISTS \"{table}\" ({definitions})"),
                [],
            )
            .with_context(|| format!("failed to create table {table}"))?;

        for column in columns {
            self.ensure_column_exists(table, column)?;
        }

        Ok(())
    }

    fn ensure_column_exists(&self, table: &str, column: &str) -> Result<()> {
        let pragma_sql = format!("PRAGMA table_info(\"{table}\")");
        let mut statement = self
            .connection
            .prepare(&pragma_sql)
            .with_context(|| format!("failed to inspect schema for table {table}"))?;

        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let existing: String = row.get(1)?;
            if existing == column {
                return Ok(());
            }
        }

        self.connection
            .execute(
                &format!("ALTER TABLE \"{table}\" ADD COLUMN \"{column}\" TEXT"),
                [],
            )
            .with_context(|| format!("failed to add column {column} on {table}"))?;

        Ok(())
    }

    /// Lower-cases a source header and replaces anything SQLite would choke
    /// on in an identifier. Source headers are carried through verbatim
    /// otherwise, so this is the only place they get rewritten.
    fn sanitize_identifier(&self, header: &str) -> Result<String> {
        let mut cleaned: String = header
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if cleaned
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_digit())
        {
            cleaned.insert(0, '_');
        }

        if !self.identifier.is_match(&cleaned) {
            bail!("unusable column name: {header:?}");
        }

        Ok(cleaned)
    }
}

/// Drops duplicate rows sharing the composite key columns, keeping the last
/// occurrence of each key in its original position. Returns the number of
/// rows dropped.
pub fn dedup_keep_last(frame: &mut Frame, key_columns: &[&str]) -> Result<usize> {
    let mut indices = Vec::with_capacity(key_columns.len());
    for name in key_columns {
        indices.push(
            frame
                .column(name)
                .with_context(|| format!("missing dedup key column: {name}"))?,
        );
    }

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut keep = vec![false; frame.rows.len()];
    for (position, row) in frame.rows.iter().enumerate().rev() {
        let key: Vec<String> = indices.iter().map(|index| row[*index].clone()).collect();
        if seen.insert(key) {
            keep[position] = true;
        }
    }

    let before = frame.rows.len();
    let mut keep_flags = keep.into_iter();
    frame.rows.retain(|_| keep_flags.next().unwrap_or(false));

    Ok(before - frame.rows.len())
}
