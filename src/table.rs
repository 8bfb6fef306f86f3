use std::path::Path;

use anyhow::{Context, Result, bail};

/// Header-plus-rows view of one tabular CSV file. Cells are kept as text;
/// numeric fields are parsed at the point of use. Every row holds exactly
/// `headers.len()` cells (short source rows are padded, long ones truncated).
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("failed to open csv: {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read csv headers: {}", path.display()))?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("failed to read csv row: {}", path.display()))?;
            let mut row: Vec<String> = record.iter().map(ToOwned::to_owned).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    }

    pub fn lowercase_headers(&mut self) {
        for header in &mut self.headers {
            *header = header.to_lowercase();
        }
    }

    pub fn push_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            bail!(
                "column {name} has {} values for {} rows",
                values.len(),
                self.rows.len()
            );
        }

        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }

        Ok(())
    }

    /// Appends another frame's rows, aligning columns by case-insensitive
    /// header name. Columns new to `self` are added with empty backfill for
    /// existing rows; columns missing from `other` stay empty on its rows.
    pub fn append_aligned(&mut self, other: &Frame) {
        if self.headers.is_empty() {
            self.headers = other.headers.clone();
            self.rows.extend(other.rows.iter().cloned());
            return;
        }

        let mut index_map = Vec::with_capacity(other.headers.len());
        for header in &other.headers {
            let target = match self.column(header) {
                Some(index) => index,
                None => {
                    self.headers.push(header.clone());
                    for row in &mut self.rows {
                        row.push(String::new());
                    }
                    self.headers.len() - 1
                }
            };
            index_map.push(target);
        }

        for row in &other.rows {
            let mut aligned = vec![String::new(); self.headers.len()];
            for (source, target) in index_map.iter().enumerate() {
                aligned[*target] = row[source].clone();
            }
            self.rows.push(aligned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(headers: &[&str], rows: &[&[&str]]) -> Frame {
        Frame {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        }
    }

    #[test]
    fn column_lookup_ignores_case() {
        let table = frame(&["gamePk", "inning"], &[&["1", "2"]]);
        assert_eq!(table.column("gamepk"), Some(0));
        assert_eq!(table.column("INNING"), Some(1));
        assert_eq!(table.column("half"), None);
    }

    #[test]
    fn append_aligned_unifies_differing_headers() {
        let mut target = frame(&["a", "b"], &[&["1", "2"]]);
        let other = frame(&["B", "c"], &[&["3", "4"]]);

        target.append_aligned(&other);

        assert_eq!(target.headers, vec!["a", "b", "c"]);
        assert_eq!(target.rows[0], vec!["1", "2", ""]);
        assert_eq!(target.rows[1], vec!["", "3", "4"]);
    }

    #[test]
    fn append_aligned_into_empty_frame_adopts_headers() {
        let mut target = Frame::default();
        target.append_aligned(&frame(&["x"], &[&["1"]]));

        assert_eq!(target.headers, vec!["x"]);
        assert_eq!(target.rows, vec![vec!["1".to_string()]]);
    }

    #[test]
    fn push_column_rejects_length_mismatch() {
        let mut table = frame(&["a"], &[&["1"], &["2"]]);
        assert!(table.push_column("b", vec!["x".to_string()]).is_err());
        assert!(
            table
                .push_column("b", vec!["x".to_string(), "y".to_string()])
                .is_ok()
        );
        assert_eq!(table.rows[1], vec!["2", "y"]);
    }

    #[test]
    fn read_csv_pads_short_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "a,b,c\n1,2\n").expect("write csv");

        let table = Frame::read_csv(&path).expect("read csv");
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }
}
