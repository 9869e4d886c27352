//! Newline-delimited JSON output, one file per entity.

use indexmap::IndexMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{TableBatch, TableWriter};
use crate::error::SinkError;

/// Appends rows to `<entity>.ndjson`, one JSON object per line with keys in
/// column order. Missing fields are `null`.
#[derive(Debug)]
pub struct NdjsonTableWriter {
    dir: PathBuf,
}

impl NdjsonTableWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}.ndjson", entity))
    }
}

impl TableWriter for NdjsonTableWriter {
    fn write_file(&mut self, batches: &[TableBatch<'_>]) -> Result<usize, SinkError> {
        let mut written = 0;
        for batch in batches {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(batch.entity))?;
            let mut writer = BufWriter::new(file);

            for row in &batch.rows {
                let object: IndexMap<&str, Option<&str>> = batch
                    .columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.project(batch.columns))
                    .collect();
                let json = serde_json::to_string(&object)?;
                writeln!(writer, "{}", json)?;
            }
            writer.flush()?;
            written += batch.rows.len();
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use tempfile::TempDir;

    #[test]
    fn test_rows_in_column_order() {
        let dir = TempDir::new().unwrap();
        let mut writer = NdjsonTableWriter::new(dir.path()).unwrap();
        let columns: Vec<String> = ["id", "title", "issue_date"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let row: Record = [("title", "Pipe \"coupling\""), ("id", "039300018")]
            .into_iter()
            .collect();

        for _ in 0..2 {
            writer
                .write_file(&[TableBatch {
                    entity: "patent",
                    columns: &columns,
                    rows: vec![&row],
                }])
                .unwrap();
        }

        let contents = fs::read_to_string(writer.path_for("patent")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"id":"039300018","title":"Pipe \"coupling\"","issue_date":null}"#
        );

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["id"], "039300018");
    }
}
