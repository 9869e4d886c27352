//! One CSV file per entity.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::{TableBatch, TableWriter};
use crate::error::SinkError;

/// Writes `<entity>.csv` files into a directory.
///
/// Files that already exist are appended to without a header row. Missing
/// fields are written as empty cells.
#[derive(Debug)]
pub struct CsvTableWriter {
    dir: PathBuf,
    /// Files this writer has started, so later input files append quietly
    started: HashSet<String>,
}

impl CsvTableWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            started: HashSet::new(),
        })
    }

    pub fn path_for(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", entity))
    }

    fn write_batch(&mut self, batch: &TableBatch<'_>) -> Result<usize, SinkError> {
        let path = self.path_for(batch.entity);
        let exists = path.exists();
        if exists && !self.started.contains(batch.entity) {
            tracing::warn!(
                "CSV file {} exists; records will be appended.",
                path.display()
            );
        }
        self.started.insert(batch.entity.to_string());

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = ::csv::WriterBuilder::new().from_writer(file);
        if !exists {
            writer.write_record(batch.columns)?;
        }
        for row in &batch.rows {
            writer.write_record(row.project(batch.columns).map(|value| value.unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(batch.rows.len())
    }
}

impl TableWriter for CsvTableWriter {
    fn write_file(&mut self, batches: &[TableBatch<'_>]) -> Result<usize, SinkError> {
        let mut written = 0;
        for batch in batches {
            written += self.write_batch(batch)?;
        }
        Ok(written)
    }
}
