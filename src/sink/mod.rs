//! Output side of a conversion.
//!
//! [`TableSink`] accumulates the rows of one input file and hands them to a
//! [`TableWriter`] once the file is done. Rows belonging to documents on the
//! [`IgnoreList`] are dropped at that point.

pub mod csv;
pub mod ignore;
pub mod ndjson;
pub mod sqlite;

pub use self::csv::CsvTableWriter;
pub use ignore::IgnoreList;
pub use ndjson::NdjsonTableWriter;
pub use sqlite::SqliteStore;

use indexmap::IndexMap;

use crate::error::SinkError;
use crate::record::{Record, Tables};
use crate::schema::CompiledSchema;

/// Rows of one entity with the column order they are written in.
#[derive(Debug, Clone)]
pub struct TableBatch<'a> {
    pub entity: &'a str,
    pub columns: &'a [String],
    pub rows: Vec<&'a Record>,
}

/// Destination for flushed tables.
pub trait TableWriter {
    /// Write every batch of one input file, returning the number of rows written
    fn write_file(&mut self, batches: &[TableBatch<'_>]) -> Result<usize, SinkError>;
}

impl<W: TableWriter + ?Sized> TableWriter for Box<W> {
    fn write_file(&mut self, batches: &[TableBatch<'_>]) -> Result<usize, SinkError> {
        (**self).write_file(batches)
    }
}

/// Counts from one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Rows written per entity, in write order
    pub rows: IndexMap<String, usize>,
    pub dropped: usize,
}

impl FlushStats {
    pub fn written(&self) -> usize {
        self.rows.values().sum()
    }
}

pub struct TableSink<W> {
    writer: W,
    ignore: IgnoreList,
    tables: Tables,
}

impl<W: TableWriter> TableSink<W> {
    pub fn new(writer: W, ignore: IgnoreList) -> Self {
        Self {
            writer,
            ignore,
            tables: Tables::new(),
        }
    }

    /// Tables collecting rows of the file being converted
    pub fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Write the accumulated rows of `filename` and clear them.
    ///
    /// A row is dropped when its own id or its parent id is ignored for
    /// this file.
    pub fn flush(&mut self, schema: &CompiledSchema, filename: &str) -> Result<FlushStats, SinkError> {
        let ignored = self.ignore.for_file(filename);
        let parent_field = schema.parent_field();
        let mut stats = FlushStats::default();
        let mut batches = Vec::new();

        for (entity, rows) in self.tables.iter() {
            let Some(columns) = schema.columns(entity) else {
                tracing::warn!(entity, "Skipping rows of an entity the schema does not declare");
                continue;
            };

            let kept: Vec<&Record> = rows
                .iter()
                .filter(|row| match ignored {
                    Some(ids) => ![row.id(), row.get(parent_field)]
                        .into_iter()
                        .flatten()
                        .any(|id| ids.contains(id)),
                    None => true,
                })
                .collect();
            stats.dropped += rows.len() - kept.len();

            if kept.is_empty() {
                continue;
            }
            tracing::debug!(entity, rows = kept.len(), "Writing table");
            stats.rows.insert(entity.to_string(), kept.len());
            batches.push(TableBatch {
                entity,
                columns,
                rows: kept,
            });
        }

        if !batches.is_empty() {
            self.writer.write_file(&batches)?;
        }
        if stats.dropped > 0 {
            tracing::info!(file = filename, rows = stats.dropped, "Dropped ignored records");
        }

        self.tables.clear();
        Ok(stats)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}
