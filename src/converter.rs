//! Conversion driver: input files in, tables out.

use indexmap::IndexMap;
use std::fs;
use std::path::Path;

use crate::config::{ConverterConfig, OutputType};
use crate::error::{Error, Result};
use crate::extractor::{ExtractionObserver, RecordExtractor, TracingObserver};
use crate::input::discover_inputs;
use crate::schema::{load_schema, CompiledSchema};
use crate::segment::DocumentSegmenter;
use crate::sink::{
    CsvTableWriter, IgnoreList, NdjsonTableWriter, SqliteStore, TableSink, TableWriter,
};

/// Totals for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub files: usize,
    pub documents: usize,
    /// Rows written per entity
    pub rows: IndexMap<String, usize>,
    /// Rows dropped by the ignore list
    pub dropped: usize,
}

impl ConversionSummary {
    pub fn total_rows(&self) -> usize {
        self.rows.values().sum()
    }
}

pub struct Converter {
    config: ConverterConfig,
    schema: CompiledSchema,
    ignore: IgnoreList,
}

impl Converter {
    /// Validate settings, then load the schema and the ignore list
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        let schema = load_schema(&config.schema_path, &config.root_marker)?;
        Self::with_schema(config, schema)
    }

    /// Use an already compiled schema instead of `config.schema_path`
    pub fn with_schema(config: ConverterConfig, schema: CompiledSchema) -> Result<Self> {
        config.validate()?;
        let ignore = match &config.ignore_list {
            Some(path) => IgnoreList::load(path)?,
            None => IgnoreList::builtin(),
        };
        Ok(Self {
            config,
            schema,
            ignore,
        })
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert every input file, flushing tables after each one
    pub fn convert(&self) -> Result<ConversionSummary> {
        let files = discover_inputs(&self.config.inputs, self.config.recurse)?;
        if files.is_empty() {
            tracing::warn!("No input files to process!");
        }

        self.prepare_output()?;
        let mut sink = TableSink::new(self.open_writer()?, self.ignore.clone());
        let extractor =
            RecordExtractor::new(&self.schema).with_default_joiner(&self.config.joiner)?;
        let mut observer = TracingObserver;

        let mut summary = ConversionSummary::default();
        for path in &files {
            self.convert_file(path, &extractor, &mut sink, &mut observer, &mut summary)?;
            summary.files += 1;
        }

        tracing::info!(
            files = summary.files,
            documents = summary.documents,
            rows = summary.total_rows(),
            "Parsing complete!"
        );
        Ok(summary)
    }

    fn convert_file<W: TableWriter, O: ExtractionObserver>(
        &self,
        path: &Path,
        extractor: &RecordExtractor<'_>,
        sink: &mut TableSink<W>,
        observer: &mut O,
        summary: &mut ConversionSummary,
    ) -> Result<()> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::info!("Processing {}...", path.display());

        let io_error = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let segmenter = DocumentSegmenter::open(path, &self.config.root_marker).map_err(io_error)?;

        let mut documents = 0;
        for document in segmenter {
            let document = document.map_err(io_error)?;
            if documents % 100 == 0 {
                tracing::debug!("Processing document {}...", documents + 1);
            }
            extractor
                .extract(&document, &filename, sink.tables_mut(), observer)
                .map_err(|source| Error::Extract {
                    file: filename.clone(),
                    source,
                })?;
            documents += 1;
        }
        tracing::info!("...{} records processed!", documents);

        let stats = sink.flush(&self.schema, &filename)?;
        for (entity, rows) in stats.rows {
            *summary.rows.entry(entity).or_insert(0) += rows;
        }
        summary.dropped += stats.dropped;
        summary.documents += documents;
        Ok(())
    }

    /// Clear the output location when asked and make sure it exists
    fn prepare_output(&self) -> Result<()> {
        let output = &self.config.output_path;
        let io_error = |source| Error::Io {
            path: output.clone(),
            source,
        };

        if self.config.clean && output.exists() {
            tracing::info!("Removing existing output in {}", output.display());
            fs::remove_dir_all(output).map_err(io_error)?;
        }
        fs::create_dir_all(output).map_err(io_error)?;
        Ok(())
    }

    fn open_writer(&self) -> Result<Box<dyn TableWriter>> {
        let output = &self.config.output_path;
        let writer: Box<dyn TableWriter> = match self.config.output_type {
            OutputType::Csv => Box::new(CsvTableWriter::new(output)?),
            OutputType::Ndjson => Box::new(NdjsonTableWriter::new(output)?),
            OutputType::Sqlite => {
                let path = self.config.sqlite_path();
                tracing::info!("Writing records to {} ...", path.display());
                Box::new(SqliteStore::open(path, self.config.batch_size)?)
            }
        };
        Ok(writer)
    }
}
