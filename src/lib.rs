//! # aps-tabular: USPTO APS full text to relational tables
//!
//! The USPTO published patent grants from 1976 to 2001 in the APS "Green
//! Book" format: fixed-width text where every line starts with a short
//! header tag. This crate converts those files into one table per entity
//! (patents, inventors, classifications, citations, ...) as directed by a
//! YAML field-mapping schema.
//!
//! ## Pipeline
//!
//! 1. [`schema`] compiles the YAML mapping into per-section rule tables.
//! 2. [`segment`] splits each input file into per-patent documents.
//! 3. [`extractor`] walks a document line by line and emits rows.
//! 4. [`sink`] filters known-bad records and writes CSV, NDJSON or SQLite.
//!
//! [`Converter`] drives the whole run from a [`ConverterConfig`].
//!
//! ## Example schema
//!
//! ```yaml
//! PATN:
//!   <entity>: patent
//!   <primary_key>: WKU
//!   <fields>:
//!     WKU: patent_number
//!     TTL: title
//! INVT:
//!   <entity>: inventor
//!   <fields>:
//!     NAM: name
//!     CTY: city
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod extractor;
pub mod input;
pub mod record;
pub mod schema;
pub mod segment;
pub mod sink;

pub use config::{ConverterConfig, OutputType};
pub use converter::{ConversionSummary, Converter};
pub use error::{Error, ExtractError, InputError, Result, SchemaError, SinkError};
pub use extractor::{
    split_line, DocumentSummary, ExtractionObserver, NullObserver, RecordExtractor,
    TracingObserver,
};
pub use input::discover_inputs;
pub use record::{Record, Tables};
pub use schema::{compile_schema, load_schema, parse_schema, CompiledSchema};
pub use segment::{Document, DocumentSegmenter};
pub use sink::{IgnoreList, TableBatch, TableSink, TableWriter};
