//! Converter settings.
//!
//! Settings come from the command line, or from a YAML file with the same
//! field names. Every field except `inputs` has a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::{Joiner, DEFAULT_JOINER};
use crate::sink::sqlite::DEFAULT_BATCH_SIZE;

/// Name of the SQLite database file inside the output directory
pub const SQLITE_FILENAME: &str = "db.sqlite";

/// Output collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// One `<entity>.csv` per table
    #[default]
    Csv,
    /// Single `db.sqlite` database
    Sqlite,
    /// One `<entity>.ndjson` per table
    Ndjson,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Csv => write!(f, "csv"),
            OutputType::Sqlite => write!(f, "sqlite"),
            OutputType::Ndjson => write!(f, "ndjson"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Files, directories or glob expressions
    pub inputs: Vec<String>,

    /// Search directories recursively for `.txt` files
    #[serde(default)]
    pub recurse: bool,

    /// Field-mapping schema
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Output directory
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default)]
    pub output_type: OutputType,

    /// Remove existing output before converting
    #[serde(default)]
    pub clean: bool,

    /// Joiner for repeated fields whose rule names none
    #[serde(default = "default_joiner")]
    pub joiner: String,

    /// Header tag that starts each document
    #[serde(default = "default_root_marker")]
    pub root_marker: String,

    /// Rows per SQLite INSERT
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// YAML ignore list replacing the built-in one
    #[serde(default)]
    pub ignore_list: Option<PathBuf>,
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("config/aps_fields.yaml")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output")
}

fn default_joiner() -> String {
    DEFAULT_JOINER.to_string()
}

fn default_root_marker() -> String {
    "PATN".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            recurse: false,
            schema_path: default_schema_path(),
            output_path: default_output_path(),
            output_type: OutputType::default(),
            clean: false,
            joiner: default_joiner(),
            root_marker: default_root_marker(),
            batch_size: default_batch_size(),
            ignore_list: None,
        }
    }
}

impl ConverterConfig {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Reject settings that cannot produce a valid run
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Config("no input paths given".to_string()));
        }
        if Joiner::parse(&self.joiner) == Joiner::NewRecord {
            return Err(Error::Config(format!(
                "'{}' cannot be used as the default joiner",
                self.joiner
            )));
        }
        if self.root_marker.trim().is_empty() {
            return Err(Error::Config("root marker must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Path of the SQLite database for this run
    pub fn sqlite_path(&self) -> PathBuf {
        self.output_path.join(SQLITE_FILENAME)
    }
}
