//! Error types for schema compilation, input discovery, extraction and output.
//!
//! Each stage has its own enum so callers can match on the failure that
//! concerns them; [`Error`] wraps all of them for the top-level driver.

use std::path::PathBuf;

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or compiling the field-mapping schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Schema file could not be read
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema file is not valid YAML
    #[error("Failed to parse schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A node matches none of the recognised rule shapes
    #[error("Invalid configuration at {path}:\n{fragment}")]
    InvalidNode { path: String, fragment: String },

    /// A header pattern is not a valid regular expression
    #[error("Invalid header pattern '{pattern}' at {path}: {source}")]
    InvalidPattern {
        path: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The section keyed by the root marker is absent
    #[error("Schema has no section for root marker '{0}'")]
    MissingRootSection(String),

    /// The root section does not name a primary key tag
    #[error("Root section '{0}' must declare <primary_key>")]
    MissingPrimaryKey(String),

    /// `<primary_key>` declared outside the root section
    #[error("Section '{section}' declares <primary_key> but only the root section '{root}' may")]
    MisplacedPrimaryKey { section: String, root: String },

    /// `<new_record>` used where a text joiner is required
    #[error("'<new_record>' cannot be used as the default joiner")]
    NewRecordDefaultJoiner,
}

/// Errors raised while resolving input paths.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Glob expression could not be parsed
    #[error("Invalid input pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A matched path could not be read
    #[error("Failed to read input path: {0}")]
    Glob(#[from] glob::GlobError),

    /// Expression matched no file or directory
    #[error("Specified input is invalid: {0}")]
    NoMatch(String),
}

/// Errors raised by the record extractor for one document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The primary key tag occurred a second time in a document
    #[error(
        "Duplicate primary key '{tag}' at line {line}: '{duplicate}' after '{existing}'"
    )]
    DuplicatePrimaryKey {
        tag: String,
        line: usize,
        existing: String,
        duplicate: String,
    },

    /// A row needed the document root id before the primary key line
    #[error("Document at line {line} has no primary key '{tag}' before {context}")]
    MissingPrimaryKey {
        tag: String,
        line: usize,
        context: String,
    },
}

/// Errors raised while writing tables to an output collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite connection could not be established
    #[error("Database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// SQLite statement failed
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Top-level error for a conversion run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Invalid converter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_node_names_fragment() {
        let err = SchemaError::InvalidNode {
            path: "PATN.<fields>.TTL".to_string(),
            fragment: "- 1\n- 2\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PATN.<fields>.TTL"));
        assert!(msg.contains("- 1"));
    }

    #[test]
    fn test_extract_error_wraps_file() {
        let err = Error::Extract {
            file: "pftaps19760106_wk01.txt".to_string(),
            source: ExtractError::DuplicatePrimaryKey {
                tag: "WKU".to_string(),
                line: 12,
                existing: "039300018".to_string(),
                duplicate: "039300026".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("pftaps19760106_wk01.txt: Duplicate primary key 'WKU'"));
        assert!(msg.contains("line 12"));
    }
}
