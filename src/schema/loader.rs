//! YAML schema loader.
//!
//! Reads the field-mapping file and hands the parsed tree to the compiler.

use serde_yaml::Value;
use std::fs;
use std::path::Path;

use crate::error::SchemaError;
use crate::schema::compiler::compile_schema;
use crate::schema::types::CompiledSchema;

/// Load and compile a field-mapping schema from a YAML file
///
/// # Arguments
///
/// * `path` - Path to the YAML mapping
/// * `root_marker` - Header tag that begins each document (e.g. `PATN`)
///
/// # Example
///
/// ```ignore
/// use aps_tabular::schema::load_schema;
///
/// let schema = load_schema("config/aps_fields.yaml", "PATN")?;
/// println!("{} entities", schema.entities().count());
/// ```
pub fn load_schema<P: AsRef<Path>>(
    path: P,
    root_marker: &str,
) -> Result<CompiledSchema, SchemaError> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_schema(&contents, root_marker)
}

/// Compile a schema from YAML text
pub fn parse_schema(contents: &str, root_marker: &str) -> Result<CompiledSchema, SchemaError> {
    let tree: Value = serde_yaml::from_str(contents)?;
    compile_schema(&tree, root_marker)
}
