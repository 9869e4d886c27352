//! Input file discovery.

use std::path::{Path, PathBuf};

use crate::error::InputError;

/// Expand input expressions into the list of files to convert.
///
/// Each expression is a glob. Matched files are used as-is; matched
/// directories contribute their `.txt` files (any case), recursively when
/// `recurse` is set. An expression that matches nothing is an error.
pub fn discover_inputs<S: AsRef<str>>(inputs: &[S], recurse: bool) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let matches = glob_paths(input)?;
        if matches.is_empty() {
            return Err(InputError::NoMatch(input.to_string()));
        }

        for path in matches {
            if path.is_file() {
                files.push(path);
            } else if path.is_dir() {
                files.extend(txt_files_in(&path, recurse)?);
            } else {
                return Err(InputError::NoMatch(path.display().to_string()));
            }
        }
    }

    tracing::debug!(files = files.len(), "Resolved input files");
    Ok(files)
}

fn glob_paths(pattern: &str) -> Result<Vec<PathBuf>, InputError> {
    let paths = glob::glob(pattern).map_err(|source| InputError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(paths.collect::<Result<Vec<_>, _>>()?)
}

fn txt_files_in(dir: &Path, recurse: bool) -> Result<Vec<PathBuf>, InputError> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = if recurse {
        format!("{}/**/*.[tT][xX][tT]", base)
    } else {
        format!("{}/*.[tT][xX][tT]", base)
    };

    Ok(glob_paths(&pattern)?
        .into_iter()
        .filter(|path| path.is_file())
        .collect())
}
