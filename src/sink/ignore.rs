//! Records known to be erroneous in the published data.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Patent numbers the USPTO has confirmed were published in error.
const BUILTIN: &[(&str, &[&str])] = &[
    ("pftaps19871103_wk44.txt", &["047029323", "047029382"]),
    (
        "pftaps19871110_wk45.txt",
        &[
            "H00003670", "H00003689", "H00003743", "047035218", "047035404", "047035781",
            "047031492", "047031883", "047032049", "047032634", "047032952", "047033185",
            "047033908", "047033894", "047034327", "047034335", "047034491", "047034653",
            "047035170",
        ],
    ),
];

/// Per input file, the ids whose rows are dropped at flush time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    entries: HashMap<String, HashSet<String>>,
}

impl IgnoreList {
    /// An ignore list that drops nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        BUILTIN
            .iter()
            .map(|(file, ids)| (file.to_string(), ids.iter().map(|id| id.to_string()).collect()))
            .collect()
    }

    /// Load a YAML mapping of file name to a list of ids
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, HashSet<String>> = serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid ignore list {}: {}", path.display(), e)))?;
        Ok(Self { entries })
    }

    /// Ids to drop for `filename`, if any
    pub fn for_file(&self, filename: &str) -> Option<&HashSet<String>> {
        self.entries.get(filename).filter(|ids| !ids.is_empty())
    }

    pub fn is_ignored(&self, filename: &str, id: &str) -> bool {
        self.for_file(filename).is_some_and(|ids| ids.contains(id))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(String, HashSet<String>)> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = (String, HashSet<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
