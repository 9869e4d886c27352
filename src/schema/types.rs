//! Compiled field-mapping schema.
//!
//! These types are produced once by the [compiler](super::compiler) and are
//! read-only afterwards. The extractor never looks at the raw YAML tree.

use indexmap::IndexMap;
use regex::Regex;
use std::fmt;

/// Joiner value that asks for a fresh row instead of concatenation.
pub const NEW_RECORD: &str = "<new_record>";

/// Joiner used when a rule does not name one.
pub const DEFAULT_JOINER: &str = "|#|";

/// Width of a section header tag.
pub const HEADER_WIDTH: usize = 4;

/// Name of the generated identifier column.
pub const ID_FIELD: &str = "id";

/// How repeated values of one field are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Joiner {
    /// Concatenate with the given separator
    Text(String),
    /// Close the current row and write the value into a new one
    NewRecord,
}

impl Joiner {
    pub fn parse(raw: &str) -> Self {
        if raw == NEW_RECORD {
            Joiner::NewRecord
        } else {
            Joiner::Text(raw.to_string())
        }
    }
}

impl Default for Joiner {
    fn default() -> Self {
        Joiner::Text(DEFAULT_JOINER.to_string())
    }
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Joiner::Text(s) => write!(f, "{}", s),
            Joiner::NewRecord => write!(f, "{}", NEW_RECORD),
        }
    }
}

/// A precompiled header pattern, anchored at the start of the tag.
#[derive(Debug, Clone)]
pub struct HeaderPattern {
    source: String,
    regex: Regex,
}

impl HeaderPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Pattern text as written in the schema
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the tag starts with a match of this pattern. Empty tags never match.
    pub fn matches(&self, tag: &str) -> bool {
        !tag.is_empty() && self.regex.is_match(tag)
    }
}

impl PartialEq for HeaderPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// What to do with the payload of a line whose tag matches a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// One-to-one mapping; repeats are joined with the default joiner
    Direct { field: String },
    /// Many-to-one mapping with an optional joiner and row splitter
    Parameterized {
        field: String,
        joiner: Option<Joiner>,
        splitter: Option<HeaderPattern>,
    },
    /// Writes a fixed value whenever the tag is seen
    Constant { field: String, value: String },
}

impl FieldRule {
    pub fn field(&self) -> &str {
        match self {
            FieldRule::Direct { field }
            | FieldRule::Parameterized { field, .. }
            | FieldRule::Constant { field, .. } => field,
        }
    }
}

/// One pattern/rule pair of a section.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub pattern: HeaderPattern,
    pub rule: FieldRule,
}

/// Ordered rules for one section. Patterns may repeat.
#[derive(Debug, Clone, Default)]
pub struct SectionSchema {
    entries: Vec<RuleEntry>,
}

impl SectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pattern: HeaderPattern, rule: FieldRule) {
        self.entries.push(RuleEntry { pattern, rule });
    }

    /// Rules whose pattern matches `tag`, in schema order
    pub fn matching<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a FieldRule> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.pattern.matches(tag))
            .map(|entry| &entry.rule)
    }

    pub fn any_match(&self, tag: &str) -> bool {
        self.entries.iter().any(|entry| entry.pattern.matches(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value written into every new record of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    Constant { field: String, value: String },
    /// Name of the input file being converted
    Filename { field: String },
}

/// Everything the extractor needs to know about one section.
#[derive(Debug, Clone)]
pub struct SectionDef {
    pub entity: String,
    pub rules: SectionSchema,
    pub seeds: Vec<Seed>,
    pub nested: Vec<NestedSection>,
    pub primary_key: Option<String>,
}

impl SectionDef {
    /// Nested section whose starter pattern matches `tag`
    pub fn nested_for(&self, tag: &str) -> Option<&NestedSection> {
        self.nested.iter().find(|nested| nested.pattern.matches(tag))
    }
}

/// A child entity opened from inside its enclosing section.
#[derive(Debug, Clone)]
pub struct NestedSection {
    pub pattern: HeaderPattern,
    pub section: SectionDef,
}

/// An output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    /// Output column order: `id`, the parent reference for child
    /// entities, then declared fields in schema order
    pub columns: Vec<String>,
    pub is_root: bool,
    pub primary_key: Option<String>,
}

/// The compiled schema: sections by exact header tag, entities by name.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub(crate) root_marker: String,
    pub(crate) root_entity: String,
    pub(crate) parent_field: String,
    pub(crate) primary_key: String,
    pub(crate) entities: IndexMap<String, EntityDef>,
    pub(crate) sections: IndexMap<String, SectionDef>,
}

impl CompiledSchema {
    /// Header tag that begins a document
    pub fn root_marker(&self) -> &str {
        &self.root_marker
    }

    pub fn root_entity(&self) -> &str {
        &self.root_entity
    }

    /// Column linking child rows to the document root
    pub fn parent_field(&self) -> &str {
        &self.parent_field
    }

    /// Tag whose payload becomes the root record id
    pub fn primary_key_tag(&self) -> &str {
        &self.primary_key
    }

    /// Section keyed by an exact header tag
    pub fn section(&self, tag: &str) -> Option<&SectionDef> {
        self.sections.get(tag)
    }

    /// Section keyed by the root marker; present by construction
    pub fn root_section(&self) -> &SectionDef {
        &self.sections[self.root_marker.as_str()]
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &SectionDef)> {
        self.sections.iter().map(|(tag, section)| (tag.as_str(), section))
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    pub fn columns(&self, entity: &str) -> Option<&[String]> {
        self.entities.get(entity).map(|def| def.columns.as_slice())
    }

    pub fn is_root(&self, entity: &str) -> bool {
        entity == self.root_entity
    }
}
