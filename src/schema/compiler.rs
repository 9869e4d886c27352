//! Compiles the declarative YAML mapping into typed section rules.
//!
//! The mapping is keyed by header tag. Each value is an entity node:
//!
//! ```yaml
//! PATN:
//!   <entity>: patent
//!   <primary_key>: WKU
//!   <filename_field>: source_file
//!   <fields>:
//!     TTL: title
//!     APD: application_date:YYYYMMDD
//!     ICL:
//!       <fieldname>: intl_class
//!       <joiner>: "; "
//!     DCD:
//!       <constant>:
//!         <fieldname>: has_disclaimer
//!         <enum_type>: "true"
//! CLAS:
//!   <entity>: us_classification
//!   <fields>:
//!     XCL:
//!       <fieldname>: cross_reference
//!       <joiner>: <new_record>
//! ```
//!
//! Field lists are returned from each recursive call and merged by the
//! caller, so an entity reached from several sections ends up with the
//! union of its fields in first-seen order.

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use crate::error::SchemaError;
use crate::schema::types::{
    CompiledSchema, EntityDef, FieldRule, HeaderPattern, Joiner, NestedSection, SectionDef,
    SectionSchema, Seed, ID_FIELD,
};

const ENTITY_KEY: &str = "<entity>";
const FIELDS_KEY: &str = "<fields>";
const FIELDNAME_KEY: &str = "<fieldname>";
const JOINER_KEY: &str = "<joiner>";
const SPLITTER_KEY: &str = "<splitter>";
const CONSTANT_KEY: &str = "<constant>";
const CONSTANT_VALUE_KEY: &str = "<enum_type>";
const CONSTANT_VALUE_ALIAS: &str = "<value>";
const PRIMARY_KEY_KEY: &str = "<primary_key>";
const FILENAME_FIELD_KEY: &str = "<filename_field>";

/// Declared fields of one entity, as found under one section.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntityFields {
    entity: String,
    fields: Vec<String>,
}

/// Result of compiling one entity node.
struct CompiledSection {
    section: SectionDef,
    /// This entity first, then nested entities depth-first
    fields: Vec<EntityFields>,
}

/// Result of compiling one value under a `<fields>` pattern.
enum FieldNode {
    Rule(FieldRule),
    Nested(CompiledSection),
}

/// Compile a parsed YAML mapping into a [`CompiledSchema`].
///
/// `root_marker` names the section that begins each document; its entity
/// becomes the root entity and must declare `<primary_key>`.
pub fn compile_schema(tree: &Value, root_marker: &str) -> Result<CompiledSchema, SchemaError> {
    let top = tree
        .as_mapping()
        .ok_or_else(|| invalid_node("<root>", tree))?;

    let mut sections: IndexMap<String, SectionDef> = IndexMap::new();
    let mut declared: IndexMap<String, Vec<String>> = IndexMap::new();

    for (key, node) in top {
        let tag = key_str(key, "<root>")?;
        let compiled = compile_entity_node(tag, node)?;
        for entity_fields in compiled.fields {
            merge_fields(&mut declared, entity_fields);
        }
        sections.insert(tag.to_string(), compiled.section);
    }

    let root_section = sections
        .get(root_marker)
        .ok_or_else(|| SchemaError::MissingRootSection(root_marker.to_string()))?;
    let root_entity = root_section.entity.clone();
    let primary_key = root_section
        .primary_key
        .clone()
        .ok_or_else(|| SchemaError::MissingPrimaryKey(root_marker.to_string()))?;

    for (tag, section) in &sections {
        if tag == root_marker {
            for nested in &section.nested {
                check_no_primary_key(nested.pattern.as_str(), &nested.section, root_marker)?;
            }
        } else {
            check_no_primary_key(tag, section, root_marker)?;
        }
    }

    let parent_field = format!("{}_id", root_entity);
    let entities = declared
        .into_iter()
        .map(|(name, fields)| {
            let is_root = name == root_entity;
            let mut columns = vec![ID_FIELD.to_string()];
            if !is_root {
                columns.push(parent_field.clone());
            }
            for field in fields {
                if !columns.contains(&field) {
                    columns.push(field);
                }
            }
            let def = EntityDef {
                name: name.clone(),
                columns,
                is_root,
                primary_key: is_root.then(|| primary_key.clone()),
            };
            (name, def)
        })
        .collect();

    Ok(CompiledSchema {
        root_marker: root_marker.to_string(),
        root_entity,
        parent_field,
        primary_key,
        entities,
        sections,
    })
}

fn check_no_primary_key(
    tag: &str,
    section: &SectionDef,
    root_marker: &str,
) -> Result<(), SchemaError> {
    if section.primary_key.is_some() {
        return Err(SchemaError::MisplacedPrimaryKey {
            section: tag.to_string(),
            root: root_marker.to_string(),
        });
    }
    for nested in &section.nested {
        check_no_primary_key(nested.pattern.as_str(), &nested.section, root_marker)?;
    }
    Ok(())
}

fn merge_fields(declared: &mut IndexMap<String, Vec<String>>, incoming: EntityFields) {
    let fields = declared.entry(incoming.entity).or_default();
    for field in incoming.fields {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
}

/// Compile a map carrying `<entity>` into a section and its field lists.
fn compile_entity_node(path: &str, node: &Value) -> Result<CompiledSection, SchemaError> {
    let map = node
        .as_mapping()
        .filter(|map| map.contains_key(ENTITY_KEY))
        .ok_or_else(|| invalid_node(path, node))?;

    let entity = scalar_str(map, ENTITY_KEY, path, node)?;
    let primary_key = optional_scalar(map, PRIMARY_KEY_KEY, path, node)?;
    let fields_node = map
        .get(FIELDS_KEY)
        .ok_or_else(|| invalid_node(path, node))?;
    let fields_path = format!("{}.{}", path, FIELDS_KEY);
    let fields_map = fields_node
        .as_mapping()
        .ok_or_else(|| invalid_node(&fields_path, fields_node))?;

    let mut own_fields = Vec::new();
    let mut seeds = Vec::new();
    let mut rules = SectionSchema::new();
    let mut nested = Vec::new();
    let mut nested_fields = Vec::new();

    if let Some(field) = optional_scalar(map, FILENAME_FIELD_KEY, path, node)? {
        own_fields.push(field.clone());
        seeds.push(Seed::Filename { field });
    }

    for (key, value) in fields_map {
        let key = key_str(key, &fields_path)?;
        let entry_path = format!("{}.{}", fields_path, key);

        match key {
            CONSTANT_KEY => {
                for (field, constant) in compile_seed_constants(&entry_path, value)? {
                    own_fields.push(field.clone());
                    seeds.push(Seed::Constant { field, value: constant });
                }
            }
            FILENAME_FIELD_KEY => {
                let field = value
                    .as_str()
                    .ok_or_else(|| invalid_node(&entry_path, value))?
                    .to_string();
                own_fields.push(field.clone());
                seeds.push(Seed::Filename { field });
            }
            pattern => {
                let header = compile_pattern(&entry_path, pattern)?;
                for compiled in compile_field_node(&entry_path, value)? {
                    match compiled {
                        FieldNode::Rule(rule) => {
                            own_fields.push(rule.field().to_string());
                            rules.push(header.clone(), rule);
                        }
                        FieldNode::Nested(child) => {
                            nested_fields.extend(child.fields);
                            nested.push(NestedSection {
                                pattern: header.clone(),
                                section: child.section,
                            });
                        }
                    }
                }
            }
        }
    }

    let mut fields = vec![EntityFields {
        entity: entity.clone(),
        fields: own_fields,
    }];
    fields.extend(nested_fields);

    Ok(CompiledSection {
        section: SectionDef {
            entity,
            rules,
            seeds,
            nested,
            primary_key,
        },
        fields,
    })
}

/// Resolve one value under a `<fields>` pattern.
fn compile_field_node(path: &str, node: &Value) -> Result<Vec<FieldNode>, SchemaError> {
    match node {
        Value::String(raw) => {
            // "field:notes" documents the field; only the name is kept
            let field = raw.split(':').next().unwrap_or(raw).trim().to_string();
            if field.is_empty() {
                return Err(invalid_node(path, node));
            }
            Ok(vec![FieldNode::Rule(FieldRule::Direct { field })])
        }
        Value::Sequence(items) => {
            let mut compiled = Vec::new();
            for (i, item) in items.iter().enumerate() {
                compiled.extend(compile_field_node(&format!("{}[{}]", path, i), item)?);
            }
            Ok(compiled)
        }
        Value::Mapping(map) if map.contains_key(FIELDNAME_KEY) => {
            let field = scalar_str(map, FIELDNAME_KEY, path, node)?;
            let joiner = optional_scalar(map, JOINER_KEY, path, node)?.map(|j| Joiner::parse(&j));
            let splitter = optional_scalar(map, SPLITTER_KEY, path, node)?
                .map(|s| compile_pattern(path, &s))
                .transpose()?;
            Ok(vec![FieldNode::Rule(FieldRule::Parameterized {
                field,
                joiner,
                splitter,
            })])
        }
        Value::Mapping(map) if map.contains_key(CONSTANT_KEY) => {
            let constant_path = format!("{}.{}", path, CONSTANT_KEY);
            let (field, value) = compile_constant(&constant_path, &map[CONSTANT_KEY])?;
            Ok(vec![FieldNode::Rule(FieldRule::Constant { field, value })])
        }
        Value::Mapping(map) if map.contains_key(ENTITY_KEY) => {
            Ok(vec![FieldNode::Nested(compile_entity_node(path, node)?)])
        }
        _ => Err(invalid_node(path, node)),
    }
}

/// `<constant>` list inside `<fields>`: values written into every new record.
fn compile_seed_constants(path: &str, node: &Value) -> Result<Vec<(String, String)>, SchemaError> {
    match node {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| compile_constant(&format!("{}[{}]", path, i), item))
            .collect(),
        Value::Mapping(_) => Ok(vec![compile_constant(path, node)?]),
        _ => Err(invalid_node(path, node)),
    }
}

fn compile_constant(path: &str, node: &Value) -> Result<(String, String), SchemaError> {
    let map = node.as_mapping().ok_or_else(|| invalid_node(path, node))?;
    let field = scalar_str(map, FIELDNAME_KEY, path, node)?;
    let value = optional_scalar(map, CONSTANT_VALUE_KEY, path, node)?
        .or(optional_scalar(map, CONSTANT_VALUE_ALIAS, path, node)?)
        .ok_or_else(|| invalid_node(path, node))?;
    Ok((field, value))
}

fn compile_pattern(path: &str, pattern: &str) -> Result<HeaderPattern, SchemaError> {
    HeaderPattern::new(pattern).map_err(|source| SchemaError::InvalidPattern {
        path: path.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn key_str<'a>(key: &'a Value, path: &str) -> Result<&'a str, SchemaError> {
    key.as_str().ok_or_else(|| invalid_node(path, key))
}

fn scalar_str(map: &Mapping, key: &str, path: &str, node: &Value) -> Result<String, SchemaError> {
    optional_scalar(map, key, path, node)?.ok_or_else(|| invalid_node(path, node))
}

/// Strings, numbers and booleans are accepted and kept as text.
fn optional_scalar(
    map: &Mapping,
    key: &str,
    path: &str,
    node: &Value,
) -> Result<Option<String>, SchemaError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(invalid_node(path, node)),
    }
}

fn invalid_node(path: &str, node: &Value) -> SchemaError {
    let fragment = serde_yaml::to_string(node).unwrap_or_else(|_| format!("{:?}", node));
    let fragment = fragment
        .lines()
        .map(|line| format!(" {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    SchemaError::InvalidNode {
        path: path.to_string(),
        fragment,
    }
}
