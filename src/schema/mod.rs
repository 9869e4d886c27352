//! Field-mapping schema: YAML loading and compilation into section rules.

pub mod compiler;
pub mod loader;
pub mod types;

pub use compiler::compile_schema;
pub use loader::{load_schema, parse_schema};
pub use types::{
    CompiledSchema, EntityDef, FieldRule, HeaderPattern, Joiner, NestedSection, RuleEntry,
    SectionDef, SectionSchema, Seed, DEFAULT_JOINER, HEADER_WIDTH, ID_FIELD, NEW_RECORD,
};
