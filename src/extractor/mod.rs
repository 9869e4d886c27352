//! Line-by-line record extraction.
//!
//! A [`RecordExtractor`] walks the lines of one [`Document`] in a single
//! pass. Each line is split into a header tag (first four characters) and a
//! payload; the tag decides whether the line opens a section, continues the
//! previous field, or feeds the rules of the active section. Closed rows are
//! appended to [`Tables`] and never touched again.
//!
//! Nested entities keep their enclosing record open underneath them, so the
//! active state is a stack of frames: the bottom frame belongs to the
//! current top-level section and each nested entity pushes one frame.

pub mod observer;

pub use observer::{ExtractionObserver, NullObserver, TracingObserver};

use crate::error::{ExtractError, SchemaError};
use crate::record::{Record, Tables};
use crate::schema::{
    CompiledSchema, FieldRule, HeaderPattern, Joiner, NestedSection, SectionDef, Seed,
    DEFAULT_JOINER, HEADER_WIDTH, ID_FIELD,
};
use crate::segment::Document;

/// Split a line into its trimmed header tag and trimmed payload.
pub fn split_line(line: &str) -> (&str, &str) {
    let cut = line
        .char_indices()
        .nth(HEADER_WIDTH)
        .map_or(line.len(), |(i, _)| i);
    (line[..cut].trim(), line[cut..].trim())
}

/// Outcome of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub root_id: String,
    /// Rows closed into tables, all entities included
    pub rows: usize,
}

/// Applies a compiled schema to documents.
#[derive(Debug, Clone)]
pub struct RecordExtractor<'s> {
    schema: &'s CompiledSchema,
    default_joiner: String,
}

impl<'s> RecordExtractor<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Self {
            schema,
            default_joiner: DEFAULT_JOINER.to_string(),
        }
    }

    /// Use `joiner` for rules that do not name their own
    pub fn with_default_joiner(mut self, joiner: &str) -> Result<Self, SchemaError> {
        if Joiner::parse(joiner) == Joiner::NewRecord {
            return Err(SchemaError::NewRecordDefaultJoiner);
        }
        self.default_joiner = joiner.to_string();
        Ok(self)
    }

    /// Extract every row of `document` into `tables`.
    ///
    /// `filename` is written into fields declared with `<filename_field>`.
    /// On error the document is abandoned; rows already closed stay in
    /// `tables`.
    pub fn extract<'a>(
        &'a self,
        document: &Document,
        filename: &'a str,
        tables: &'a mut Tables,
        observer: &'a mut dyn ExtractionObserver,
    ) -> Result<DocumentSummary, ExtractError> {
        DocumentPass {
            schema: self.schema,
            default_joiner: &self.default_joiner,
            filename,
            start_line: document.start_line,
            line: document.start_line,
            tables,
            observer,
            frames: Vec::new(),
            muted: false,
            last_tag: String::new(),
            last_fields: Vec::new(),
            splitter: None,
            root_id: None,
            counter: 0,
            rows: 0,
        }
        .run(document)
    }
}

/// One open record and the section whose rules feed it.
struct Frame<'a> {
    section: &'a SectionDef,
    /// Pattern that opened this frame, for nested entities
    starter: Option<&'a HeaderPattern>,
    record: Record,
}

/// Where a tagged line should be applied.
enum Target<'a> {
    /// Rules of the frame at this depth
    Apply(usize),
    /// Open a nested entity on top of the frame at this depth
    Open {
        depth: usize,
        nested: &'a NestedSection,
    },
    Unmatched,
}

/// State for one document. Dropped when the document ends.
struct DocumentPass<'a> {
    schema: &'a CompiledSchema,
    default_joiner: &'a str,
    filename: &'a str,
    start_line: usize,
    /// Source line currently being processed
    line: usize,
    tables: &'a mut Tables,
    observer: &'a mut dyn ExtractionObserver,
    frames: Vec<Frame<'a>>,
    /// Inside a section marker the schema does not map
    muted: bool,
    last_tag: String,
    /// Fields written by the last tagged line, targets of continuation lines
    last_fields: Vec<String>,
    /// Row splitter armed by the last Parameterized rule, with its frame depth
    splitter: Option<(usize, &'a HeaderPattern)>,
    root_id: Option<String>,
    counter: usize,
    rows: usize,
}

impl<'a> DocumentPass<'a> {
    fn run(mut self, document: &Document) -> Result<DocumentSummary, ExtractError> {
        let schema = self.schema;
        let root = schema.root_section();
        let record = self.seeded_record(root);
        self.frames.push(Frame {
            section: root,
            starter: None,
            record,
        });

        for (offset, line) in document.lines().enumerate() {
            self.line = self.start_line + offset;
            // The root marker line only opens the root record
            if offset == 0 && line.starts_with(schema.root_marker()) {
                continue;
            }
            self.process_line(line)?;
        }
        self.close_frames(0);

        let rows = self.rows;
        match self.root_id.take() {
            Some(root_id) => Ok(DocumentSummary { root_id, rows }),
            None => Err(self.missing_primary_key("end of document")),
        }
    }

    fn process_line(&mut self, line: &str) -> Result<(), ExtractError> {
        let (tag, payload) = split_line(line);
        if tag.is_empty() && payload.is_empty() {
            return Ok(());
        }

        if !tag.is_empty() {
            self.last_tag.clear();
            self.last_tag.push_str(tag);
        }

        if tag == self.schema.primary_key_tag() {
            self.assign_primary_key(payload)?;
        }

        if tag.chars().count() == HEADER_WIDTH {
            return self.enter_section(tag);
        }

        if self.muted {
            return Ok(());
        }

        if tag.is_empty() {
            if self.top().section.rules.any_match(&self.last_tag) {
                self.continue_fields(payload);
            }
            return Ok(());
        }

        self.last_fields.clear();
        match self.resolve(tag) {
            Target::Apply(depth) => {
                self.close_frames(depth + 1);
                self.split_if_armed(tag)?;
                self.apply_rules(tag, payload)?;
            }
            Target::Open { depth, nested } => {
                self.close_frames(depth + 1);
                self.split_if_armed(tag)?;
                let record = self.open_record(&nested.section)?;
                self.frames.push(Frame {
                    section: &nested.section,
                    starter: Some(&nested.pattern),
                    record,
                });
                self.apply_rules(tag, payload)?;
            }
            Target::Unmatched => self.split_if_armed(tag)?,
        }
        Ok(())
    }

    /// Innermost frame that accepts `tag`, searching outward.
    fn resolve(&self, tag: &str) -> Target<'a> {
        for depth in (0..self.frames.len()).rev() {
            let frame = &self.frames[depth];
            let section: &'a SectionDef = frame.section;

            // A repeated starter opens a sibling row rather than feeding this one
            if depth > 0 && frame.starter.is_some_and(|starter| starter.matches(tag)) {
                let parent: &'a SectionDef = self.frames[depth - 1].section;
                if let Some(nested) = parent.nested_for(tag) {
                    return Target::Open {
                        depth: depth - 1,
                        nested,
                    };
                }
            }
            if let Some(nested) = section.nested_for(tag) {
                return Target::Open { depth, nested };
            }
            if section.rules.any_match(tag) {
                return Target::Apply(depth);
            }
        }
        Target::Unmatched
    }

    fn enter_section(&mut self, tag: &str) -> Result<(), ExtractError> {
        let schema = self.schema;
        match schema.section(tag) {
            Some(section) => {
                self.close_frames(0);
                let record = self.open_record(section)?;
                self.frames.push(Frame {
                    section,
                    starter: None,
                    record,
                });
                self.muted = false;
                self.splitter = None;
                self.last_fields.clear();
                // Continuations never cross a section boundary
                self.last_tag.clear();
            }
            None => {
                self.muted = true;
                self.observer.unmapped_section(tag);
            }
        }
        Ok(())
    }

    fn assign_primary_key(&mut self, payload: &str) -> Result<(), ExtractError> {
        let existing = self
            .root_id
            .clone()
            .or_else(|| self.top().record.id().map(str::to_string));
        if let Some(existing) = existing {
            return Err(ExtractError::DuplicatePrimaryKey {
                tag: self.schema.primary_key_tag().to_string(),
                line: self.line,
                existing,
                duplicate: payload.to_string(),
            });
        }

        self.top_mut().record.set(ID_FIELD, payload);
        self.root_id = Some(payload.to_string());
        Ok(())
    }

    fn continue_fields(&mut self, payload: &str) {
        let top = self.frames.len() - 1;
        for field in &self.last_fields {
            self.frames[top].record.append(field, " ", payload);
        }
    }

    fn apply_rules(&mut self, tag: &str, payload: &str) -> Result<(), ExtractError> {
        let top = self.frames.len() - 1;
        let section: &'a SectionDef = self.frames[top].section;

        for entry in section.rules.iter().filter(|entry| entry.pattern.matches(tag)) {
            match &entry.rule {
                FieldRule::Direct { field } => {
                    self.last_fields.push(field.clone());
                    let record = &mut self.frames[top].record;
                    let joined = record.contains(field);
                    record.append(field, self.default_joiner, payload);
                    if joined {
                        self.observer.implicit_join(&section.entity, field);
                    }
                }
                FieldRule::Parameterized {
                    field,
                    joiner,
                    splitter,
                } => {
                    self.last_fields.push(field.clone());
                    self.splitter = splitter.as_ref().map(|pattern| (top, pattern));

                    if !self.frames[top].record.contains(field) {
                        self.frames[top].record.set(field.as_str(), payload);
                        continue;
                    }
                    match joiner {
                        Some(Joiner::NewRecord) => {
                            self.start_new_row()?;
                            self.frames[top].record.set(field.as_str(), payload);
                        }
                        Some(Joiner::Text(joiner)) => {
                            self.frames[top].record.append(field, joiner, payload);
                        }
                        None => {
                            let joiner = self.default_joiner;
                            self.frames[top].record.append(field, joiner, payload);
                        }
                    }
                }
                FieldRule::Constant { field, value } => {
                    self.frames[top].record.set(field.as_str(), value.as_str());
                }
            }
        }
        Ok(())
    }

    fn split_if_armed(&mut self, tag: &str) -> Result<(), ExtractError> {
        if let Some((depth, splitter)) = self.splitter {
            if depth + 1 == self.frames.len() && splitter.matches(tag) {
                self.start_new_row()?;
            }
        }
        Ok(())
    }

    /// Close the innermost record and replace it with a fresh one of the same section.
    fn start_new_row(&mut self) -> Result<(), ExtractError> {
        let top = self.frames.len() - 1;
        let section: &'a SectionDef = self.frames[top].section;
        let fresh = self.open_record(section)?;
        let closed = std::mem::replace(&mut self.frames[top].record, fresh);
        self.close_record(section, closed);
        Ok(())
    }

    /// Close every frame at depth `keep` and above, innermost first.
    fn close_frames(&mut self, keep: usize) {
        if self.splitter.is_some_and(|(depth, _)| depth >= keep) {
            self.splitter = None;
        }
        while self.frames.len() > keep {
            if let Some(frame) = self.frames.pop() {
                self.close_record(frame.section, frame.record);
            }
        }
    }

    fn close_record(&mut self, section: &SectionDef, record: Record) {
        self.tables.push(&section.entity, record);
        self.observer.row_closed(&section.entity);
        self.rows += 1;
    }

    /// New row keyed `<root id>_<n>` and linked to the document root.
    fn open_record(&mut self, section: &SectionDef) -> Result<Record, ExtractError> {
        let root_id = match self.root_id.as_deref() {
            Some(root_id) => root_id,
            None => {
                return Err(self.missing_primary_key(&format!("'{}' row", section.entity)));
            }
        };

        let mut record = self.seeded_record(section);
        record.set(ID_FIELD, format!("{}_{}", root_id, self.counter));
        if !self.schema.is_root(&section.entity) {
            record.set(self.schema.parent_field(), root_id);
        }
        self.counter += 1;
        Ok(record)
    }

    fn seeded_record(&self, section: &SectionDef) -> Record {
        let mut record = Record::new();
        for seed in &section.seeds {
            match seed {
                Seed::Constant { field, value } => record.set(field.as_str(), value.as_str()),
                Seed::Filename { field } => record.set(field.as_str(), self.filename),
            }
        }
        record
    }

    fn missing_primary_key(&self, context: &str) -> ExtractError {
        ExtractError::MissingPrimaryKey {
            tag: self.schema.primary_key_tag().to_string(),
            line: self.start_line,
            context: context.to_string(),
        }
    }

    fn top(&self) -> &Frame<'a> {
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame<'a> {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    const SCHEMA: &str = r#"
PATN:
  <entity>: patent
  <primary_key>: WKU
  <filename_field>: source_file
  <fields>:
    TTL: title
    ICL:
      <fieldname>: intl_class
      <joiner>: "; "
    EXA:
      <fieldname>: examiner
    DCD:
      <constant>:
        <fieldname>: has_disclaimer
        <enum_type>: "true"
INVT:
  <entity>: inventor
  <fields>:
    NAM: name
    CTY: city
CLAS:
  <entity>: us_classification
  <fields>:
    <constant>:
      - <fieldname>: scheme
        <enum_type>: uspc
    OCL: original_class
    XCL:
      <fieldname>: cross_reference
      <joiner>: <new_record>
ABST:
  <entity>: abstract
  <fields>:
    PA.:
      <fieldname>: text
      <joiner>: " "
"#;

    #[derive(Default)]
    struct CountingObserver {
        implicit: Vec<String>,
        unmapped: Vec<String>,
        closed: Vec<String>,
    }

    impl ExtractionObserver for CountingObserver {
        fn implicit_join(&mut self, entity: &str, field: &str) {
            self.implicit.push(format!("{}.{}", entity, field));
        }

        fn unmapped_section(&mut self, tag: &str) {
            self.unmapped.push(tag.to_string());
        }

        fn row_closed(&mut self, entity: &str) {
            self.closed.push(entity.to_string());
        }
    }

    fn run(
        schema: &CompiledSchema,
        lines: &[&str],
    ) -> (Result<DocumentSummary, ExtractError>, Tables, CountingObserver) {
        let mut tables = Tables::new();
        let mut observer = CountingObserver::default();
        let document = Document::new(2, lines.join("\n"));
        let result = RecordExtractor::new(schema).extract(
            &document,
            "pftaps19760106_wk01.txt",
            &mut tables,
            &mut observer,
        );
        (result, tables, observer)
    }

    fn schema() -> CompiledSchema {
        parse_schema(SCHEMA, "PATN").unwrap()
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("WKU  039300018"), ("WKU", "039300018"));
        assert_eq!(split_line("PATN"), ("PATN", ""));
        assert_eq!(split_line("     continued text "), ("", "continued text"));
        assert_eq!(split_line("TT"), ("TT", ""));
        assert_eq!(split_line("NAM  M\u{fc}ller"), ("NAM", "M\u{fc}ller"));
    }

    #[test]
    fn test_title_continuation() {
        let schema = parse_schema(
            "PATN:\n  <entity>: patent\n  <primary_key>: WKU\n  <fields>:\n    TTL: title\n",
            "PATN",
        )
        .unwrap();
        let (result, tables, _) = run(
            &schema,
            &["PATN", "WKU 12345", "TTL Title A", "    continued"],
        );

        let summary = result.unwrap();
        assert_eq!(summary, DocumentSummary { root_id: "12345".to_string(), rows: 1 });

        let rows = tables.rows("patent");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), Some("12345"));
        assert_eq!(rows[0].get("title"), Some("Title A continued"));
        assert_eq!(tables.iter().count(), 1);
    }

    #[test]
    fn test_child_ids_and_parent_reference() {
        let (result, tables, observer) = run(
            &schema(),
            &[
                "PATN",
                "WKU  039300018",
                "TTL  Pipe coupling",
                "INVT",
                "NAM  Smith; John",
                "CTY  Springfield",
                "INVT",
                "NAM  Doe; Jane",
            ],
        );
        result.unwrap();

        let patents = tables.rows("patent");
        assert_eq!(patents.len(), 1);
        assert_eq!(patents[0].get("source_file"), Some("pftaps19760106_wk01.txt"));

        let inventors = tables.rows("inventor");
        assert_eq!(inventors.len(), 2);
        assert_eq!(inventors[0].id(), Some("039300018_0"));
        assert_eq!(inventors[1].id(), Some("039300018_1"));
        for inventor in inventors {
            assert_eq!(inventor.get("patent_id"), Some("039300018"));
        }
        assert_eq!(inventors[0].get("city"), Some("Springfield"));
        assert_eq!(inventors[1].get("city"), None);
        assert_eq!(observer.closed, vec!["patent", "inventor", "inventor"]);
    }

    #[test]
    fn test_new_record_joiner_splits_rows() {
        let (result, tables, _) = run(
            &schema(),
            &[
                "PATN",
                "WKU  039300018",
                "CLAS",
                "OCL  285 14",
                "XCL  285 55",
                "XCL  285156",
                "XCL  285382",
            ],
        );
        result.unwrap();

        let rows = tables.rows("us_classification");
        assert_eq!(rows.len(), 3);
        let ids: Vec<&str> = rows.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["039300018_0", "039300018_1", "039300018_2"]);
        let xrefs: Vec<Option<&str>> = rows.iter().map(|r| r.get("cross_reference")).collect();
        assert_eq!(xrefs, vec![Some("285 55"), Some("285156"), Some("285382")]);
        assert!(rows.iter().all(|r| r.get("patent_id") == Some("039300018")));
        assert!(rows.iter().all(|r| r.get("scheme") == Some("uspc")));
        assert_eq!(rows[0].get("original_class"), Some("285 14"));
        assert_eq!(rows[1].get("original_class"), None);
    }

    #[test]
    fn test_parameterized_joiners() {
        let (result, tables, observer) = run(
            &schema(),
            &[
                "PATN",
                "WKU  039300018",
                "ICL  F16L 2100",
                "ICL  F16L 2500",
                "EXA  Arola; Dave W.",
                "EXA  Smith; A.",
                "ABST",
                "PAL  A coupling for",
                "     joining pipes.",
                "PAR  Second paragraph.",
            ],
        );
        result.unwrap();

        let patent = &tables.rows("patent")[0];
        assert_eq!(patent.get("intl_class"), Some("F16L 2100; F16L 2500"));
        assert_eq!(patent.get("examiner"), Some("Arola; Dave W.|#|Smith; A."));
        assert!(observer.implicit.is_empty());

        let abstracts = tables.rows("abstract");
        assert_eq!(abstracts.len(), 1);
        assert_eq!(
            abstracts[0].get("text"),
            Some("A coupling for joining pipes. Second paragraph.")
        );
    }

    #[test]
    fn test_direct_repeat_uses_default_joiner() {
        let schema = schema();
        let mut tables = Tables::new();
        let mut observer = CountingObserver::default();
        let document = Document::new(
            2,
            "PATN\nWKU  1\nTTL  First\nTTL  Second",
        );
        RecordExtractor::new(&schema)
            .with_default_joiner(" // ")
            .unwrap()
            .extract(&document, "f.txt", &mut tables, &mut observer)
            .unwrap();

        assert_eq!(tables.rows("patent")[0].get("title"), Some("First // Second"));
        assert_eq!(observer.implicit, vec!["patent.title"]);
    }

    #[test]
    fn test_new_record_is_not_a_default_joiner() {
        let schema = schema();
        let err = RecordExtractor::new(&schema)
            .with_default_joiner("<new_record>")
            .unwrap_err();
        assert!(matches!(err, SchemaError::NewRecordDefaultJoiner));
    }

    #[test]
    fn test_constant_rule_ignores_payload() {
        let (result, tables, _) = run(
            &schema(),
            &["PATN", "WKU  1", "DCD  19950101", "     more"],
        );
        result.unwrap();
        let patent = &tables.rows("patent")[0];
        assert_eq!(patent.get("has_disclaimer"), Some("true"));
    }

    #[test]
    fn test_unmapped_section_drops_lines() {
        let (result, tables, observer) = run(
            &schema(),
            &[
                "PATN",
                "WKU  1",
                "TTL  Title",
                "BSUM",
                "PAC  BACKGROUND",
                "TTL  not a title",
                "     nor a continuation",
                "INVT",
                "NAM  Smith",
            ],
        );
        result.unwrap();

        assert_eq!(tables.rows("patent")[0].get("title"), Some("Title"));
        assert_eq!(tables.rows("inventor").len(), 1);
        assert_eq!(observer.unmapped, vec!["BSUM"]);
    }

    #[test]
    fn test_section_boundary_voids_continuation() {
        let (result, tables, _) = run(
            &schema(),
            &["PATN", "WKU  1", "INVT", "     orphan", "NAM  Smith", "     Jr."],
        );
        result.unwrap();
        let inventor = &tables.rows("inventor")[0];
        assert_eq!(inventor.get("name"), Some("Smith Jr."));
        assert_eq!(inventor.len(), 3);
    }

    #[test]
    fn test_unmatched_tag_breaks_continuation() {
        let (result, tables, _) = run(
            &schema(),
            &["PATN", "WKU  1", "TTL  Title", "APN  123", "     stray"],
        );
        result.unwrap();
        assert_eq!(tables.rows("patent")[0].get("title"), Some("Title"));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let (result, _, _) = run(&schema(), &["PATN", "WKU  1", "TTL  T", "WKU  2"]);
        match result.unwrap_err() {
            ExtractError::DuplicatePrimaryKey { tag, line, existing, duplicate } => {
                assert_eq!(tag, "WKU");
                assert_eq!(line, 5);
                assert_eq!(existing, "1");
                assert_eq!(duplicate, "2");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_primary_key() {
        let (result, _, _) = run(&schema(), &["PATN", "TTL  T", "INVT", "NAM  Smith"]);
        assert!(matches!(
            result.unwrap_err(),
            ExtractError::MissingPrimaryKey { context, .. } if context == "'inventor' row"
        ));

        let (result, _, _) = run(&schema(), &["PATN", "TTL  T"]);
        assert!(matches!(
            result.unwrap_err(),
            ExtractError::MissingPrimaryKey { context, .. } if context == "end of document"
        ));
    }

    #[test]
    fn test_splitter_forces_new_row() {
        let schema = parse_schema(
            r#"
PATN:
  <entity>: patent
  <primary_key>: WKU
  <fields>: {}
RLAP:
  <entity>: related_application
  <fields>:
    APN:
      <fieldname>: application_number
      <splitter>: "COD"
    COD: relation_code
    PSC: status
"#,
            "PATN",
        )
        .unwrap();
        let (result, tables, _) = run(
            &schema,
            &[
                "PATN",
                "WKU  1",
                "RLAP",
                "COD  71",
                "APN  4001",
                "PSC  03",
                "COD  72",
                "APN  4002",
            ],
        );
        result.unwrap();

        let rows = tables.rows("related_application");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("relation_code"), Some("71"));
        assert_eq!(rows[0].get("application_number"), Some("4001"));
        assert_eq!(rows[0].get("status"), Some("03"));
        assert_eq!(rows[1].get("relation_code"), Some("72"));
        assert_eq!(rows[1].get("application_number"), Some("4002"));
        assert_eq!(rows[1].id(), Some("1_1"));
    }

    #[test]
    fn test_nested_entity_frames() {
        let schema = parse_schema(
            r#"
PATN:
  <entity>: patent
  <primary_key>: WKU
  <fields>:
    TTL: title
    ISD: issue_date
    PCN:
      <entity>: pct_filing
      <fields>:
        PCN: pct_number
        PD1: pct_date
"#,
            "PATN",
        )
        .unwrap();
        let (result, tables, _) = run(
            &schema,
            &[
                "PATN",
                "WKU  1",
                "TTL  Title",
                "PCN  PCT/US93/01",
                "PD1  19930101",
                "PCN  PCT/US93/02",
                "ISD  19950606",
            ],
        );
        result.unwrap();

        let patent = &tables.rows("patent")[0];
        assert_eq!(patent.get("title"), Some("Title"));
        assert_eq!(patent.get("issue_date"), Some("19950606"));

        let filings = tables.rows("pct_filing");
        assert_eq!(filings.len(), 2);
        assert_eq!(filings[0].get("pct_number"), Some("PCT/US93/01"));
        assert_eq!(filings[0].get("pct_date"), Some("19930101"));
        assert_eq!(filings[1].get("pct_number"), Some("PCT/US93/02"));
        assert!(filings.iter().all(|r| r.get("patent_id") == Some("1")));
        assert_eq!(filings[1].id(), Some("1_1"));
    }

    #[test]
    fn test_splitter_without_own_rule_opens_row() {
        let schema = parse_schema(
            r#"
PATN:
  <entity>: patent
  <primary_key>: WKU
  <fields>: {}
RLAP:
  <entity>: related_application
  <fields>:
    APN:
      <fieldname>: application_number
      <splitter>: ZZZ
    PSC: status
"#,
            "PATN",
        )
        .unwrap();
        let (result, tables, _) = run(
            &schema,
            &[
                "PATN", "WKU  1", "RLAP", "APN  a", "PSC  s", "ZZZ  x", "PSC  t", "APN  b",
            ],
        );
        result.unwrap();

        let rows = tables.rows("related_application");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), Some("1_0"));
        assert_eq!(rows[0].get("application_number"), Some("a"));
        assert_eq!(rows[0].get("status"), Some("s"));
        assert_eq!(rows[1].id(), Some("1_1"));
        assert_eq!(rows[1].get("status"), Some("t"));
        assert_eq!(rows[1].get("application_number"), Some("b"));
    }

    #[test]
    fn test_grandchild_links_to_document_root() {
        let schema = parse_schema(
            r#"
PATN:
  <entity>: patent
  <primary_key>: WKU
  <fields>: {}
LREP:
  <entity>: legal_representative
  <fields>:
    NAM: name
    AGT:
      <entity>: agent
      <fields>:
        AGT: agent_name
        REG:
          <entity>: registration
          <fields>:
            REG: number
"#,
            "PATN",
        )
        .unwrap();
        let (result, tables, _) = run(
            &schema,
            &["PATN", "WKU  9", "LREP", "NAM  Firm", "AGT  Smith", "REG  123"],
        );
        result.unwrap();

        assert_eq!(tables.rows("legal_representative")[0].id(), Some("9_0"));
        let agent = &tables.rows("agent")[0];
        assert_eq!(agent.id(), Some("9_1"));
        assert_eq!(agent.get("agent_name"), Some("Smith"));

        let registrations = tables.rows("registration");
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].id(), Some("9_2"));
        assert_eq!(registrations[0].get("patent_id"), Some("9"));
        assert_eq!(registrations[0].get("number"), Some("123"));
        assert_eq!(
            schema.columns("registration").unwrap(),
            &["id".to_string(), "patent_id".to_string(), "number".to_string()]
        );
    }

    #[test]
    fn test_exactly_one_root_record_per_document() {
        let schema = schema();
        let mut tables = Tables::new();
        let extractor = RecordExtractor::new(&schema);
        for (i, wku) in ["1", "2", "3"].iter().enumerate() {
            let document = Document::new(i * 4 + 2, format!("PATN\nWKU  {}\nINVT\nNAM  X", wku));
            extractor
                .extract(&document, "f.txt", &mut tables, &mut NullObserver)
                .unwrap();
        }

        let ids: Vec<&str> = tables.rows("patent").iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        let children: Vec<&str> = tables.rows("inventor").iter().filter_map(Record::id).collect();
        assert_eq!(children, vec!["1_0", "2_0", "3_0"]);
    }
}
