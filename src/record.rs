//! Rows and per-entity tables produced by extraction.

use indexmap::IndexMap;

use crate::schema::ID_FIELD;

/// One row of one entity: field name to text value, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Append `value` to `field` after `separator`, or set it if unset
    pub fn append(&mut self, field: &str, separator: &str, value: &str) {
        match self.values.get_mut(field) {
            Some(existing) => {
                existing.push_str(separator);
                existing.push_str(value);
            }
            None => {
                self.values.insert(field.to_string(), value.to_string());
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
    }

    /// Values in the given column order; absent fields are `None`
    pub fn project<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = Option<&'a str>> {
        columns.iter().map(move |column| self.get(column))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Closed rows grouped by entity, in the order entities were first closed.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    tables: IndexMap<String, Vec<Record>>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closed row; it is not modified afterwards
    pub fn push(&mut self, entity: &str, record: Record) {
        match self.tables.get_mut(entity) {
            Some(rows) => rows.push(record),
            None => {
                self.tables.insert(entity.to_string(), vec![record]);
            }
        }
    }

    pub fn rows(&self, entity: &str) -> &[Record] {
        self.tables.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.tables
            .iter()
            .map(|(entity, rows)| (entity.as_str(), rows.as_slice()))
    }

    /// Total number of rows across entities
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_append() {
        let mut record = Record::new();
        record.append("title", " ", "Title A");
        record.append("title", " ", "continued");
        assert_eq!(record.get("title"), Some("Title A continued"));
        assert!(!record.contains("abstract"));
    }

    #[test]
    fn test_record_project() {
        let record: Record = [("title", "T"), ("id", "1")].into_iter().collect();
        let columns = vec!["id".to_string(), "patent_id".to_string(), "title".to_string()];
        let row: Vec<Option<&str>> = record.project(&columns).collect();
        assert_eq!(row, vec![Some("1"), None, Some("T")]);
    }

    #[test]
    fn test_tables_keep_snapshot() {
        let mut tables = Tables::new();
        let mut record = Record::new();
        record.set("id", "1");
        tables.push("patent", record.clone());

        record.set("id", "2");
        assert_eq!(tables.rows("patent")[0].id(), Some("1"));
        assert!(tables.rows("inventor").is_empty());
        assert_eq!(tables.row_count(), 1);
    }
}
