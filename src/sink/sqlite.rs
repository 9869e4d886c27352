//! SQLite output through Diesel.
//!
//! All entities go into one database file. Tables are created on first use
//! with every column typed `TEXT`; columns the schema gained since the table
//! was created are added with `ALTER TABLE`. Each input file is written in a
//! single exclusive transaction.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use std::collections::HashSet;
use std::path::Path;

use super::{TableBatch, TableWriter};
use crate::error::SinkError;
use crate::schema::ID_FIELD;

/// Rows per INSERT statement when none is configured
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(QueryableByName)]
struct ColumnInfo {
    #[diesel(sql_type = Text)]
    name: String,
}

pub struct SqliteStore {
    conn: SqliteConnection,
    batch_size: usize,
    /// Tables whose columns have been checked on this connection
    prepared: HashSet<String>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if path.exists() {
            tracing::warn!(
                "Sqlite database {} exists; records will be appended.",
                path.display()
            );
        }

        let mut conn = SqliteConnection::establish(&path.to_string_lossy())?;
        conn.batch_execute("PRAGMA synchronous = OFF; PRAGMA journal_mode = MEMORY;")?;
        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
            prepared: HashSet::new(),
        })
    }

    /// In-memory database, for tests
    pub fn in_memory(batch_size: usize) -> Result<Self, SinkError> {
        let conn = SqliteConnection::establish(":memory:")?;
        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
            prepared: HashSet::new(),
        })
    }

    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Column names of `table` in declaration order
    pub fn table_columns(&mut self, table: &str) -> Result<Vec<String>, SinkError> {
        table_columns(&mut self.conn, table)
    }

    pub fn row_count(&mut self, table: &str) -> Result<usize, SinkError> {
        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            n: i64,
        }

        let count: Count = diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {}", quote_ident(table)))
            .get_result(&mut self.conn)?;
        Ok(count.n.max(0) as usize)
    }
}

impl TableWriter for SqliteStore {
    fn write_file(&mut self, batches: &[TableBatch<'_>]) -> Result<usize, SinkError> {
        let batch_size = self.batch_size;
        let prepared = &self.prepared;
        let mut newly_prepared = Vec::new();

        let written = self.conn.exclusive_transaction(|conn| {
            let mut written = 0;
            for batch in batches {
                if !prepared.contains(batch.entity) {
                    prepare_table(conn, batch.entity, batch.columns)?;
                    newly_prepared.push(batch.entity.to_string());
                }
                tracing::debug!(entity = batch.entity, rows = batch.rows.len(), "Inserting rows");
                written += insert_rows(conn, batch, batch_size)?;
            }
            Ok::<_, SinkError>(written)
        })?;

        self.prepared.extend(newly_prepared);
        Ok(written)
    }
}

/// Create the table if needed and add any missing columns.
fn prepare_table(conn: &mut SqliteConnection, table: &str, columns: &[String]) -> Result<(), SinkError> {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| {
            if column == ID_FIELD {
                format!("{} TEXT NOT NULL PRIMARY KEY", quote_ident(column))
            } else {
                format!("{} TEXT", quote_ident(column))
            }
        })
        .collect();
    diesel::sql_query(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        definitions.join(", ")
    ))
    .execute(conn)?;

    let existing: HashSet<String> = table_columns(conn, table)?.into_iter().collect();
    for column in columns.iter().filter(|column| !existing.contains(*column)) {
        tracing::debug!(table, column = column.as_str(), "Adding column");
        diesel::sql_query(format!(
            "ALTER TABLE {} ADD COLUMN {} TEXT",
            quote_ident(table),
            quote_ident(column)
        ))
        .execute(conn)?;
    }
    Ok(())
}

fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>, SinkError> {
    let info: Vec<ColumnInfo> =
        diesel::sql_query(format!("PRAGMA table_info({})", quote_ident(table))).load(conn)?;
    Ok(info.into_iter().map(|column| column.name).collect())
}

/// Multi-row INSERTs of at most `batch_size` rows each.
fn insert_rows(conn: &mut SqliteConnection, batch: &TableBatch<'_>, batch_size: usize) -> Result<usize, SinkError> {
    if batch.columns.is_empty() {
        return Ok(0);
    }

    let column_list: Vec<String> = batch.columns.iter().map(|column| quote_ident(column)).collect();
    let placeholders = format!("({})", vec!["?"; batch.columns.len()].join(", "));

    for chunk in batch.rows.chunks(batch_size) {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(batch.entity),
            column_list.join(", "),
            vec![placeholders.as_str(); chunk.len()].join(", ")
        );
        let mut query = diesel::sql_query(sql).into_boxed::<Sqlite>();
        for row in chunk {
            for value in row.project(batch.columns) {
                query = query.bind::<Nullable<Text>, _>(value.map(str::to_string));
            }
        }
        query.execute(conn)?;
    }
    Ok(batch.rows.len())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
