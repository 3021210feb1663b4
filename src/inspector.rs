//! Read-only schema inspection.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::{MigrationError, Result};
use crate::schema::SQLITE_INTERNAL_PREFIX;

/// Tables of a database and their columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaSnapshot {
    /// Table names, sorted
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// True if the table is present
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Columns of a table, if present
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Expected columns that a table does not declare. A missing table reports every column.
    #[must_use]
    pub fn missing_columns(&self, table: &str, expected: &[&str]) -> Vec<String> {
        let present = self.columns(table).unwrap_or_default();
        expected
            .iter()
            .filter(|column| !present.iter().any(|p| p.eq_ignore_ascii_case(column)))
            .map(|column| (*column).to_string())
            .collect()
    }

    /// Number of tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if no tables were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Reads table and column metadata without mutating the database.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    excluded_prefixes: Vec<String>,
}

impl Default for SchemaInspector {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec![SQLITE_INTERNAL_PREFIX.to_string()],
        }
    }
}

impl SchemaInspector {
    /// Inspector that hides only SQLite's internal tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also hide tables whose name starts with `prefix`
    #[must_use]
    pub fn exclude_prefix(mut self, prefix: &str) -> Self {
        self.excluded_prefixes.push(prefix.to_string());
        self
    }

    fn is_excluded(&self, table: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| table.starts_with(prefix.as_str()))
    }

    /// Snapshot every visible table and its columns.
    pub fn inspect(&self, conn: &Connection) -> Result<SchemaSnapshot> {
        let table_names = Self::read_table_names(conn).map_err(MigrationError::SchemaRead)?;

        let mut tables = BTreeMap::new();
        for table in table_names.into_iter().filter(|t| !self.is_excluded(t)) {
            let columns = Self::read_columns(conn, &table).map_err(MigrationError::SchemaRead)?;
            debug!(table = %table, columns = columns.len(), "Inspected table");
            tables.insert(table, columns);
        }

        Ok(SchemaSnapshot { tables })
    }

    fn read_table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        names.collect()
    }

    fn read_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt.query_map([table], |row| row.get::<_, String>(0))?;
        columns.collect()
    }
}
