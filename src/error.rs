//! Error types for the chat-history-migrate library.
//!
//! Every failure the migration engine can surface is a variant of
//! [`MigrationError`]. Only [`MigrationError::RowTransform`] is recoverable;
//! the migrator logs it, counts it and moves on to the next row.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::SchemaVariant;

/// Errors that can occur while migrating a chat history.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// A database could not be opened, or is not a plaintext SQLite file
    #[error("Failed to open {role} database at {}: {reason}", path.display())]
    Connection {
        /// Which input failed ("source", "destination", "working copy")
        role: &'static str,
        /// Path that was being opened
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// A metadata query against `sqlite_master` or `table_info` failed
    #[error("Failed to read schema: {0}")]
    SchemaRead(#[source] rusqlite::Error),

    /// The source schema was recognised but no row migrator exists for it
    #[error(
        "Unsupported source schema: {variant}. Migration for this schema is not implemented yet; \
         the input database is not broken"
    )]
    UnsupportedSchema {
        /// Variant reported by the detector
        variant: SchemaVariant,
    },

    /// The destination working copy could not be produced
    #[error("Failed to materialize working copy at {}: {reason}", path.display())]
    Materialization {
        /// Output path of the working copy
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// The working copy is missing columns the migrator writes to
    #[error("Destination table {table} is missing columns: {}", missing.join(", "))]
    IncompatibleDestination {
        /// Destination table name
        table: &'static str,
        /// Columns that were expected but not found
        missing: Vec<String>,
    },

    /// A single source row failed to decode or insert
    #[error("Failed to migrate source row {row_id}: {source}")]
    RowTransform {
        /// Source `_id` of the offending row
        row_id: i64,
        /// Underlying database error
        #[source]
        source: rusqlite::Error,
    },

    /// Commit of the migration transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),

    /// The run was cancelled between rows and rolled back
    #[error("Migration cancelled")]
    Cancelled,

    /// Invalid configuration or caller input
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection-level or schema-level database fault
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Create a Connection error
    pub fn connection(role: &'static str, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Connection {
            role,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Materialization error
    pub fn materialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Materialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the error only affects one row and the stream can continue.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::RowTransform { .. })
    }

    /// Short label for the error category, used in metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::SchemaRead(_) => "schema_read",
            Self::UnsupportedSchema { .. } => "unsupported_schema",
            Self::Materialization { .. } => "materialization",
            Self::IncompatibleDestination { .. } => "incompatible_destination",
            Self::RowTransform { .. } => "row_transform",
            Self::Transaction(_) => "transaction",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Database(_) => "database",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience type alias for Result with MigrationError
pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_row_errors_are_recoverable() {
        let row = MigrationError::RowTransform {
            row_id: 7,
            source: rusqlite::Error::QueryReturnedNoRows,
        };
        assert!(row.is_recoverable());
        assert!(!MigrationError::Cancelled.is_recoverable());
        let fatal = MigrationError::Transaction(rusqlite::Error::QueryReturnedNoRows);
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn unsupported_schema_message_names_the_gap() {
        let err = MigrationError::UnsupportedSchema {
            variant: SchemaVariant::Legacy,
        };
        let message = err.to_string();
        assert!(message.contains("legacy"));
        assert!(message.contains("not implemented"));
    }
}
