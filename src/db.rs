use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::{MigrationError, Result};
use crate::schema::{messages, z_primarykey, zwamessage};
use crate::validation::InputValidator;

/// Open an input database read-only. The file must look like plaintext SQLite.
pub fn open_read_only(role: &'static str, path: &Path) -> Result<Connection> {
    InputValidator::validate_sqlite_file(path)
        .map_err(|e| MigrationError::connection(role, path, e))?;

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(|e| MigrationError::connection(role, path, e))
}

/// Open the working copy for reading and writing, creating it if absent.
pub fn open_read_write(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(|e| MigrationError::connection("working copy", path, e))
}

/// Row count of a table. The name must come from [`crate::schema`].
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 =
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Rows in the source message table
pub fn count_source_messages(conn: &Connection) -> Result<u64> {
    count_rows(conn, messages::TABLE)
}

/// Rows in the destination message table
pub fn count_destination_messages(conn: &Connection) -> Result<u64> {
    count_rows(conn, zwamessage::TABLE)
}

/// True if a table with this exact name exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Highest message key already in use: the larger of `MAX(Z_PK)` and the
/// Core Data allocator's `Z_MAX` for the message entity, never below zero.
pub fn max_message_key(conn: &Connection) -> Result<i64> {
    let max_pk: Option<i64> = conn.query_row(
        &format!("SELECT MAX({}) FROM {}", zwamessage::Z_PK, zwamessage::TABLE),
        [],
        |row| row.get(0),
    )?;

    let allocator_max = if table_exists(conn, z_primarykey::TABLE)? {
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                z_primarykey::Z_MAX,
                z_primarykey::TABLE,
                z_primarykey::Z_NAME
            ),
            [z_primarykey::MESSAGE_ENTITY],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten()
    } else {
        None
    };

    Ok(max_pk.unwrap_or(0).max(allocator_max.unwrap_or(0)).max(0))
}

/// Record the highest issued message key in `Z_PRIMARYKEY`, if the destination keeps one.
/// Returns true when a row was updated.
pub fn record_max_message_key(conn: &Connection, max_key: i64) -> Result<bool> {
    if !table_exists(conn, z_primarykey::TABLE)? {
        return Ok(false);
    }

    let updated = conn.execute(
        &format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2 AND ({} IS NULL OR {} < ?1)",
            z_primarykey::TABLE,
            z_primarykey::Z_MAX,
            z_primarykey::Z_NAME,
            z_primarykey::Z_MAX,
            z_primarykey::Z_MAX
        ),
        rusqlite::params![max_key, z_primarykey::MESSAGE_ENTITY],
    )?;

    Ok(updated > 0)
}
