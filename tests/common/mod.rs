//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;

use rusqlite::{params, Connection};

/// Identity used as the local party in every test run.
pub const IDENTITY: &str = "573001234567";

/// 2023-11-14T22:13:20Z in source milliseconds.
pub const T0_MS: i64 = 1_700_000_000_000;

/// One row of the Android `messages` table.
pub struct SourceRow<'a> {
    pub remote: &'a str,
    pub from_me: bool,
    pub body: Option<&'a str>,
    pub timestamp_ms: Option<i64>,
    pub status: Option<i64>,
}

impl<'a> SourceRow<'a> {
    pub fn text(from_me: bool, body: &'a str, timestamp_ms: i64) -> Self {
        Self {
            remote: "15550001111@s.whatsapp.net",
            from_me,
            body: Some(body),
            timestamp_ms: Some(timestamp_ms),
            status: Some(4),
        }
    }
}

/// Create an Android store with the modern marker table and the given rows.
pub fn create_modern_source(path: &Path, rows: &[SourceRow<'_>]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE messages (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_remote_jid TEXT NOT NULL,
            key_from_me INTEGER,
            data TEXT,
            timestamp INTEGER,
            status INTEGER,
            media_wa_type INTEGER,
            starred INTEGER
         );
         CREATE TABLE chat (_id INTEGER PRIMARY KEY AUTOINCREMENT, jid_row_id INTEGER);
         CREATE TABLE message_quoted (message_row_id INTEGER PRIMARY KEY, key_id TEXT);",
    )
    .unwrap();
    insert_source_rows(&conn, rows);
}

/// Create an Android store with only the baseline tables.
pub fn create_legacy_source(path: &Path, rows: &[SourceRow<'_>]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE messages (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_remote_jid TEXT NOT NULL,
            key_from_me INTEGER,
            data TEXT,
            timestamp INTEGER,
            status INTEGER,
            media_wa_type INTEGER,
            starred INTEGER
         );
         CREATE TABLE chat (_id INTEGER PRIMARY KEY AUTOINCREMENT, jid_row_id INTEGER);",
    )
    .unwrap();
    insert_source_rows(&conn, rows);
}

fn insert_source_rows(conn: &Connection, rows: &[SourceRow<'_>]) {
    for row in rows {
        conn.execute(
            "INSERT INTO messages
                 (key_remote_jid, key_from_me, data, timestamp, status, media_wa_type, starred)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0)",
            params![row.remote, row.from_me, row.body, row.timestamp_ms, row.status],
        )
        .unwrap();
    }
}

/// Create an iOS store whose message table already holds keys `1..=existing`.
pub fn create_destination(path: &Path, existing: i64) {
    create_destination_with(path, existing, "");
}

/// Like [`create_destination`], with an extra table constraint on `ZWAMESSAGE`.
pub fn create_destination_with(path: &Path, existing: i64, extra_constraint: &str) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE ZWAMESSAGE (
            Z_PK INTEGER PRIMARY KEY,
            Z_ENT INTEGER,
            Z_OPT INTEGER,
            ZISFROMME INTEGER,
            ZMESSAGESTATUS INTEGER,
            ZMESSAGETYPE INTEGER,
            ZSTARRED INTEGER,
            ZGROUPEVENTTYPE INTEGER,
            ZMESSAGEDATE TIMESTAMP,
            ZSENTDATE TIMESTAMP,
            ZRECEIVEDDATE TIMESTAMP,
            ZFROMJID VARCHAR,
            ZTOJID VARCHAR,
            ZTEXT VARCHAR{extra_constraint}
         );
         CREATE TABLE Z_PRIMARYKEY (
            Z_ENT INTEGER PRIMARY KEY, Z_NAME VARCHAR, Z_SUPER INTEGER, Z_MAX INTEGER
         );
         INSERT INTO Z_PRIMARYKEY VALUES (2, 'WAMessage', 0, {existing});"
    ))
    .unwrap();

    for key in 1..=existing {
        conn.execute(
            "INSERT INTO ZWAMESSAGE (Z_PK, Z_ENT, Z_OPT, ZISFROMME, ZTEXT, ZMESSAGEDATE)
             VALUES (?1, 2, 1, 0, ?2, ?3)",
            params![key, format!("existing {key}"), 600_000_000.0 + key as f64],
        )
        .unwrap();
    }
}

/// Keys currently in the destination message table, ascending.
pub fn message_keys(path: &Path) -> Vec<i64> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn.prepare("SELECT Z_PK FROM ZWAMESSAGE ORDER BY Z_PK").unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap()
}

/// `Z_MAX` recorded for the message entity.
pub fn recorded_max_key(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(
        "SELECT Z_MAX FROM Z_PRIMARYKEY WHERE Z_NAME = 'WAMessage'",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

/// Switch a database to write-ahead logging and return a connection that
/// never checkpoints on its own, so committed rows stay in the `-wal` file.
pub fn open_wal_writer(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode, "wal");
    conn.execute_batch("PRAGMA wal_autocheckpoint = 0;").unwrap();
    conn
}

/// Rows in the destination message table whose body starts with `prefix`.
pub fn count_texts_with_prefix(path: &Path, prefix: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM ZWAMESSAGE WHERE substr(ZTEXT, 1, length(?1)) = ?1",
        [prefix],
        |row| row.get(0),
    )
    .unwrap()
}
