//! Data models for the migration engine
//!
//! Typed records for both schemas, the detected schema variant and the
//! counters a migration run reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Core Data entity id written into `Z_ENT` for message rows.
pub const MESSAGE_ENTITY_ID: i64 = 2;

/// Core Data version written into `Z_OPT` for freshly inserted rows.
pub const MESSAGE_ENTITY_VERSION: i64 = 1;

/// Highest status code the destination understands.
pub const MAX_DESTINATION_STATUS: i64 = 5;

/// One row of the source `messages` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMessageRecord {
    /// Source row id; never reused as a destination key
    pub row_id: i64,
    /// Remote party address (contact or group JID)
    pub remote_address: Option<String>,
    /// True if sent by the local user
    pub from_me: bool,
    /// Message body, absent for media-only rows
    pub body: Option<String>,
    /// Delivery/read status code
    pub status: Option<i64>,
    /// Milliseconds since 1970-01-01
    pub timestamp_ms: Option<i64>,
    /// Media type code
    pub media_type: Option<i64>,
    /// Starred flag
    pub starred: bool,
}

/// One row to be inserted into the destination `ZWAMESSAGE` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationMessageRecord {
    /// Sequential primary key (`Z_PK`)
    pub key: i64,
    /// Entity id (`Z_ENT`)
    pub entity: i64,
    /// Entity version (`Z_OPT`)
    pub version: i64,
    /// True if sent by the local user
    pub from_me: bool,
    /// Status code, clamped to `0..=MAX_DESTINATION_STATUS`
    pub status: i64,
    /// Message type code
    pub message_type: i64,
    /// Starred flag
    pub starred: bool,
    /// Message body
    pub text: String,
    /// Seconds since 2001-01-01
    pub message_date: f64,
    /// Seconds since 2001-01-01
    pub sent_date: f64,
    /// Seconds since 2001-01-01
    pub received_date: f64,
    /// Sender address
    pub from_address: Option<String>,
    /// Recipient address, `None` for inbound messages
    pub to_address: Option<String>,
}

/// Source schema layouts the engine knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Baseline `messages`/`chat` tables without any modern marker table
    Legacy,
    /// At least one modern marker table is present
    Modern,
    /// Neither markers nor the baseline tables were found
    Unrecognized,
}

impl SchemaVariant {
    /// Stable lowercase name, used in logs and metric labels
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a source row was not inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Row has no textual body (media-only messages are not migrated)
    EmptyBody,
    /// The same date and body is already in the destination or this run
    Duplicate,
}

/// Per-run totals returned by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCounters {
    /// Rows in the source message table
    pub source_messages: u64,
    /// Rows in the destination message table before the run
    pub destination_messages_before: u64,
    /// Rows in the destination message table after the run
    pub destination_messages_after: u64,
    /// Rows inserted
    pub migrated: u64,
    /// Rows skipped as duplicates
    pub duplicates: u64,
    /// Rows skipped for having no body
    pub skipped_empty: u64,
    /// Rows that failed to decode or insert
    pub failed: u64,
    /// Contacts migrated; reserved, always zero
    pub contacts: u64,
    /// Groups migrated; reserved, always zero
    pub groups: u64,
}

/// What a row migrator did with the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowMigrationOutcome {
    /// Rows read from the source
    pub examined: u64,
    /// Rows inserted
    pub migrated: u64,
    /// Rows skipped as duplicates
    pub duplicates: u64,
    /// Rows skipped for having no body
    pub skipped_empty: u64,
    /// Rows that failed to decode or insert
    pub failed: u64,
    /// First key left unused after the run
    pub next_key: i64,
}
