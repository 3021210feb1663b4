//! Row migration from a source schema variant into the destination table.
//!
//! Each supported [`SchemaVariant`] has one [`RowMigrator`]. A migrator streams
//! the source message table in timestamp order, turns each row into a
//! [`DestinationMessageRecord`] and inserts it into the working copy, all
//! inside a single transaction.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::{params, Connection, ErrorCode, Row, Statement};
use tracing::{debug, info};

use crate::db;
use crate::epoch::{to_destination_epoch, Clock, SystemClock};
use crate::error::{MigrationError, Result};
use crate::inspector::SchemaInspector;
use crate::logging::{MigrationObserver, TracingObserver};
use crate::models::{
    DestinationMessageRecord, RowMigrationOutcome, SchemaVariant, SkipReason, SourceMessageRecord,
    MAX_DESTINATION_STATUS, MESSAGE_ENTITY_ID, MESSAGE_ENTITY_VERSION,
};
use crate::schema::{messages, zwamessage};

/// Default number of rows between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Everything a row migrator needs besides the two connections.
pub struct MigrationContext {
    identity: String,
    deduplicate: bool,
    progress_interval: u64,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn MigrationObserver>,
    cancelled: Arc<AtomicBool>,
}

impl MigrationContext {
    /// Context for the local party `identity`, with de-duplication on,
    /// the system clock and a tracing observer.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            deduplicate: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingObserver),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Skip rows whose converted date and body already exist in the destination
    #[must_use]
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Rows between progress events; zero is treated as one
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Clock used for unknown or out-of-range timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receiver of progress and per-row events
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Flag checked between rows; setting it rolls the run back
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Phone number used as the sender of outbound messages
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Observer receiving events for this run
    #[must_use]
    pub fn observer(&self) -> &dyn MigrationObserver {
        self.observer.as_ref()
    }

    /// Clock used by timestamp fallback
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Moves message rows of one source schema variant into the destination.
#[cfg_attr(test, mockall::automock)]
pub trait RowMigrator {
    /// Variant this migrator understands
    fn variant(&self) -> SchemaVariant;

    /// Migrate every source row into `destination` inside one transaction.
    ///
    /// Row-level faults are counted and skipped. Any other error rolls the
    /// whole transaction back and is returned.
    fn migrate(
        &self,
        source: &Connection,
        destination: &mut Connection,
        ctx: &MigrationContext,
    ) -> Result<RowMigrationOutcome>;
}

/// Migrators shipped with the crate. `Legacy` and `Unrecognized` have none.
#[must_use]
pub fn builtin_migrators() -> Vec<Box<dyn RowMigrator>> {
    vec![Box::new(ModernRowMigrator)]
}

/// Row migrator for the modern Android schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernRowMigrator;

impl ModernRowMigrator {
    /// Map one source record onto the destination row shape.
    ///
    /// Returns `None` for rows without a body; media-only messages are not migrated.
    #[must_use]
    pub fn transform(
        record: &SourceMessageRecord,
        key: i64,
        identity: &str,
        clock: &dyn Clock,
    ) -> Option<DestinationMessageRecord> {
        let text = record.body.clone()?;
        let date = to_destination_epoch(record.timestamp_ms, clock);

        let (from_address, to_address) = if record.from_me {
            (Some(identity.to_string()), record.remote_address.clone())
        } else {
            (record.remote_address.clone(), None)
        };

        Some(DestinationMessageRecord {
            key,
            entity: MESSAGE_ENTITY_ID,
            version: MESSAGE_ENTITY_VERSION,
            from_me: record.from_me,
            status: record.status.unwrap_or(0).clamp(0, MAX_DESTINATION_STATUS),
            message_type: record.media_type.unwrap_or(0),
            starred: record.starred,
            text,
            message_date: date,
            sent_date: date,
            received_date: date,
            from_address,
            to_address,
        })
    }

    fn read_source_row(row: &Row<'_>, row_id: i64) -> rusqlite::Result<SourceMessageRecord> {
        Ok(SourceMessageRecord {
            row_id,
            remote_address: row.get(messages::KEY_REMOTE_JID)?,
            from_me: row.get::<_, Option<i64>>(messages::KEY_FROM_ME)?.unwrap_or(0) != 0,
            body: row.get(messages::DATA)?,
            status: row.get(messages::STATUS)?,
            timestamp_ms: row.get(messages::TIMESTAMP)?,
            media_type: row.get(messages::MEDIA_WA_TYPE)?,
            starred: row.get::<_, Option<i64>>(messages::STARRED)?.unwrap_or(0) != 0,
        })
    }

    fn select_sql() -> String {
        format!(
            "SELECT {id}, {jid}, {from_me}, {data}, {ts}, {status}, {media}, {starred} \
             FROM {table} ORDER BY {ts} ASC, {id} ASC",
            id = messages::ID,
            jid = messages::KEY_REMOTE_JID,
            from_me = messages::KEY_FROM_ME,
            data = messages::DATA,
            ts = messages::TIMESTAMP,
            status = messages::STATUS,
            media = messages::MEDIA_WA_TYPE,
            starred = messages::STARRED,
            table = messages::TABLE,
        )
    }

    fn insert_sql() -> String {
        let columns = zwamessage::REQUIRED_COLUMNS.join(", ");
        let placeholders = (1..=zwamessage::REQUIRED_COLUMNS.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", zwamessage::TABLE)
    }

    fn ensure_destination_columns(destination: &Connection) -> Result<()> {
        let snapshot = SchemaInspector::new().inspect(destination)?;
        let missing = snapshot.missing_columns(zwamessage::TABLE, &zwamessage::REQUIRED_COLUMNS);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::IncompatibleDestination {
                table: zwamessage::TABLE,
                missing,
            })
        }
    }

    fn stream_rows(
        source: &Connection,
        destination: &Connection,
        ctx: &MigrationContext,
        total: u64,
        outcome: &mut RowMigrationOutcome,
    ) -> Result<()> {
        let existing = if ctx.deduplicate {
            let index = DuplicateIndex::load(destination)?;
            debug!(entries = index.len(), "Loaded duplicate index");
            Some(index)
        } else {
            None
        };
        let mut writer = RowWriter {
            insert: destination.prepare(&Self::insert_sql())?,
            existing,
        };

        let mut select = source.prepare(&Self::select_sql())?;
        let mut rows = select.query([])?;

        while let Some(row) = rows.next()? {
            if ctx.is_cancelled() {
                info!(examined = outcome.examined, "Cancellation requested, rolling back");
                return Err(MigrationError::Cancelled);
            }

            outcome.examined += 1;
            Self::process_row(row, &mut writer, ctx, outcome)?;

            if outcome.examined % ctx.progress_interval == 0 {
                ctx.observer().on_progress(outcome.examined, total);
            }
        }

        Ok(())
    }

    fn process_row(
        row: &Row<'_>,
        writer: &mut RowWriter<'_>,
        ctx: &MigrationContext,
        outcome: &mut RowMigrationOutcome,
    ) -> Result<()> {
        let row_id: i64 = row.get(messages::ID)?;

        let record = match Self::read_source_row(row, row_id) {
            Ok(record) => record,
            Err(source) => {
                outcome.failed += 1;
                ctx.observer()
                    .on_row_failed(row_id, &MigrationError::RowTransform { row_id, source });
                return Ok(());
            }
        };

        let Some(message) =
            Self::transform(&record, outcome.next_key, ctx.identity(), ctx.clock())
        else {
            outcome.skipped_empty += 1;
            ctx.observer().on_row_skipped(row_id, SkipReason::EmptyBody);
            return Ok(());
        };

        if writer.is_duplicate(&message) {
            outcome.duplicates += 1;
            ctx.observer().on_row_skipped(row_id, SkipReason::Duplicate);
            return Ok(());
        }

        match writer.insert(&message) {
            Ok(()) => {
                outcome.migrated += 1;
                outcome.next_key += 1;
                Ok(())
            }
            Err(source) if is_row_level(&source) => {
                outcome.failed += 1;
                ctx.observer()
                    .on_row_failed(row_id, &MigrationError::RowTransform { row_id, source });
                Ok(())
            }
            Err(source) => Err(source.into()),
        }
    }
}

impl RowMigrator for ModernRowMigrator {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::Modern
    }

    fn migrate(
        &self,
        source: &Connection,
        destination: &mut Connection,
        ctx: &MigrationContext,
    ) -> Result<RowMigrationOutcome> {
        Self::ensure_destination_columns(destination)?;
        let total = db::count_source_messages(source)?;

        let tx = destination.transaction()?;
        let mut outcome = RowMigrationOutcome {
            next_key: db::max_message_key(&tx)? + 1,
            ..RowMigrationOutcome::default()
        };
        info!(total, next_key = outcome.next_key, "Starting message migration");

        if let Err(err) = Self::stream_rows(source, &tx, ctx, total, &mut outcome) {
            tx.rollback().map_err(MigrationError::Transaction)?;
            return Err(err);
        }

        if outcome.migrated > 0 && db::record_max_message_key(&tx, outcome.next_key - 1)? {
            debug!(max_key = outcome.next_key - 1, "Updated message key allocator");
        }

        tx.commit().map_err(MigrationError::Transaction)?;

        info!(
            migrated = outcome.migrated,
            duplicates = outcome.duplicates,
            skipped_empty = outcome.skipped_empty,
            failed = outcome.failed,
            "Message migration complete"
        );
        Ok(outcome)
    }
}

/// (date, body) pairs already present in the destination.
///
/// Dates are keyed by their bit pattern; SQLite compares `-0.0` and `0.0` as
/// equal, so zero is normalised first.
#[derive(Debug, Default)]
struct DuplicateIndex {
    seen: HashSet<(u64, String)>,
}

impl DuplicateIndex {
    fn load(conn: &Connection) -> rusqlite::Result<Self> {
        let sql = format!(
            "SELECT {date}, {text} FROM {table} \
             WHERE typeof({date}) IN ('integer', 'real') AND typeof({text}) = 'text'",
            date = zwamessage::ZMESSAGEDATE,
            text = zwamessage::ZTEXT,
            table = zwamessage::TABLE,
        );
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt.query_map([], |row| {
            Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut index = Self::default();
        for pair in pairs {
            let (date, text) = pair?;
            index.seen.insert((date_key(date), text));
        }
        Ok(index)
    }

    fn len(&self) -> usize {
        self.seen.len()
    }

    fn contains(&self, message: &DestinationMessageRecord) -> bool {
        self.seen
            .contains(&(date_key(message.message_date), message.text.clone()))
    }

    fn insert(&mut self, message: &DestinationMessageRecord) {
        self.seen
            .insert((date_key(message.message_date), message.text.clone()));
    }
}

fn date_key(date: f64) -> u64 {
    if date == 0.0 {
        0.0_f64.to_bits()
    } else {
        date.to_bits()
    }
}

struct RowWriter<'conn> {
    insert: Statement<'conn>,
    existing: Option<DuplicateIndex>,
}

impl RowWriter<'_> {
    fn is_duplicate(&self, message: &DestinationMessageRecord) -> bool {
        self.existing
            .as_ref()
            .is_some_and(|index| index.contains(message))
    }

    fn insert(&mut self, message: &DestinationMessageRecord) -> rusqlite::Result<()> {
        self.insert.execute(params![
            message.key,
            message.entity,
            message.version,
            message.from_me,
            message.status,
            message.message_type,
            message.starred,
            message.text,
            message.message_date,
            message.sent_date,
            message.received_date,
            message.from_address,
            message.to_address,
            0_i64,
        ])?;
        if let Some(index) = self.existing.as_mut() {
            index.insert(message);
        }
        Ok(())
    }
}

/// Insert failures that only concern the row being written.
fn is_row_level(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::ConstraintViolation | ErrorCode::TooBig | ErrorCode::TypeMismatch
        ),
        rusqlite::Error::ToSqlConversionFailure(_) => true,
        _ => false,
    }
}
