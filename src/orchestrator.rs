//! End-to-end migration run.
//!
//! The orchestrator opens the source read-only, classifies it, copies the
//! destination into a working copy, hands both to the matching
//! [`RowMigrator`] and reports [`MigrationCounters`]. Connections are closed
//! on every exit path by ownership; a failed run deletes its working copy, so
//! the caller is left with either a complete output or none at all.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::db;
use crate::detector::{detect_variant, DetectionPolicy};
use crate::epoch::{Clock, SystemClock};
use crate::error::{MigrationError, Result};
use crate::inspector::SchemaInspector;
use crate::logging::{MigrationObserver, OperationTimer, TracingObserver};
use crate::materializer::{materialize, WorkingCopy};
use crate::metrics::MigrationMetrics;
use crate::migrator::{
    builtin_migrators, MigrationContext, RowMigrator, DEFAULT_PROGRESS_INTERVAL,
};
use crate::models::{MigrationCounters, SchemaVariant};
use crate::schema::CORE_DATA_INTERNAL_PREFIX;
use crate::validation::InputValidator;

/// Sequences detection, materialization and row migration for one run.
pub struct MigrationOrchestrator {
    migrators: Vec<Box<dyn RowMigrator>>,
    detection_policy: DetectionPolicy,
    deduplicate: bool,
    progress_interval: u64,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn MigrationObserver>,
    cancelled: Arc<AtomicBool>,
    metrics: MigrationMetrics,
}

impl Default for MigrationOrchestrator {
    fn default() -> Self {
        Self {
            migrators: builtin_migrators(),
            detection_policy: DetectionPolicy::default(),
            deduplicate: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingObserver),
            cancelled: Arc::new(AtomicBool::new(false)),
            metrics: MigrationMetrics::default(),
        }
    }
}

impl MigrationOrchestrator {
    /// Orchestrator with the built-in migrators and default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Orchestrator configured from the `migration` config section
    #[must_use]
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new()
            .with_detection_policy(config.detection_policy)
            .with_deduplication(config.deduplicate)
            .with_progress_interval(config.progress_interval)
    }

    /// Replace the set of row migrators
    #[must_use]
    pub fn with_migrators(mut self, migrators: Vec<Box<dyn RowMigrator>>) -> Self {
        self.migrators = migrators;
        self
    }

    /// How to treat unreadable source schemas
    #[must_use]
    pub fn with_detection_policy(mut self, policy: DetectionPolicy) -> Self {
        self.detection_policy = policy;
        self
    }

    /// Enable or disable date+body de-duplication
    #[must_use]
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Rows between progress events
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Clock for timestamp fallback
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

    /// Flag that cancels the running migration, or the next one, when set.
    ///
    /// Every run clears the flag when it returns, so one orchestrator can be
    /// cancelled and then run again.
    #[must_use]
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run one migration and return its counters.
    ///
    /// `identity` is the local party's phone number. On success the migrated
    /// database is left at `output_path`; on failure nothing is left there and
    /// `destination_path` is never modified.
    pub fn run_migration(
        &self,
        source_path: &Path,
        destination_path: &Path,
        identity: &str,
        output_path: &Path,
    ) -> Result<MigrationCounters> {
        let timer = OperationTimer::new("migration");
        let started = Instant::now();

        let result = self.execute(source_path, destination_path, identity, output_path);
        self.cancelled.store(false, Ordering::Relaxed);
        match &result {
            Ok((counters, variant)) => {
                self.metrics.record_run(counters, *variant, started.elapsed());
                info!(
                    source_messages = counters.source_messages,
                    destination_before = counters.destination_messages_before,
                    migrated = counters.migrated,
                    duplicates = counters.duplicates,
                    skipped_empty = counters.skipped_empty,
                    failed = counters.failed,
                    destination_after = counters.destination_messages_after,
                    "Migration summary"
                );
            }
            Err(err) => {
                self.metrics.record_failure(err.kind());
                warn!(error = %err, "Migration failed");
            }
        }
        timer.finish();

        result.map(|(counters, _)| counters)
    }

    fn execute(
        &self,
        source_path: &Path,
        destination_path: &Path,
        identity: &str,
        output_path: &Path,
    ) -> Result<(MigrationCounters, SchemaVariant)> {
        InputValidator::validate_identity(identity)
            .map_err(|e| MigrationError::InvalidConfig(e.to_string()))?;
        InputValidator::validate_output_path(output_path, &[source_path, destination_path])
            .map_err(|e| MigrationError::InvalidConfig(e.to_string()))?;

        info!(path = %source_path.display(), "Opening source database");
        let source = db::open_read_only("source", source_path)?;

        let variant = {
            let _timer = OperationTimer::new("detect");
            detect_variant(&source, self.detection_policy)?
        };
        self.observer.on_variant_detected(variant);
        let migrator = self.migrator_for(variant)?;

        let mut counters = MigrationCounters {
            source_messages: db::count_source_messages(&source)?,
            ..MigrationCounters::default()
        };

        let mut copy = {
            let _timer = OperationTimer::new("materialize");
            materialize(destination_path, output_path)?
        };

        match self.migrate_into(&source, &mut copy, migrator, identity, &mut counters) {
            Ok(()) => {
                let output = copy.finish()?;
                info!(path = %output.display(), "Output database ready");
                Ok((counters, variant))
            }
            Err(err) => {
                if let Err(discard_err) = copy.discard() {
                    warn!(error = %discard_err, "Failed to remove working copy");
                }
                Err(err)
            }
        }
    }

    fn migrator_for(&self, variant: SchemaVariant) -> Result<&dyn RowMigrator> {
        self.migrators
            .iter()
            .find(|m| m.variant() == variant)
            .map(|m| &**m)
            .ok_or(MigrationError::UnsupportedSchema { variant })
    }

    fn context(&self, identity: &str) -> MigrationContext {
        MigrationContext::new(identity)
            .with_deduplication(self.deduplicate)
            .with_progress_interval(self.progress_interval)
            .with_clock(Arc::clone(&self.clock))
            .with_observer(Arc::clone(&self.observer))
            .with_cancellation(Arc::clone(&self.cancelled))
    }

    fn migrate_into(
        &self,
        source: &Connection,
        copy: &mut WorkingCopy,
        migrator: &dyn RowMigrator,
        identity: &str,
        counters: &mut MigrationCounters,
    ) -> Result<()> {
        if let Ok(schema) = SchemaInspector::new()
            .exclude_prefix(CORE_DATA_INTERNAL_PREFIX)
            .inspect(copy.connection())
        {
            debug!(tables = ?schema.table_names().collect::<Vec<_>>(), "Destination schema");
        }

        counters.destination_messages_before = db::count_destination_messages(copy.connection())?;

        let outcome = {
            let _timer = OperationTimer::new("migrate_rows");
            migrator.migrate(source, copy.connection_mut(), &self.context(identity))?
        };

        counters.migrated = outcome.migrated;
        counters.duplicates = outcome.duplicates;
        counters.skipped_empty = outcome.skipped_empty;
        counters.failed = outcome.failed;
        counters.destination_messages_after = db::count_destination_messages(copy.connection())?;

        let expected = counters.destination_messages_before + counters.migrated;
        if counters.destination_messages_after != expected {
            warn!(
                expected,
                actual = counters.destination_messages_after,
                "Destination message count does not match migrated rows"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrator::MockRowMigrator;
    use tempfile::tempdir;

    fn modern_source(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (
                 _id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER,
                 data TEXT, timestamp INTEGER, status INTEGER, media_wa_type INTEGER,
                 starred INTEGER
             );
             CREATE TABLE chat (_id INTEGER PRIMARY KEY);
             CREATE TABLE message_quoted (message_row_id INTEGER PRIMARY KEY);
             INSERT INTO messages (key_remote_jid, key_from_me, data, timestamp, status)
             VALUES ('15550001111@s.whatsapp.net', 1, 'hi', 1700000000000, 4);",
        )
        .unwrap();
    }

    #[test]
    fn test_materialization_failure_never_invokes_migrator() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("android.db");
        modern_source(&source);

        let mut mock = MockRowMigrator::new();
        mock.expect_variant().return_const(SchemaVariant::Modern);
        mock.expect_migrate().times(0);

        let orchestrator = MigrationOrchestrator::new().with_migrators(vec![Box::new(mock)]);
        let output = dir.path().join("out.db");
        let err = orchestrator
            .run_migration(&source, &dir.path().join("missing.db"), "573001234567", &output)
            .unwrap_err();

        assert!(matches!(err, MigrationError::Materialization { .. }), "{err}");
        assert!(!output.exists());
    }

    #[test]
    fn test_migrator_error_discards_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("android.db");
        let destination = dir.path().join("ios.db");
        modern_source(&source);
        Connection::open(&destination)
            .unwrap()
            .execute_batch("CREATE TABLE ZWAMESSAGE (Z_PK INTEGER PRIMARY KEY);")
            .unwrap();

        let mut mock = MockRowMigrator::new();
        mock.expect_variant().return_const(SchemaVariant::Modern);
        mock.expect_migrate().times(1).returning(|_, _, _| {
            Err(MigrationError::Transaction(rusqlite::Error::QueryReturnedNoRows))
        });

        let output = dir.path().join("out.db");
        let err = MigrationOrchestrator::new()
            .with_migrators(vec![Box::new(mock)])
            .run_migration(&source, &destination, "573001234567", &output)
            .unwrap_err();

        assert!(matches!(err, MigrationError::Transaction(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_no_registered_migrator_is_unsupported() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("android.db");
        modern_source(&source);

        let destination = dir.path().join("ios.db");
        let output = dir.path().join("out.db");
        let err = MigrationOrchestrator::new()
            .with_migrators(Vec::new())
            .run_migration(&source, &destination, "573001234567", &output)
            .unwrap_err();

        assert!(matches!(
            err,
            MigrationError::UnsupportedSchema {
                variant: SchemaVariant::Modern
            }
        ));
    }

    #[test]
    fn test_cancellation_flag_clears_after_run() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("android.db");
        modern_source(&source);

        let orchestrator = MigrationOrchestrator::new().with_migrators(Vec::new());
        let flag = orchestrator.cancellation_flag();
        flag.store(true, Ordering::Relaxed);

        let destination = dir.path().join("ios.db");
        let output = dir.path().join("out.db");
        assert!(orchestrator
            .run_migration(&source, &destination, "573001234567", &output)
            .is_err());
        assert!(!flag.load(Ordering::Relaxed));
    }
}
