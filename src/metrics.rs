use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::models::{MigrationCounters, SchemaVariant};

/// Metric names emitted for migration runs
pub struct MigrationMetrics {
    /// Rows inserted into the destination
    pub rows_migrated_total: &'static str,
    /// Rows skipped as duplicates
    pub rows_duplicate_total: &'static str,
    /// Rows skipped for having no body
    pub rows_skipped_empty_total: &'static str,
    /// Rows that failed to decode or insert
    pub rows_failed_total: &'static str,
    /// Completed runs
    pub runs_total: &'static str,
    /// Failed runs
    pub run_errors_total: &'static str,
    /// Wall-clock duration of a run
    pub run_duration: &'static str,
    /// Destination message count after the last run
    pub destination_messages: &'static str,
}

impl Default for MigrationMetrics {
    fn default() -> Self {
        Self {
            rows_migrated_total: "chat_migrate_rows_migrated_total",
            rows_duplicate_total: "chat_migrate_rows_duplicate_total",
            rows_skipped_empty_total: "chat_migrate_rows_skipped_empty_total",
            rows_failed_total: "chat_migrate_rows_failed_total",
            runs_total: "chat_migrate_runs_total",
            run_errors_total: "chat_migrate_run_errors_total",
            run_duration: "chat_migrate_run_duration_seconds",
            destination_messages: "chat_migrate_destination_messages",
        }
    }
}

impl MigrationMetrics {
    /// Record the totals of a successful run
    pub fn record_run(
        &self,
        counters: &MigrationCounters,
        variant: SchemaVariant,
        duration: Duration,
    ) {
        let label = variant.as_str();

        counter!(self.rows_migrated_total, "variant" => label).increment(counters.migrated);
        counter!(self.rows_duplicate_total, "variant" => label).increment(counters.duplicates);
        counter!(self.rows_skipped_empty_total, "variant" => label)
            .increment(counters.skipped_empty);
        counter!(self.rows_failed_total, "variant" => label).increment(counters.failed);
        counter!(self.runs_total, "variant" => label, "status" => "success").increment(1);
        histogram!(self.run_duration, "variant" => label).record(duration.as_secs_f64());
        gauge!(self.destination_messages).set(counters.destination_messages_after as f64);
    }

    /// Record a run that ended in a fatal error
    pub fn record_failure(&self, kind: &'static str) {
        counter!(self.run_errors_total, "kind" => kind).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        let metrics = MigrationMetrics::default();
        assert_eq!(metrics.rows_migrated_total, "chat_migrate_rows_migrated_total");
        assert!(metrics.run_duration.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = MigrationMetrics::default();
        let counters = MigrationCounters {
            migrated: 3,
            ..MigrationCounters::default()
        };
        metrics.record_run(&counters, SchemaVariant::Modern, Duration::from_millis(5));
        metrics.record_failure("materialization");
    }
}
