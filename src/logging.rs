use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::MigrationError;
use crate::models::{SchemaVariant, SkipReason};

/// Initialize structured logging system.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(
    log_level: Option<&str>,
    log_file: Option<&Path>,
    json_console: bool,
) -> Result<Option<WorkerGuard>> {
    // Set up environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = log_level.unwrap_or("info");
            EnvFilter::try_new(level)
        })
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {}", e))?;

    let console_layer = if json_console {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    // Add file layer if log file is specified
    if let Some(log_path) = log_file {
        let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = log_path
            .file_name()
            .map_or_else(|| "migration.log".into(), |n| n.to_string_lossy().into_owned());
        let file_appender = rolling::daily(directory, file_name);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .json();

        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e))?;
        info!("Logging system initialized");
        return Ok(Some(guard));
    }

    registry
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e))?;
    info!("Logging system initialized");
    Ok(None)
}

/// Performance timing utilities
pub struct OperationTimer {
    operation: String,
    start: std::time::Instant,
}

impl OperationTimer {
    /// Start timing a named operation
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Stop timing and log the elapsed milliseconds
    pub fn finish(self) -> u128 {
        let duration = self.start.elapsed().as_millis();
        tracing::info!(
            operation = self.operation,
            duration_ms = duration,
            "Operation completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let duration = self.start.elapsed().as_millis();
            tracing::debug!(
                operation = self.operation,
                duration_ms = duration,
                "Operation finished"
            );
        }
    }
}

/// Receives progress and per-row events from a migration run.
///
/// Every method has a no-op default so observers implement only what they need.
pub trait MigrationObserver: Send + Sync {
    /// The source schema was classified
    fn on_variant_detected(&self, _variant: SchemaVariant) {}

    /// `processed` of `total` source rows have been handled
    fn on_progress(&self, _processed: u64, _total: u64) {}

    /// A row was intentionally not inserted
    fn on_row_skipped(&self, _row_id: i64, _reason: SkipReason) {}

    /// A row failed and was skipped
    fn on_row_failed(&self, _row_id: i64, _error: &MigrationError) {}
}

/// Observer that turns migration events into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_variant_detected(&self, variant: SchemaVariant) {
        info!(%variant, "Source schema classified");
    }

    fn on_progress(&self, processed: u64, total: u64) {
        info!(processed, total, "Migration progress");
    }

    fn on_row_skipped(&self, row_id: i64, reason: SkipReason) {
        debug!(row_id, ?reason, "Skipped source row");
    }

    fn on_row_failed(&self, row_id: i64, error: &MigrationError) {
        warn!(row_id, error = %error, "Failed to migrate row, skipping");
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MigrationObserver for NoopObserver {}
