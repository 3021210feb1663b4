use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use chat_history_migrate::config::AppConfig;
use chat_history_migrate::db;
use chat_history_migrate::detector::{detect_variant, DetectionPolicy};
use chat_history_migrate::inspector::SchemaInspector;
use chat_history_migrate::logging::init_logging;
use chat_history_migrate::{MigrationCounters, MigrationError, MigrationOrchestrator};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit console logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate messages from an Android store into a copy of an iOS store
    Migrate {
        /// Android message store (msgstore.db)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// iOS message store (ChatStorage.sqlite); never modified
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Local phone number with country code, e.g. 573001234567
        #[arg(short, long)]
        identity: Option<String>,

        /// Where to write the migrated database
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Insert rows even if the same date and body already exist
        #[arg(long)]
        no_dedupe: bool,

        /// Return source read errors instead of assuming the modern layout
        #[arg(long)]
        strict_detection: bool,

        /// Print the counters as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the tables and columns of a database
    Inspect {
        /// Database to inspect
        path: PathBuf,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report which source schema variant a database uses
    Detect {
        /// Android message store
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Initialize logging; the guard must outlive every log call
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref(),
        cli.json_logs || config.logging.format == "json",
    )?;

    info!("Starting chat-history-migrate");

    match cli.command {
        Commands::Migrate {
            source,
            destination,
            identity,
            output,
            no_dedupe,
            strict_detection,
            json,
        } => {
            let migration = &mut config.migration;
            if source.is_some() {
                migration.source_path = source;
            }
            if destination.is_some() {
                migration.destination_path = destination;
            }
            if identity.is_some() {
                migration.identity = identity;
            }
            if let Some(output) = output {
                migration.output_path = output;
            }
            if no_dedupe {
                migration.deduplicate = false;
            }
            if strict_detection {
                migration.detection_policy = DetectionPolicy::Propagate;
            }
            config.validate()?;
            migrate(&config, json)
        }
        Commands::Inspect { path, json } => inspect(&path, json),
        Commands::Detect { path } => detect(&path, config.migration.detection_policy),
    }
}

fn migrate(config: &AppConfig, json: bool) -> Result<()> {
    let migration = &config.migration;
    let source = migration
        .source_path
        .as_deref()
        .ok_or_else(|| {
            anyhow!("No source database given (--source or CHAT_MIGRATE__MIGRATION__SOURCE_PATH)")
        })?;
    let destination = migration
        .destination_path
        .as_deref()
        .ok_or_else(|| anyhow!("No destination database given (--destination)"))?;
    let identity = migration
        .identity
        .as_deref()
        .ok_or_else(|| anyhow!("No identity given (--identity)"))?;

    let orchestrator = MigrationOrchestrator::from_config(migration);
    let output = &migration.output_path;
    let counters = match orchestrator.run_migration(source, destination, identity, output) {
        Ok(counters) => counters,
        Err(err @ MigrationError::UnsupportedSchema { .. }) => {
            return Err(anyhow!(err)).context("Nothing was written");
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&counters)?);
    } else {
        print_summary(&counters, output);
    }

    Ok(())
}

fn print_summary(counters: &MigrationCounters, output: &std::path::Path) {
    println!("Source messages:               {}", counters.source_messages);
    println!("Destination messages (before): {}", counters.destination_messages_before);
    println!("Migrated:                      {}", counters.migrated);
    println!("Duplicates skipped:            {}", counters.duplicates);
    println!("Empty bodies skipped:          {}", counters.skipped_empty);
    println!("Failed rows:                   {}", counters.failed);
    println!("Destination messages (after):  {}", counters.destination_messages_after);
    println!("Output written to {}", output.display());
}

fn inspect(path: &std::path::Path, json: bool) -> Result<()> {
    let conn = db::open_read_only("inspected", path)?;
    let snapshot = SchemaInspector::new().inspect(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for table in snapshot.table_names() {
        let columns = snapshot.columns(table).unwrap_or_default();
        println!("{table}: {}", columns.join(", "));
    }
    Ok(())
}

fn detect(path: &std::path::Path, policy: DetectionPolicy) -> Result<()> {
    let conn = db::open_read_only("source", path)?;
    let variant = detect_variant(&conn, policy)?;
    println!("{variant}");
    Ok(())
}
