//! Destination working copy.
//!
//! The migration never writes to the destination the caller handed in. It
//! snapshots the destination into the output path with SQLite's online backup
//! and mutates only that copy. The snapshot includes changes still held in the
//! destination's write-ahead log.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db;
use crate::error::{MigrationError, Result};
use crate::validation::InputValidator;

/// Files SQLite keeps next to a database while it is open or after a crash.
const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Pages copied per backup step.
const BACKUP_PAGES_PER_STEP: i32 = 1024;

/// An open, writable copy of the destination database.
#[derive(Debug)]
pub struct WorkingCopy {
    path: PathBuf,
    conn: Connection,
}

impl WorkingCopy {
    /// Path of the copy on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection to the copy
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable connection to the copy, needed to open a transaction
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Close the connection, keeping the file as the run's output.
    pub fn finish(self) -> Result<PathBuf> {
        self.conn.close().map_err(|(_, e)| MigrationError::Database(e))?;
        Ok(self.path)
    }

    /// Close the connection and delete the file with its journal files.
    pub fn discard(self) -> Result<()> {
        let Self { path, conn } = self;
        drop(conn);
        if remove_database_files(&path)? {
            info!(path = %path.display(), "Discarded working copy");
        }
        Ok(())
    }
}

/// Path of the SQLite sidecar file `suffix` for `database`.
#[must_use]
pub fn sidecar_path(database: &Path, suffix: &str) -> PathBuf {
    let mut name = database.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Remove a database file and any journal files beside it.
/// Returns true if at least one file was removed.
fn remove_database_files(path: &Path) -> io::Result<bool> {
    let files = std::iter::once(path.to_path_buf())
        .chain(SIDECAR_SUFFIXES.iter().map(|suffix| sidecar_path(path, suffix)));

    let mut removed = false;
    for file in files {
        match fs::remove_file(&file) {
            Ok(()) => {
                debug!(path = %file.display(), "Removed file");
                removed = true;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

/// Snapshot `destination` into `output` and open the copy read-write.
///
/// Anything already at `output`, including leftover `-wal`, `-shm` and
/// `-journal` files from an interrupted run, is removed first.
pub fn materialize(destination: &Path, output: &Path) -> Result<WorkingCopy> {
    InputValidator::validate_sqlite_file(destination).map_err(|e| {
        let reason = format!("destination {}: {e}", destination.display());
        MigrationError::materialization(output, reason)
    })?;
    InputValidator::validate_output_path(output, &[destination])
        .map_err(|e| MigrationError::materialization(output, e))?;

    if remove_database_files(output).map_err(|e| MigrationError::materialization(output, e))? {
        debug!(path = %output.display(), "Removed existing output files");
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MigrationError::materialization(output, e))?;
    }

    let source = db::open_read_only("destination", destination)
        .map_err(|e| MigrationError::materialization(output, e))?;
    let mut conn =
        db::open_read_write(output).map_err(|e| MigrationError::materialization(output, e))?;

    {
        let backup = Backup::new(&source, &mut conn)
            .map_err(|e| MigrationError::materialization(output, e))?;
        backup
            .run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)
            .map_err(|e| MigrationError::materialization(output, e))?;
    }
    drop(source);

    info!(
        from = %destination.display(),
        to = %output.display(),
        "Destination copied to working copy"
    );

    Ok(WorkingCopy {
        path: output.to_path_buf(),
        conn,
    })
}
