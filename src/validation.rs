use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

/// First 16 bytes of every plaintext SQLite 3 database file.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Validation utilities for caller input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the local party's phone number, used as the sender of outbound messages
    pub fn validate_identity(phone: &str) -> Result<()> {
        let trimmed = phone.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Phone number cannot be empty"));
        }

        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!(
                "Phone number must contain only digits, with an optional leading +"
            ));
        }

        if !(7..=15).contains(&digits.len()) {
            return Err(anyhow!("Phone number must be between 7 and 15 digits"));
        }

        Ok(())
    }

    /// Validate that a file exists and carries a plaintext SQLite header
    pub fn validate_sqlite_file(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(anyhow!("Database file does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Database path is not a file: {}", path.display()));
        }

        let mut file = File::open(path).map_err(|e| anyhow!("Cannot read database file: {e}"))?;
        let mut header = [0_u8; 16];
        let read = file
            .read(&mut header)
            .map_err(|e| anyhow!("Cannot read database file: {e}"))?;

        if read == 0 {
            return Err(anyhow!("Database file is empty: {}", path.display()));
        }

        if read < header.len() || &header != SQLITE_HEADER {
            return Err(anyhow!(
                "Not a plaintext SQLite database: {} (encrypted backups must be decrypted first)",
                path.display()
            ));
        }

        Ok(())
    }

    /// Validate that the output path does not point at any of the inputs
    pub fn validate_output_path(output: &Path, inputs: &[&Path]) -> Result<()> {
        if output.as_os_str().is_empty() {
            return Err(anyhow!("Output path cannot be empty"));
        }

        let normalized = normalize(output);
        if let Some(input) = inputs.iter().find(|input| normalize(input) == normalized) {
            return Err(anyhow!(
                "Output path must differ from input {}",
                input.display()
            ));
        }

        Ok(())
    }

    /// Validate progress reporting interval
    pub fn validate_progress_interval(interval: usize) -> Result<()> {
        if interval == 0 {
            return Err(anyhow!("Progress interval must be greater than 0"));
        }

        Ok(())
    }
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map_or_else(|_| path.to_path_buf(), |p| p.join(name))
        }
        _ => path.to_path_buf(),
    }
}
