use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::detector::DetectionPolicy;
use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Migration inputs and behaviour
    pub migration: MigrationConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

/// Inputs and behaviour of a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Android message store (`msgstore.db`)
    pub source_path: Option<PathBuf>,
    /// iOS message store (`ChatStorage.sqlite`)
    pub destination_path: Option<PathBuf>,
    /// Where the migrated copy of the destination is written
    pub output_path: PathBuf,
    /// Local party's phone number with country code
    pub identity: Option<String>,
    /// Skip rows whose converted date and body already exist
    pub deduplicate: bool,
    /// Rows between progress events
    pub progress_interval: u64,
    /// How to treat an unreadable source schema
    pub detection_policy: DetectionPolicy,
}

/// Logging output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file; rotated daily
    pub file_path: Option<PathBuf>,
    /// Console format, "text" or "json"
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            migration: MigrationConfig {
                source_path: None,
                destination_path: None,
                output_path: PathBuf::from("out/out.db"),
                identity: None,
                deduplicate: true,
                progress_interval: 1000,
                detection_policy: DetectionPolicy::FailClosed,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("CHAT_MIGRATE").separator("__"))
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let interval = usize::try_from(self.migration.progress_interval).unwrap_or(usize::MAX);
        InputValidator::validate_progress_interval(interval)?;

        if let Some(identity) = &self.migration.identity {
            InputValidator::validate_identity(identity)?;
        }

        if self.migration.output_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("output_path cannot be empty"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
