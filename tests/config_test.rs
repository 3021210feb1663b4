//! Unit tests for config.rs module

use std::path::PathBuf;

use chat_history_migrate::config::{AppConfig, LoggingConfig, MigrationConfig};
use chat_history_migrate::detector::DetectionPolicy;

#[test]
fn test_default_migration_config() {
    let config = AppConfig::default();

    assert_eq!(config.migration.source_path, None);
    assert_eq!(config.migration.destination_path, None);
    assert_eq!(config.migration.output_path, PathBuf::from("out/out.db"));
    assert_eq!(config.migration.identity, None);
    assert!(config.migration.deduplicate);
    assert_eq!(config.migration.progress_interval, 1000);
    assert_eq!(config.migration.detection_policy, DetectionPolicy::FailClosed);
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_zero_progress_interval() {
    let mut config = AppConfig::default();
    config.migration.progress_interval = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_identity() {
    let mut config = AppConfig::default();
    config.migration.identity = Some("not-a-phone".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_identity() {
    let mut config = AppConfig::default();
    config.migration.identity = Some("+573001234567".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_empty_output_path() {
    let mut config = AppConfig::default();
    config.migration.output_path = PathBuf::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_levels() {
    let valid_levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in valid_levels {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "Failed for level: {}", level);
    }
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_detection_policy_serialization() {
    let json = serde_json::to_string(&DetectionPolicy::Propagate).unwrap();
    assert_eq!(json, "\"propagate\"");

    let policy: DetectionPolicy = serde_json::from_str("\"fail_closed\"").unwrap();
    assert_eq!(policy, DetectionPolicy::FailClosed);
}

#[test]
fn test_config_serialization_roundtrip() {
    let config = AppConfig {
        migration: MigrationConfig {
            source_path: Some(PathBuf::from("msgstore.db")),
            destination_path: Some(PathBuf::from("ChatStorage.sqlite")),
            output_path: PathBuf::from("migrated.db"),
            identity: Some("573001234567".to_string()),
            deduplicate: false,
            progress_interval: 50,
            detection_policy: DetectionPolicy::Propagate,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            file_path: Some(PathBuf::from("logs/migrate.log")),
            format: "json".to_string(),
        },
    };

    let json = serde_json::to_string(&config).unwrap();
    let parsed: AppConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.migration.output_path, config.migration.output_path);
    assert_eq!(parsed.migration.identity, config.migration.identity);
    assert!(!parsed.migration.deduplicate);
    assert_eq!(parsed.migration.detection_policy, DetectionPolicy::Propagate);
    assert_eq!(parsed.logging.file_path, config.logging.file_path);
}

#[test]
fn test_get_log_level_default() {
    std::env::remove_var("RUST_LOG");
    let config = AppConfig::default();
    assert_eq!(config.get_log_level(), "info");
}
