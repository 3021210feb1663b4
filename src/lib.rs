//! Chat History Migrate - Android to iOS chat history transfer
//!
//! A Rust library for moving the message history of a chat application from
//! its Android store (`msgstore.db`) into its iOS store (`ChatStorage.sqlite`).
//!
//! # Features
//!
//! - Source schema inspection and variant detection
//! - Working-copy materialization; the original destination is never written
//! - Single-transaction row migration with de-duplication
//! - Structured logging, metrics and layered configuration

/// Configuration management
pub mod config;
/// Connection helpers and destination bookkeeping
pub mod db;
/// Source schema classification
pub mod detector;
/// Timestamp conversion between the two stores
pub mod epoch;
/// Error taxonomy
pub mod error;
/// Table and column discovery
pub mod inspector;
/// Logging setup and migration observers
pub mod logging;
/// Working copy of the destination store
pub mod materializer;
/// Metrics collection
pub mod metrics;
/// Row migration strategies
pub mod migrator;
/// Data models and structures
pub mod models;
/// End-to-end migration runs
pub mod orchestrator;
/// Database schema definitions
pub mod schema;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use error::{MigrationError, Result};
pub use models::{MigrationCounters, SchemaVariant};
pub use orchestrator::MigrationOrchestrator;
