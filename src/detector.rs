//! Source schema variant detection.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::inspector::{SchemaInspector, SchemaSnapshot};
use crate::models::SchemaVariant;
use crate::schema::{BASELINE_TABLES, MODERN_MARKER_TABLES};

/// What to do when the source schema cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Classify as [`SchemaVariant::Modern`] and carry on
    #[default]
    FailClosed,
    /// Return the read error to the caller
    Propagate,
}

/// Classify a table snapshot. Any single marker table is enough for `Modern`.
#[must_use]
pub fn classify(snapshot: &SchemaSnapshot) -> SchemaVariant {
    if MODERN_MARKER_TABLES.iter().any(|t| snapshot.has_table(t)) {
        SchemaVariant::Modern
    } else if BASELINE_TABLES.iter().all(|t| snapshot.has_table(t)) {
        SchemaVariant::Legacy
    } else {
        SchemaVariant::Unrecognized
    }
}

/// Inspect the source database and classify it under `policy`.
pub fn detect_variant(conn: &Connection, policy: DetectionPolicy) -> Result<SchemaVariant> {
    match SchemaInspector::new().inspect(conn) {
        Ok(snapshot) => {
            let variant = classify(&snapshot);
            info!(%variant, tables = snapshot.len(), "Detected source schema");
            Ok(variant)
        }
        Err(err) if policy == DetectionPolicy::FailClosed => {
            warn!(error = %err, "Could not read source schema, assuming modern layout");
            Ok(SchemaVariant::Modern)
        }
        Err(err) => Err(err),
    }
}
