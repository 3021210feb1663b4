//! Timestamp conversion between the two message stores.
//!
//! The source stores integer milliseconds since 1970-01-01T00:00:00Z. The
//! destination stores floating-point seconds since 2001-01-01T00:00:00Z.

use chrono::Utc;
use tracing::warn;

/// Seconds between 1970-01-01T00:00:00Z and 2001-01-01T00:00:00Z.
pub const APPLE_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Upper bound of accepted destination timestamps, roughly sixty years past 2001.
pub const MAX_DESTINATION_SECS: f64 = 1_893_456_000.0;

/// Source of wall-clock time for the fallback path.
pub trait Clock: Send + Sync {
    /// Current time as seconds since 1970-01-01T00:00:00Z
    fn now_unix_secs(&self) -> f64;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock frozen at one instant, for deterministic runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> f64 {
        self.0
    }
}

/// Current time expressed in the destination epoch.
#[must_use]
pub fn now_destination_secs(clock: &dyn Clock) -> f64 {
    clock.now_unix_secs() - APPLE_EPOCH_OFFSET_SECS as f64
}

/// Convert a source timestamp into destination-epoch seconds.
///
/// `None` and `0` mean "unknown" and yield the current time. Converted values
/// outside `[0, MAX_DESTINATION_SECS]` are replaced by the current time as well,
/// with a warning.
#[must_use]
pub fn to_destination_epoch(source_millis: Option<i64>, clock: &dyn Clock) -> f64 {
    let Some(millis) = source_millis.filter(|ms| *ms != 0) else {
        return now_destination_secs(clock);
    };

    let converted = millis as f64 / 1000.0 - APPLE_EPOCH_OFFSET_SECS as f64;
    if (0.0..=MAX_DESTINATION_SECS).contains(&converted) {
        converted
    } else {
        warn!(
            source_millis = millis,
            converted, "Timestamp out of range, substituting current time"
        );
        now_destination_secs(clock)
    }
}
