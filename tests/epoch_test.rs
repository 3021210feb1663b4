//! Property tests for timestamp conversion.

use chat_history_migrate::epoch::{
    to_destination_epoch, FixedClock, APPLE_EPOCH_OFFSET_SECS, MAX_DESTINATION_SECS,
};
use proptest::prelude::*;

// 2024-06-01T00:00:00Z
const NOW: FixedClock = FixedClock(1_717_200_000.0);
const NOW_DESTINATION: f64 = 1_717_200_000.0 - APPLE_EPOCH_OFFSET_SECS as f64;

const MIN_VALID_MS: i64 = APPLE_EPOCH_OFFSET_SECS * 1000;
const MAX_VALID_MS: i64 = (1_893_456_000 + APPLE_EPOCH_OFFSET_SECS) * 1000;

proptest! {
    #[test]
    fn valid_timestamps_convert_exactly(ms in MIN_VALID_MS..=MAX_VALID_MS) {
        let expected = ms as f64 / 1000.0 - APPLE_EPOCH_OFFSET_SECS as f64;
        prop_assert!((to_destination_epoch(Some(ms), &NOW) - expected).abs() < 1e-6);
    }

    #[test]
    fn pre_2001_timestamps_fall_back(ms in 1_i64..MIN_VALID_MS) {
        prop_assert_eq!(to_destination_epoch(Some(ms), &NOW), NOW_DESTINATION);
    }

    #[test]
    fn converted_values_stay_in_range(ms in any::<i64>()) {
        let converted = to_destination_epoch(Some(ms), &NOW);
        prop_assert!((0.0..=MAX_DESTINATION_SECS).contains(&converted));
    }
}

#[test]
fn test_unknown_timestamps_use_current_time() {
    assert!(to_destination_epoch(None, &NOW) > 0.0);
    assert!(to_destination_epoch(Some(0), &NOW) > 0.0);
    assert_eq!(to_destination_epoch(Some(0), &NOW), NOW_DESTINATION);
}

#[test]
fn test_apple_epoch_boundary() {
    assert!(to_destination_epoch(Some(MIN_VALID_MS), &NOW).abs() < 1e-6);
}

#[test]
fn test_upper_boundary_is_inclusive() {
    assert!((to_destination_epoch(Some(MAX_VALID_MS), &NOW) - MAX_DESTINATION_SECS).abs() < 1e-6);
    assert_eq!(to_destination_epoch(Some(MAX_VALID_MS + 1000), &NOW), NOW_DESTINATION);
}
