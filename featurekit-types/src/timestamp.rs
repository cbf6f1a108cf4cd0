//! Epoch-millisecond conversions for date fields.
//!
//! The wire carries dates as signed milliseconds since the Unix epoch.

use crate::{CoercionError, CoercionResult};
use chrono::{DateTime, Utc};

/// Converts an epoch-millisecond offset into a UTC date-time.
pub fn from_epoch_millis(millis: i64) -> CoercionResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(CoercionError::InvalidTimestamp(millis))
}

/// Converts a UTC date-time into its epoch-millisecond offset.
#[must_use]
pub fn to_epoch_millis(value: &DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}
