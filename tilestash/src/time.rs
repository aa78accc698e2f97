//! Time-related utility functions.
//!
//! Timestamps are persisted as whole seconds since the Unix epoch. These
//! helpers convert between that representation and `SystemTime`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Convert a `SystemTime` to whole seconds since the Unix epoch.
///
/// Times before the epoch map to negative values.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use tilestash::time::to_unix_seconds;
///
/// assert_eq!(to_unix_seconds(UNIX_EPOCH + Duration::from_secs(90)), 90);
/// ```
pub fn to_unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(before) => {
            let secs = before.duration().as_secs();
            -i64::try_from(secs).unwrap_or(i64::MAX)
        }
    }
}

/// Convert whole seconds since the Unix epoch back to a `SystemTime`.
pub fn from_unix_seconds(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

/// Current time in whole seconds since the Unix epoch.
pub fn now_seconds() -> i64 {
    to_unix_seconds(SystemTime::now())
}
