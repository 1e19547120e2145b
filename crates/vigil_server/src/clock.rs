use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole elapsed seconds.
///
/// Every timestamp this subsystem reads or writes goes through here so ban
/// arithmetic is always done against the same clock.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
