//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whether a record stamped at `stored_at` has outlived `ttl` as of `at`
///
/// Timestamps from the future (clock skew) count as fresh.
pub fn is_expired(stored_at: DateTime<Utc>, ttl: Duration, at: DateTime<Utc>) -> bool {
    match (at - stored_at).to_std() {
        Ok(age) => age > ttl,
        Err(_) => false,
    }
}

/// Parse a backend timestamp (RFC 3339, or naive `YYYY-MM-DD HH:MM:SS` as UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
