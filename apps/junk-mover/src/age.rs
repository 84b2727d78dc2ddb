//! Age classification of playlist items
//!
//! Both timestamps are normalized to UTC and compared as calendar dates, so
//! the time of day never moves an item across the threshold.

use chrono::{DateTime, Days, Utc};

/// Check whether an item added at `added_at` is old enough to move
///
/// Eligible when the UTC date of `added_at` is on or before the UTC date of
/// `reference_now` minus `duration_days`. A threshold reaching before the
/// earliest representable date admits nothing.
pub fn is_eligible(added_at: DateTime<Utc>, reference_now: DateTime<Utc>, duration_days: u64) -> bool {
    reference_now
        .date_naive()
        .checked_sub_days(Days::new(duration_days))
        .map(|cutoff| added_at.date_naive() <= cutoff)
        .unwrap_or(false)
}

/// Parse Spotify's `added_at` (ISO 8601 with offset, usually `Z`) into UTC
pub fn parse_added_at(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|e| format!("invalid added_at '{}': {}", raw, e))
}
