//! Start-time allocation for seeded matches.

use chrono::{DateTime, Duration, Utc};

/// Minutes between consecutive round-1 match start times
pub const MATCH_INTERVAL_MINUTES: i64 = 10;

/// Start time for the round-1 match at `index`, counted from the event's
/// start date in fixed steps. The spacing is per match, not per round.
pub fn allocate(base: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    base + Duration::minutes(MATCH_INTERVAL_MINUTES * index as i64)
}
