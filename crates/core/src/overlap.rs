//! Interval-conflict detection for calendar events.
//!
//! The policy is deliberately conservative about boundaries: two bookings
//! that merely touch (one ends exactly when the other starts) do not
//! conflict, so back-to-back appointments are permitted. Any other shared
//! instant counts as a conflict.

use chrono::{DateTime, Utc};

/// Returns true if the proposed interval `[new_start, new_end]` conflicts
/// with the existing interval `[fixed_start, fixed_end]`.
///
/// Policy, checked in order:
/// 1. Boundary touch (`new_start == fixed_end` or `new_end == fixed_start`)
///    is not a conflict.
/// 2. Either endpoint of the new interval falling within the existing
///    interval (inclusive) is a conflict. This also covers a new interval
///    strictly inside the existing one, since its start then lies within.
/// 3. The new interval fully containing the existing one is a conflict.
pub fn overlaps(
    fixed_start: DateTime<Utc>,
    fixed_end: DateTime<Utc>,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> bool {
    if new_start == fixed_end || new_end == fixed_start {
        // edge case: back-to-back bookings
        return false;
    }
    if (new_start >= fixed_start && new_start <= fixed_end)
        || (new_end >= fixed_start && new_end <= fixed_end)
    {
        // inner limits
        return true;
    }
    if new_start <= fixed_start && new_end >= fixed_end {
        // outer limits
        return true;
    }
    false
}
