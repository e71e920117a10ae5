//! Venue-clock helpers. The event runs on a fixed UTC offset, so "today",
//! day keys and hour keys are all computed in that offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// `[start, end)` of the venue day containing `now`
pub fn day_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(&offset).date_naive();
    let local_midnight = local_date.and_time(NaiveTime::MIN);
    let start = offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + Duration::days(1))
}

/// `dd/MM` key of an instant
pub fn day_key(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d/%m").to_string()
}

/// `HH` key of an instant
pub fn hour_key(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H").to_string()
}

/// `dd/mm/yyyy`, as printed in reports
pub fn short_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d/%m/%Y").to_string()
}
