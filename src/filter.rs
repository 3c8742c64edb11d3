//! Relative time-range filtering.
//!
//! "Today" and "yesterday" are calendar days in the zone of the supplied
//! `now`, so callers choose the local zone by choosing the type of `now`.

use chrono::{DateTime, Days, Duration, TimeZone, Utc};

use crate::model::{Reading, TimeRange};

/// Keep the readings that fall in `range` as seen from `now`.
///
/// `None` keeps everything. Input order is preserved.
pub fn filter_readings<Tz: TimeZone>(
    readings: &[Reading],
    range: Option<TimeRange>,
    now: &DateTime<Tz>,
) -> Vec<Reading> {
    readings
        .iter()
        .filter(|reading| in_range(reading, range, now))
        .cloned()
        .collect()
}

#[must_use]
pub fn in_range<Tz: TimeZone>(
    reading: &Reading,
    range: Option<TimeRange>,
    now: &DateTime<Tz>,
) -> bool {
    let Some(range) = range else {
        return true;
    };

    let local_date = reading.timestamp.with_timezone(&now.timezone()).date_naive();
    let today = now.date_naive();

    match range {
        TimeRange::Today => local_date == today,
        TimeRange::Yesterday => today.pred_opt() == Some(local_date),
        // No upper bound: readings stamped after `now` are kept.
        TimeRange::Last7Days => window_start(now, 7).is_none_or(|start| reading.timestamp >= start),
        TimeRange::Last30Days => window_start(now, 30).is_none_or(|start| reading.timestamp >= start),
    }
}

/// `now` moved back `days` calendar days, keeping the local time of day.
///
/// `None` when the window would start before the earliest representable
/// instant, in which case the window is open-ended.
fn window_start<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> Option<DateTime<Utc>> {
    // A DST gap can make the shifted local time ambiguous; fall back to exact hours.
    now.clone()
        .checked_sub_days(Days::new(u64::from(days)))
        .or_else(|| now.clone().checked_sub_signed(Duration::days(i64::from(days))))
        .map(|start| start.with_timezone(&Utc))
}
