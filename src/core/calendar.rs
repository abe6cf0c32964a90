//! Calendar helpers for local-time day boundaries.

use std::cmp::Ordering;

use chrono::{DateTime, MappedLocalTime, NaiveTime, TimeDelta, TimeZone};
use ordered_float::OrderedFloat;

const ONE_DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Added on top of whole days so that a ±1h daylight-saving shift
/// never lands the sum on the neighbouring calendar day.
const DST_GUARD_MILLIS: i64 = 61 * 60 * 1000;

/// Local midnight of the same calendar day, in the same time zone.
#[must_use]
pub fn truncate_to_midnight<Tz: TimeZone>(time: &DateTime<Tz>) -> DateTime<Tz> {
    let timezone = time.timezone();
    let date = time.date_naive();
    match timezone.from_local_datetime(&date.and_time(NaiveTime::MIN)) {
        MappedLocalTime::Single(midnight) | MappedLocalTime::Ambiguous(midnight, _) => midnight,

        // Some zones skip midnight itself when switching to summer time:
        MappedLocalTime::None => (1..=2)
            .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
            .find_map(|naive| timezone.from_local_datetime(&naive).earliest())
            .unwrap_or_else(|| time.clone()),
    }
}

/// Local midnight `n_days` calendar days after the day of `time` (negative goes back).
#[must_use]
pub fn add_days<Tz: TimeZone>(time: &DateTime<Tz>, n_days: i64) -> DateTime<Tz> {
    let shifted = truncate_to_midnight(time)
        + TimeDelta::milliseconds(n_days * ONE_DAY_MILLIS + DST_GUARD_MILLIS);
    truncate_to_midnight(&shifted)
}

/// Left-pad the number with zeros, `None` is rendered as zero.
#[must_use]
pub fn pad(number: impl Into<Option<u32>>, width: usize) -> String {
    format!("{:0>width$}", number.into().unwrap_or(0))
}

/// Ascending price order, equal prices compare equal so that a stable sort keeps their order.
pub fn compare_by_price<K>(lhs: &(K, f64), rhs: &(K, f64)) -> Ordering {
    OrderedFloat(lhs.1).cmp(&OrderedFloat(rhs.1))
}

/// `HH:MM` for the minute of the day, wrapping around at midnight.
#[must_use]
pub fn format_minute_of_day(minute: u32) -> String {
    let minute = minute % (24 * 60);
    format!("{}:{}", pad(minute / 60, 2), pad(minute % 60, 2))
}

/// `HH:MM-HH:MM` range of the zero-based quarter-hour slot.
#[must_use]
pub fn quarter_slot_label(index: u32) -> String {
    format!("{}-{}", format_minute_of_day(index * 15), format_minute_of_day(index * 15 + 15))
}
