//! Day arithmetic for shards
//!
//! Shards are keyed by UTC calendar day. This module truncates timestamps to
//! their day, renders the canonical day key and walks inclusive day spans.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};

/// Canonical day key layout; sorts lexicographically in date order
pub const DAY_KEY_LAYOUT: &str = "%Y-%m-%d";

/// Truncate a timestamp to its UTC calendar day
pub fn truncate_to_day(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// First instant of a UTC calendar day
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Create the day key of a date (`YYYY-MM-DD`)
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_LAYOUT).to_string()
}

/// Parse a day key back into a date
pub fn parse_day_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_KEY_LAYOUT)
        .map_err(|e| Error::config(format!("Invalid day key {:?}: {}", key, e)))
}

/// Every UTC day from the day of `from` to the day of `to`, inclusive
///
/// Empty when `to` falls on an earlier day than `from`.
pub fn day_span(from: &DateTime<Utc>, to: &DateTime<Utc>) -> DaySpan {
    DaySpan {
        next: Some(truncate_to_day(from)),
        last: truncate_to_day(to),
    }
}

/// Iterator over consecutive calendar days
#[derive(Debug, Clone)]
pub struct DaySpan {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DaySpan {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|day| *day <= self.last)?;
        self.next = current.succ_opt();
        Some(current)
    }
}
