//! Day shards
//!
//! A shard holds every record of one UTC calendar day, in append order. Each
//! storage backend provides its own shard type; all of them implement
//! [`Shard`].

mod day;

pub use day::{day_key, day_span, day_start, parse_day_key, truncate_to_day, DaySpan, DAY_KEY_LAYOUT};

use std::fmt;
use std::ops::ControlFlow;
use chrono::NaiveDate;

use crate::codec;
use crate::error::{Error, Result};
use crate::record::Record;

/// Lazy, single-pass sequence of the records in a shard
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// Storage unit for the records of one UTC calendar day
pub trait Shard: fmt::Debug {
    /// Calendar day held by this shard
    fn date(&self) -> NaiveDate;

    /// Backend-specific location (file path or day key)
    fn location(&self) -> String;

    /// Append records in order
    ///
    /// Stops at the first record dated on another day and fails with
    /// [`Error::WrongShard`]; records appended before it stay appended. A
    /// timestamp outside years 0000 to 9999 stops it the same way with
    /// [`Error::TimestampOutOfRange`].
    fn add(&self, records: &[Record]) -> Result<usize>;

    /// Iterate over all records in storage order
    ///
    /// A shard whose backing container cannot be opened yields nothing.
    /// Every call starts again from the first record.
    fn scan(&self) -> RecordIter<'_>;

    /// Visit every record until the callback breaks or fails
    ///
    /// A callback error stops the scan and is returned as is.
    fn for_each<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<ControlFlow<()>>,
        Self: Sized,
    {
        for record in self.scan() {
            if callback(record?)?.is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Reject a record that does not belong to the shard's day
pub(crate) fn ensure_same_day(shard: NaiveDate, record: &Record) -> Result<()> {
    if record.date() != shard {
        return Err(Error::wrong_shard(shard, record.timestamp()));
    }
    Ok(())
}

/// Reject a record whose timestamp the line format cannot hold
pub(crate) fn ensure_storable(record: &Record) -> Result<()> {
    if !codec::is_storable(&record.timestamp()) {
        return Err(Error::TimestampOutOfRange(record.timestamp()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_ensure_same_day() {
        let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let inside = Record::new(Utc.with_ymd_and_hms(2000, 1, 1, 23, 59, 59).unwrap(), b"a".to_vec());
        let outside = Record::new(Utc.with_ymd_and_hms(2000, 1, 2, 0, 0, 0).unwrap(), b"b".to_vec());

        assert!(ensure_same_day(day, &inside).is_ok());
        assert!(matches!(ensure_same_day(day, &outside), Err(Error::WrongShard { .. })));
    }

    #[test]
    fn test_ensure_storable() {
        let far = Record::new(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap(), b"a".to_vec());
        assert!(matches!(ensure_storable(&far), Err(Error::TimestampOutOfRange(_))));
        assert!(ensure_storable(&Record::default()).is_ok());
    }
}
