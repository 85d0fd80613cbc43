//! Line format for stored records
//!
//! Every record is stored as a single line:
//!
//! ```text
//! 2000-01-01 00:00:00.000000 payload bytes...
//! ```
//!
//! The first 26 bytes are a fixed-width UTC timestamp, followed by one space
//! and the raw payload. Payload bytes are not escaped.

use std::str;
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::error::Error;
use crate::record::Record;

/// `chrono` layout of the stored timestamp
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Width in bytes of a formatted timestamp
pub const TIMESTAMP_WIDTH: usize = 26;

/// Shortest valid line: timestamp plus separator
pub const MIN_LINE_LENGTH: usize = TIMESTAMP_WIDTH + 1;

/// Years that render as exactly four digits
pub const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Separator between timestamp and payload
pub const SEPARATOR: u8 = b' ';

/// Record separator appended by shard writers
pub const LINE_TERMINATOR: u8 = b'\n';

/// Errors produced while decoding a single line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The line cannot hold a timestamp and separator
    #[error("line is {length} bytes, expected at least {MIN_LINE_LENGTH}")]
    MalformedLine { length: usize },

    /// The leading 26 bytes are not a timestamp
    #[error("invalid timestamp {value:?}")]
    MalformedTimestamp { value: String },
}

impl LineError {
    /// Attach the location of the offending line
    pub fn at(self, location: impl Into<String>, line: usize) -> Error {
        match self {
            Self::MalformedLine { length } => Error::MalformedLine {
                location: location.into(),
                line,
                length,
            },
            Self::MalformedTimestamp { value } => Error::MalformedTimestamp {
                location: location.into(),
                line,
                value,
            },
        }
    }
}

/// Render a timestamp in the fixed-width stored form
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_LAYOUT).to_string()
}

/// Check that a timestamp renders in exactly [`TIMESTAMP_WIDTH`] bytes
pub fn is_storable(timestamp: &DateTime<Utc>) -> bool {
    STORABLE_YEARS.contains(&timestamp.year())
}

/// Parse a timestamp in the fixed-width stored form
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_LAYOUT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Encode a record without the line terminator
pub fn encode_line(record: &Record) -> Vec<u8> {
    let mut line = Vec::with_capacity(MIN_LINE_LENGTH + record.payload().len() + 1);
    line.extend_from_slice(format_timestamp(&record.timestamp()).as_bytes());
    line.push(SEPARATOR);
    line.extend_from_slice(record.payload());
    line
}

/// Encode a record followed by the line terminator, ready for one append
pub fn encode_line_terminated(record: &Record) -> Vec<u8> {
    let mut line = encode_line(record);
    line.push(LINE_TERMINATOR);
    line
}

/// Decode a line (without terminator) into a record
///
/// The byte after the timestamp is skipped whatever its value; everything
/// after it is the payload.
pub fn decode_line(line: &[u8]) -> Result<Record, LineError> {
    if line.len() < MIN_LINE_LENGTH {
        return Err(LineError::MalformedLine { length: line.len() });
    }

    let raw = &line[..TIMESTAMP_WIDTH];
    let timestamp = str::from_utf8(raw)
        .ok()
        .and_then(parse_timestamp)
        .ok_or_else(|| LineError::MalformedTimestamp {
            value: String::from_utf8_lossy(raw).into_owned(),
        })?;

    Ok(Record::new(timestamp, &line[MIN_LINE_LENGTH..]))
}
