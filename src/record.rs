//! Timestamped records
//!
//! A record is an immutable UTC timestamp paired with an opaque byte payload.
//! Timestamps are kept at microsecond precision, the precision of the line
//! format, so a record always reads back equal to what was written.

use std::fmt;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Seconds between the Unix epoch and 0001-01-01T00:00:00Z
const PLACEHOLDER_EPOCH_SECONDS: i64 = -62_135_596_800;

/// Timestamp carried by placeholder records (0001-01-01 00:00:00 UTC)
pub fn placeholder_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(PLACEHOLDER_EPOCH_SECONDS, 0).unwrap_or_default()
}

/// A single timestamped entry in the store
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
    timestamp: DateTime<Utc>,
    payload: Vec<u8>,
}

impl Record {
    /// Create a new record, truncating the timestamp to microseconds
    ///
    /// The payload must not contain a newline byte; the line format has no
    /// escaping and such a record would read back as two lines.
    pub fn new(timestamp: DateTime<Utc>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(6),
            payload: payload.into(),
        }
    }

    /// Create a record whose payload is the compact JSON encoding of `value`
    pub fn json<T: Serialize + ?Sized>(timestamp: DateTime<Utc>, value: &T) -> Result<Self> {
        Ok(Self::new(timestamp, serde_json::to_vec(value)?))
    }

    /// Record timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// UTC calendar day of the record, i.e. the shard it belongs to
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Record payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the record and return its payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Decode the payload as JSON
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Check if this is the zero-valued record returned for absent data
    pub fn is_placeholder(&self) -> bool {
        self.payload.is_empty() && self.timestamp == placeholder_timestamp()
    }
}

impl Default for Record {
    fn default() -> Self {
        Self {
            timestamp: placeholder_timestamp(),
            payload: Vec::new(),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("timestamp", &self.timestamp)
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish()
    }
}
