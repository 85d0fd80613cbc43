//! Error handling for dayfile
//!
//! This module provides the error type and result alias shared by every
//! storage backend and the database facade.

use std::io;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Errors that can occur in dayfile operations
#[derive(Error, Debug)]
pub enum Error {
    /// A mutation was attempted on a read-only store
    #[error("This connection is read-only")]
    ReadOnly,

    /// The start of a range query is after its end
    #[error("Invalid range: start {from} is after end {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// A record limit is negative or too large to allocate
    #[error("Invalid limit: {0} (must be zero or more and fit in memory)")]
    InvalidLimit(i64),

    /// A shard was looked up in read mode but does not exist
    #[error("Shard not found: {0}")]
    ShardNotFound(String),

    /// A record was added to a shard holding a different day
    #[error("Attempt to add record dated {timestamp} to shard {shard}")]
    WrongShard {
        shard: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    /// A timestamp cannot be written in the fixed-width line format
    #[error("Timestamp {0} is outside the storable years 0000 to 9999")]
    TimestampOutOfRange(DateTime<Utc>),

    /// A stored line is too short to hold a timestamp and separator
    #[error("Invalid line #{line} in {location}: {length} bytes")]
    MalformedLine {
        location: String,
        line: usize,
        length: usize,
    },

    /// A stored line does not start with a valid timestamp
    #[error("Invalid timestamp {value:?} on line #{line} in {location}")]
    MalformedTimestamp {
        location: String,
        line: usize,
        value: String,
    },

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to JSON serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for dayfile operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new shard not found error
    pub fn shard_not_found(location: impl Into<String>) -> Self {
        Self::ShardNotFound(location.into())
    }

    /// Create a new wrong shard error
    pub fn wrong_shard(shard: NaiveDate, timestamp: DateTime<Utc>) -> Self {
        Self::WrongShard { shard, timestamp }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a shard not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ShardNotFound(_))
    }

    /// Check if this is a read-only error
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Check if this error was caused by corrupt stored data
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::MalformedLine { .. } | Self::MalformedTimestamp { .. })
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ReadOnly => Some("Open the store in read-write mode to add records".to_string()),
            Self::ShardNotFound(_) => {
                Some("No data was ever written for this day; open in read-write mode to create it".to_string())
            }
            Self::Io(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                Some("Verify permissions on the store directory".to_string())
            }
            Self::TimestampOutOfRange(_) => Some("Store records dated between years 0000 and 9999".to_string()),
            Self::MalformedLine { .. } | Self::MalformedTimestamp { .. } => {
                Some("The day file was edited or truncated; repair or remove the reported line".to_string())
            }
            _ => None,
        }
    }
}
