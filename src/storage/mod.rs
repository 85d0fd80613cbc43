//! Storage backends
//!
//! A backend resolves timestamps to day shards. Two interchangeable backends
//! are provided:
//!
//! - [`FileStorage`]: durable, one text file per day under `YYYY/MM/DD.txt`
//! - [`MemoryStorage`]: volatile, an instance-owned table of day shards
//!
//! Nothing is cached: every call goes back to the backing medium.

mod file;
mod layout;
mod memory;

pub use file::{FileShard, FileStorage};
pub use layout::{list_shard_files, shard_dir, shard_path};
pub use memory::{MemoryShard, MemoryStorage};

use chrono::{DateTime, Utc};

use crate::config::AccessMode;
use crate::error::Result;
use crate::shard::{day_span, day_start, Shard};

/// Shard-resolution contract shared by every backend
pub trait Storage {
    /// Shard type handed out by this backend
    type Shard: Shard;

    /// Access mode, fixed for the backend's lifetime
    fn mode(&self) -> AccessMode;

    /// Resolve the shard for the UTC day of `timestamp`
    ///
    /// In read mode a missing shard fails with
    /// [`Error::ShardNotFound`](crate::Error::ShardNotFound); in read-write
    /// mode it is created.
    fn shard(&self, timestamp: &DateTime<Utc>) -> Result<Self::Shard>;

    /// All existing shards, in no guaranteed order
    fn shards(&self) -> Result<Vec<Self::Shard>>;

    /// Shards for every day from the day of `from` to the day of `to`
    ///
    /// Resolves each day in the span with [`Storage::shard`], so missing days
    /// are created in read-write mode and fail in read mode.
    fn shards_range(&self, from: &DateTime<Utc>, to: &DateTime<Utc>) -> Result<Vec<Self::Shard>> {
        day_span(from, to)
            .map(|day| self.shard(&day_start(day)))
            .collect()
    }
}
