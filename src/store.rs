use std::ops::ControlFlow;
use std::slice;
use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, trace};

use crate::codec;
use crate::config::{AccessMode, StoreConfig};
use crate::error::{Error, Result};
use crate::metrics::MetricsCollector;
use crate::record::Record;
use crate::shard::Shard;
use crate::storage::{FileStorage, MemoryStorage, Storage};

/// A dayfile database over one storage backend
#[derive(Debug)]
pub struct Database<S: Storage> {
    storage: S,
    metrics: Arc<MetricsCollector>,
}

impl Database<FileStorage> {
    /// Open a durable database from a configuration
    pub fn open_file(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(FileStorage::open(config)?))
    }
}

impl Database<MemoryStorage> {
    /// Create an empty in-memory database
    pub fn in_memory(mode: AccessMode) -> Self {
        Self::new(MemoryStorage::new(mode))
    }
}

impl<S: Storage> Database<S> {
    /// Create a database over a storage backend
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Access mode of the underlying storage
    pub fn mode(&self) -> AccessMode {
        self.storage.mode()
    }

    /// Underlying storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Operation metrics
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Consume the database and return its storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Append a record to the shard of its day
    ///
    /// Records dated outside years 0000 to 9999 fail with
    /// [`Error::TimestampOutOfRange`] before any shard is resolved.
    pub fn add(&self, record: Record) -> Result<usize> {
        if !self.mode().is_writable() {
            return Err(Error::ReadOnly);
        }
        if !codec::is_storable(&record.timestamp()) {
            return Err(Error::TimestampOutOfRange(record.timestamp()));
        }

        let start = Instant::now();
        let shard = self.storage.shard(&record.timestamp())?;
        self.metrics.add_shards_resolved(1);

        let added = shard.add(slice::from_ref(&record))?;
        self.metrics.record_write(record.payload().len(), start.elapsed());
        trace!("Added record at {} to {}", record.timestamp(), shard.location());

        Ok(added)
    }

    /// Visit every record strictly between `from` and `to`
    ///
    /// Both endpoints are excluded. Every shard in the span is scanned to the
    /// end: a `Break` from the callback does not stop the query, while an
    /// error does and is returned. Records already delivered stay delivered.
    pub fn query_range_callback<F>(&self, from: DateTime<Utc>, to: DateTime<Utc>, mut callback: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<ControlFlow<()>>,
    {
        if from > to {
            return Err(Error::InvalidRange { from, to });
        }

        let start = Instant::now();
        self.metrics.increment_range_queries();

        let shards = self.storage.shards_range(&from, &to)?;
        self.metrics.add_shards_resolved(shards.len());
        debug!("Range query {} .. {} over {} shards", from, to, shards.len());

        let mut scanned = 0;
        let mut returned = 0;
        let outcome = shards.iter().try_for_each(|shard| {
            shard.for_each(|record| {
                scanned += 1;
                let timestamp = record.timestamp();
                if from < timestamp && timestamp < to {
                    returned += 1;
                    // Break does not end a range query
                    let _ = callback(record)?;
                }
                Ok(ControlFlow::Continue(()))
            })
        });

        self.metrics.add_records_scanned(scanned);
        self.metrics.add_records_returned(returned);
        self.metrics.record_query_duration(start.elapsed());
        outcome
    }

    /// Records strictly between `from` and `to`, in shard order
    pub fn query_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Record>> {
        let mut results = Vec::new();
        self.query_range_callback(from, to, |record| {
            results.push(record);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(results)
    }

    /// The last `n` records of the most recent shard, oldest first
    ///
    /// Only the shard with the latest date is read. When it holds fewer than
    /// `n` records the result is padded at the front with placeholder records
    /// (see [`Record::is_placeholder`]) so it always has `n` entries. Without
    /// any shard the result is empty. A limit too large to allocate fails
    /// with [`Error::InvalidLimit`].
    pub fn query_last(&self, n: i64) -> Result<Vec<Record>> {
        if n < 0 {
            return Err(Error::InvalidLimit(n));
        }
        if n == 0 {
            return Ok(Vec::new());
        }
        let capacity = usize::try_from(n).map_err(|_| Error::InvalidLimit(n))?;

        let start = Instant::now();
        self.metrics.increment_last_queries();

        let Some(shard) = self.latest_shard()? else {
            return Ok(Vec::new());
        };
        self.metrics.add_shards_resolved(1);

        // Round-robin buffer, grown on demand up to `capacity`
        let mut buffer: Vec<Record> = Vec::new();
        let mut index = 0;
        let mut scanned = 0;
        shard.for_each(|record| {
            if buffer.len() < capacity {
                buffer.push(record);
            } else {
                buffer[index] = record;
            }
            index = (index + 1) % capacity;
            scanned += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        self.metrics.add_records_scanned(scanned);

        let results = if buffer.len() < capacity {
            let mut padded = Vec::new();
            padded.try_reserve_exact(capacity).map_err(|_| Error::InvalidLimit(n))?;
            padded.resize(capacity - buffer.len(), Record::default());
            padded.append(&mut buffer);
            padded
        } else {
            buffer.rotate_left(index);
            buffer
        };

        self.metrics.add_records_returned(results.len());
        self.metrics.record_query_duration(start.elapsed());
        Ok(results)
    }

    /// First record stamped exactly at `timestamp`, if any
    ///
    /// `timestamp` is truncated to microseconds like every stored record.
    pub fn find(&self, timestamp: DateTime<Utc>) -> Result<Option<Record>> {
        let timestamp = timestamp.trunc_subsecs(6);

        let start = Instant::now();
        self.metrics.increment_point_queries();

        let shard = self.storage.shard(&timestamp)?;
        self.metrics.add_shards_resolved(1);

        let mut found = None;
        let mut scanned = 0;
        shard.for_each(|record| {
            scanned += 1;
            if record.timestamp() == timestamp {
                found = Some(record);
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;

        self.metrics.add_records_scanned(scanned);
        self.metrics.add_records_returned(usize::from(found.is_some()));
        self.metrics.record_query_duration(start.elapsed());
        Ok(found)
    }

    /// First record stamped exactly at `timestamp`, or a placeholder record
    ///
    /// `timestamp` is truncated to microseconds first, so a query at
    /// `t + 1500ns` matches a record stored at `t + 1µs`. A missing record is
    /// not an error; check [`Record::is_placeholder`] on the result.
    pub fn get_by_date(&self, timestamp: DateTime<Utc>) -> Result<Record> {
        Ok(self.find(timestamp)?.unwrap_or_default())
    }

    fn latest_shard(&self) -> Result<Option<S::Shard>> {
        Ok(self.storage.shards()?.into_iter().max_by_key(|shard| shard.date()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, d, h, m, s).unwrap()
    }

    fn rec(timestamp: DateTime<Utc>, payload: &str) -> Record {
        Record::new(timestamp, payload)
    }

    fn payloads(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| String::from_utf8_lossy(r.payload()).into_owned())
            .collect()
    }

    fn populated() -> Result<Database<MemoryStorage>> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        let day0 = ts(1, 0, 0, 0);
        db.add(rec(day0, r#"{"test": 1}"#))?;
        db.add(rec(day0 + Duration::hours(24), r#"{"test": 2}"#))?;
        db.add(rec(day0 + Duration::hours(48), r#"{"test": 3}"#))?;
        db.add(rec(day0 + Duration::hours(48), r#"{"test": 4}"#))?;
        db.add(rec(day0 + Duration::hours(48), r#"{"test": 5}"#))?;
        Ok(db)
    }

    #[test]
    fn test_end_to_end() -> Result<()> {
        let db = populated()?;

        let found = db.get_by_date(ts(1, 0, 0, 0))?;
        assert_eq!(found.payload(), br#"{"test": 1}"#);

        let last = db.query_last(2)?;
        assert_eq!(payloads(&last), vec![r#"{"test": 4}"#, r#"{"test": 5}"#]);
        Ok(())
    }

    #[test]
    fn test_add_returns_count() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        assert_eq!(db.add(rec(ts(1, 0, 0, 0), "a"))?, 1);
        assert_eq!(db.metrics().get_write_count(), 1);
        assert_eq!(db.metrics().get_bytes_written(), 1);
        Ok(())
    }

    #[test]
    fn test_add_read_only() {
        let db = Database::in_memory(AccessMode::Read);
        let err = db.add(rec(ts(1, 0, 0, 0), "a")).unwrap_err();
        assert!(err.is_read_only());
        assert!(db.storage().is_empty());
    }

    #[test]
    fn test_query_range_excludes_endpoints() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        for h in 0..6 {
            db.add(rec(ts(1, h, 0, 0), &format!("h{}", h)))?;
        }

        let results = db.query_range(ts(1, 1, 0, 0), ts(1, 4, 0, 0))?;
        assert_eq!(payloads(&results), vec!["h2", "h3"]);

        // Equal bounds can never match
        assert!(db.query_range(ts(1, 2, 0, 0), ts(1, 2, 0, 0))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_query_range_spans_days() -> Result<()> {
        let db = populated()?;
        let results = db.query_range(ts(1, 0, 0, 0) - Duration::seconds(1), ts(3, 0, 0, 1))?;
        assert_eq!(results.len(), 5);

        let results = db.query_range(ts(1, 0, 0, 0), ts(3, 0, 0, 0))?;
        assert_eq!(payloads(&results), vec![r#"{"test": 2}"#]);
        Ok(())
    }

    #[test]
    fn test_query_range_invalid() {
        let db = Database::in_memory(AccessMode::ReadWrite);
        let err = db.query_range(ts(2, 0, 0, 0), ts(1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_query_range_callback_ignores_break() -> Result<()> {
        let db = populated()?;
        let mut seen = 0;
        db.query_range_callback(ts(1, 0, 0, 0) - Duration::seconds(1), ts(4, 0, 0, 0), |_| {
            seen += 1;
            Ok(ControlFlow::Break(()))
        })?;
        assert_eq!(seen, 5);
        Ok(())
    }

    #[test]
    fn test_query_range_callback_error_propagates() -> Result<()> {
        let db = populated()?;
        let mut seen = 0;
        let err = db
            .query_range_callback(ts(1, 0, 0, 0) - Duration::seconds(1), ts(4, 0, 0, 0), |_| {
                seen += 1;
                Err(Error::config("callback failed"))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(seen, 1);
        Ok(())
    }

    #[test]
    fn test_query_last_limits() -> Result<()> {
        let db = populated()?;
        assert!(db.query_last(0)?.is_empty());
        assert!(matches!(db.query_last(-1), Err(Error::InvalidLimit(-1))));
        Ok(())
    }

    #[test]
    fn test_add_rejects_unstorable_year() {
        let db = Database::in_memory(AccessMode::ReadWrite);
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

        let err = db.add(rec(far, "a")).unwrap_err();
        assert!(matches!(err, Error::TimestampOutOfRange(ts) if ts == far));
        assert!(db.storage().is_empty());
        assert_eq!(db.metrics().get_write_count(), 0);
    }

    #[test]
    fn test_query_last_huge_limit() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        db.add(rec(ts(1, 0, 0, 0), "only"))?;

        assert!(matches!(db.query_last(i64::MAX), Err(Error::InvalidLimit(i64::MAX))));
        assert_eq!(payloads(&db.query_last(1)?), vec!["only"]);
        Ok(())
    }

    #[test]
    fn test_query_last_empty_store() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        assert!(db.query_last(3)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_query_last_wraps() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        for m in 0..7 {
            db.add(rec(ts(1, 0, m, 0), &format!("m{}", m)))?;
        }

        assert_eq!(payloads(&db.query_last(3)?), vec!["m4", "m5", "m6"]);
        assert_eq!(payloads(&db.query_last(7)?), vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6"]);
        assert_eq!(payloads(&db.query_last(1)?), vec!["m6"]);
        Ok(())
    }

    #[test]
    fn test_query_last_pads_sparse_shard() -> Result<()> {
        let db = populated()?;
        let last = db.query_last(5)?;
        assert_eq!(last.len(), 5);
        assert!(last[..2].iter().all(Record::is_placeholder));
        assert_eq!(payloads(&last[2..]), vec![r#"{"test": 3}"#, r#"{"test": 4}"#, r#"{"test": 5}"#]);
        Ok(())
    }

    #[test]
    fn test_query_last_ignores_older_shards() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        db.add(rec(ts(1, 0, 0, 0), "old"))?;
        db.add(rec(ts(2, 0, 0, 0), "new"))?;

        let last = db.query_last(2)?;
        assert!(last[0].is_placeholder());
        assert_eq!(last[1].payload(), b"new");
        Ok(())
    }

    #[test]
    fn test_get_by_date_missing_is_placeholder() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        db.add(rec(ts(1, 0, 0, 0), "a"))?;

        let record = db.get_by_date(ts(1, 0, 0, 1))?;
        assert!(record.is_placeholder());
        assert_eq!(db.find(ts(1, 0, 0, 1))?, None);
        Ok(())
    }

    #[test]
    fn test_get_by_date_returns_first_match() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        db.add(rec(ts(1, 3, 0, 0), "first"))?;
        db.add(rec(ts(1, 3, 0, 0), "second"))?;

        assert_eq!(db.get_by_date(ts(1, 3, 0, 0))?.payload(), b"first");
        Ok(())
    }

    #[test]
    fn test_get_by_date_truncates_query() -> Result<()> {
        let db = Database::in_memory(AccessMode::ReadWrite);
        let at = ts(1, 3, 0, 0) + Duration::nanoseconds(1_500);
        db.add(rec(at, "micro"))?;

        assert_eq!(db.get_by_date(at)?.payload(), b"micro");
        Ok(())
    }

    #[test]
    fn test_get_by_date_read_mode_missing_shard() {
        let db = Database::in_memory(AccessMode::Read);
        let err = db.get_by_date(ts(1, 0, 0, 0)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_metrics_track_queries() -> Result<()> {
        let db = populated()?;
        db.query_range(ts(1, 0, 0, 0), ts(3, 12, 0, 0))?;
        db.query_last(1)?;
        db.get_by_date(ts(1, 0, 0, 0))?;

        let metrics = db.metrics();
        assert_eq!(metrics.get_range_query_count(), 1);
        assert_eq!(metrics.get_last_query_count(), 1);
        assert_eq!(metrics.get_point_query_count(), 1);
        assert!(metrics.get_records_scanned() >= 5);
        Ok(())
    }
}
