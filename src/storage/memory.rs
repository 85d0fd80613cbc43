//! Volatile in-memory backend
//!
//! Shards live in a table owned by the backend instance and keyed by the
//! canonical `YYYY-MM-DD` day key. Nothing survives the instance. Used for
//! tests and for callers that only need a scratch store.

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::config::AccessMode;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::shard::{day_key, ensure_same_day, ensure_storable, truncate_to_day, RecordIter, Shard};
use crate::storage::Storage;

type RecordList = Arc<RwLock<Vec<Record>>>;

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    mode: AccessMode,
    shards: RwLock<BTreeMap<String, MemoryShard>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            shards: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with `records`, whatever its mode
    ///
    /// Records are grouped by day and kept in the given order within a day.
    pub fn with_records<I>(mode: AccessMode, records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut table = BTreeMap::new();
        for record in records {
            let date = record.date();
            table
                .entry(day_key(date))
                .or_insert_with(|| MemoryShard::new(date, mode))
                .records
                .write()
                .push(record);
        }

        Self {
            mode,
            shards: RwLock::new(table),
        }
    }

    /// Number of shards held
    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    /// Check if no shard has been created
    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    type Shard = MemoryShard;

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn shard(&self, timestamp: &DateTime<Utc>) -> Result<MemoryShard> {
        let date = truncate_to_day(timestamp);
        let key = day_key(date);

        if let Some(shard) = self.shards.read().get(&key) {
            return Ok(shard.clone());
        }

        if !self.mode.is_writable() {
            return Err(Error::shard_not_found(key));
        }

        let mut shards = self.shards.write();
        Ok(shards
            .entry(key)
            .or_insert_with(|| MemoryShard::new(date, self.mode))
            .clone())
    }

    fn shards(&self) -> Result<Vec<MemoryShard>> {
        Ok(self.shards.read().values().cloned().collect())
    }

    /// Existing shards whose day key lies between the keys of `from` and `to`
    ///
    /// Unlike the default, days without a shard are neither created nor
    /// reported as missing.
    fn shards_range(&self, from: &DateTime<Utc>, to: &DateTime<Utc>) -> Result<Vec<MemoryShard>> {
        let from_key = day_key(truncate_to_day(from));
        let to_key = day_key(truncate_to_day(to));
        if from_key > to_key {
            return Ok(Vec::new());
        }

        Ok(self
            .shards
            .read()
            .range(from_key..=to_key)
            .map(|(_, shard)| shard.clone())
            .collect())
    }
}

/// Handle to one in-memory day shard
///
/// Clones share the record list with the backend table, so appends through
/// any handle are visible to all of them.
#[derive(Debug, Clone)]
pub struct MemoryShard {
    date: NaiveDate,
    mode: AccessMode,
    records: RecordList,
}

impl MemoryShard {
    fn new(date: NaiveDate, mode: AccessMode) -> Self {
        Self {
            date,
            mode,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the shard holds no record
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Shard for MemoryShard {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn location(&self) -> String {
        day_key(self.date)
    }

    fn add(&self, records: &[Record]) -> Result<usize> {
        if !self.mode.is_writable() {
            return Err(Error::ReadOnly);
        }

        let mut added = 0;
        for record in records {
            ensure_same_day(self.date, record)?;
            ensure_storable(record)?;
            self.records.write().push(record.clone());
            added += 1;
        }
        Ok(added)
    }

    /// Records present when the scan starts, without holding the lock
    /// between items
    fn scan(&self) -> RecordIter<'_> {
        let records = Arc::clone(&self.records);
        let end = records.read().len();
        let mut index = 0;

        Box::new(std::iter::from_fn(move || {
            if index >= end {
                return None;
            }
            let record = records.read().get(index).cloned()?;
            index += 1;
            Some(Ok(record))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, d, h, 0, 0).unwrap()
    }

    fn payloads(shard: &MemoryShard) -> Vec<Vec<u8>> {
        shard.scan().map(|r| r.unwrap().into_payload()).collect()
    }

    #[test]
    fn test_shard_is_shared() -> Result<()> {
        let storage = MemoryStorage::new(AccessMode::ReadWrite);
        assert!(storage.is_empty());

        let first = storage.shard(&at(1, 0))?;
        let second = storage.shard(&at(1, 23))?;
        assert_eq!(storage.len(), 1);
        assert_eq!(first.location(), "2000-01-01");

        first.add(&[Record::new(at(1, 1), b"a".to_vec())])?;
        second.add(&[Record::new(at(1, 2), b"b".to_vec())])?;
        assert_eq!(payloads(&first), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(storage.shard(&at(1, 5))?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_add_counts_and_rejects_wrong_day() -> Result<()> {
        let storage = MemoryStorage::new(AccessMode::ReadWrite);
        let shard = storage.shard(&at(1, 0))?;

        let records = vec![Record::new(at(1, 1), b"a".to_vec()), Record::new(at(1, 2), b"b".to_vec())];
        assert_eq!(shard.add(&records)?, 2);

        let mixed = vec![Record::new(at(1, 3), b"c".to_vec()), Record::new(at(2, 3), b"d".to_vec())];
        assert!(matches!(shard.add(&mixed), Err(Error::WrongShard { .. })));
        assert_eq!(shard.len(), 3);
        Ok(())
    }

    #[test]
    fn test_scan_is_bounded_by_start_length() -> Result<()> {
        let storage = MemoryStorage::new(AccessMode::ReadWrite);
        let shard = storage.shard(&at(1, 0))?;
        shard.add(&[Record::new(at(1, 1), b"a".to_vec())])?;

        let mut visited = 0;
        for record in shard.scan() {
            record?;
            visited += 1;
            shard.add(&[Record::new(at(1, 2), b"more".to_vec())])?;
        }
        assert_eq!(visited, 1);
        assert_eq!(shard.len(), 2);
        Ok(())
    }

    #[test]
    fn test_read_mode() {
        let storage = MemoryStorage::new(AccessMode::Read);
        let err = storage.shard(&at(1, 0)).unwrap_err();
        assert!(matches!(err, Error::ShardNotFound(ref key) if key == "2000-01-01"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_with_records() -> Result<()> {
        let storage = MemoryStorage::with_records(
            AccessMode::Read,
            vec![
                Record::new(at(2, 1), b"b1".to_vec()),
                Record::new(at(1, 1), b"a1".to_vec()),
                Record::new(at(2, 0), b"b0".to_vec()),
            ],
        );
        assert_eq!(storage.mode(), AccessMode::Read);
        assert_eq!(storage.len(), 2);

        let shard = storage.shard(&at(2, 12))?;
        assert_eq!(payloads(&shard), vec![b"b1".to_vec(), b"b0".to_vec()]);
        assert!(shard.add(&[Record::new(at(2, 3), Vec::<u8>::new())]).unwrap_err().is_read_only());
        Ok(())
    }

    #[test]
    fn test_shards_range_selects_existing_keys() -> Result<()> {
        let storage = MemoryStorage::new(AccessMode::ReadWrite);
        for d in [1, 3, 5, 10] {
            storage.shard(&at(d, 0))?;
        }

        let dates: Vec<u32> = storage
            .shards_range(&at(2, 0), &at(10, 0))?
            .iter()
            .map(|s| chrono::Datelike::day(&s.date()))
            .collect();
        assert_eq!(dates, vec![3, 5, 10]);

        // Gap days are not materialized
        assert_eq!(storage.len(), 4);
        assert!(storage.shards_range(&at(10, 0), &at(2, 0))?.is_empty());
        assert_eq!(storage.shards()?.len(), 4);
        Ok(())
    }
}
