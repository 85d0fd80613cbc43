//! Queries checked against a plain vector model of the store

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tempfile::tempdir;

use dayfile::{AccessMode, Database, FileStorage, Record, Storage};

const DAYS: i64 = 3;
const DAY_MICROS: i64 = 86_400_000_000;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
}

fn at(offset_micros: i64) -> DateTime<Utc> {
    base() + Duration::microseconds(offset_micros)
}

fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((0..DAYS * DAY_MICROS, "[a-z0-9]{0,8}"), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(offset, payload)| Record::new(at(offset), payload))
            .collect()
    })
}

/// Records grouped by day, append order kept within a day
fn by_day(records: &[Record]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(Record::date);
    sorted
}

fn expected_range(records: &[Record], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Record> {
    by_day(records)
        .into_iter()
        .filter(|r| from < r.timestamp() && r.timestamp() < to)
        .collect()
}

fn expected_last(records: &[Record], n: usize) -> Vec<Record> {
    let Some(latest) = records.iter().map(Record::date).max() else {
        return Vec::new();
    };
    let day: Vec<Record> = records.iter().filter(|r| r.date() == latest).cloned().collect();

    let mut expected = vec![Record::default(); n.saturating_sub(day.len())];
    expected.extend(day[day.len().saturating_sub(n)..].iter().cloned());
    expected
}

fn load<S: Storage>(db: &Database<S>, records: &[Record]) -> dayfile::Result<()> {
    for record in records {
        db.add(record.clone())?;
    }
    Ok(())
}

proptest! {
    #[test]
    fn range_matches_model(
        records in records_strategy(),
        a in -DAY_MICROS..(DAYS + 1) * DAY_MICROS,
        b in -DAY_MICROS..(DAYS + 1) * DAY_MICROS,
    ) {
        let db = Database::in_memory(AccessMode::ReadWrite);
        load(&db, &records)?;

        let (from, to) = (at(a.min(b)), at(a.max(b)));
        prop_assert_eq!(db.query_range(from, to)?, expected_range(&records, from, to));
    }

    #[test]
    fn every_record_is_found_by_its_timestamp(records in records_strategy()) {
        let db = Database::in_memory(AccessMode::ReadWrite);
        load(&db, &records)?;

        for record in &records {
            let first = records.iter().find(|r| r.timestamp() == record.timestamp());
            prop_assert_eq!(Some(db.get_by_date(record.timestamp())?), first.cloned());
        }
    }

    #[test]
    fn last_matches_model(records in records_strategy(), n in 0usize..50) {
        let db = Database::in_memory(AccessMode::ReadWrite);
        load(&db, &records)?;

        let last = db.query_last(n as i64)?;
        prop_assert_eq!(&last, &expected_last(&records, n));
        if !records.is_empty() {
            prop_assert_eq!(last.len(), n);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn file_backend_matches_model(
        records in records_strategy(),
        a in 0..DAYS * DAY_MICROS,
        b in 0..DAYS * DAY_MICROS,
        n in 1usize..10,
    ) {
        let dir = tempdir()?;
        let db = Database::new(FileStorage::new(dir.path(), AccessMode::ReadWrite)?);
        load(&db, &records)?;

        // Before the range query, which creates files for empty days
        prop_assert_eq!(db.query_last(n as i64)?, expected_last(&records, n));

        let (from, to) = (at(a.min(b)), at(a.max(b)));
        prop_assert_eq!(db.query_range(from, to)?, expected_range(&records, from, to));
    }
}
