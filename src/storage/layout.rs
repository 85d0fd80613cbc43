//! On-disk layout of the durable backend
//!
//! Day files live at `<root>/<YYYY>/<MM>/<DD>.txt`.

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::error::Result;

/// Extension of day files
pub const DAY_FILE_EXTENSION: &str = ".txt";

const YEAR_NAME_LEN: usize = 4;
const MONTH_NAME_LEN: usize = 2;
const DAY_FILE_NAME_LEN: usize = 6;

/// Get the month directory holding a day file
pub fn shard_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
}

/// Get the path of a day file
pub fn shard_path(root: &Path, date: NaiveDate) -> PathBuf {
    shard_dir(root, date).join(format!("{:02}{}", date.day(), DAY_FILE_EXTENSION))
}

/// List every day file under `root`, sorted by date
///
/// Entries whose names do not follow the layout are skipped.
pub fn list_shard_files(root: &Path) -> Result<Vec<(NaiveDate, PathBuf)>> {
    let mut result = Vec::new();

    for (year_name, year_path) in named_entries(root, true, YEAR_NAME_LEN)? {
        let Some(year) = parse_number::<i32>(&year_name, &year_path) else {
            continue;
        };

        for (month_name, month_path) in named_entries(&year_path, true, MONTH_NAME_LEN)? {
            let Some(month) = parse_number::<u32>(&month_name, &month_path) else {
                continue;
            };

            for (day_name, day_path) in named_entries(&month_path, false, DAY_FILE_NAME_LEN)? {
                let Some(stem) = day_name.strip_suffix(DAY_FILE_EXTENSION) else {
                    continue;
                };
                let Some(day) = parse_number::<u32>(stem, &day_path) else {
                    continue;
                };

                match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(date) => result.push((date, day_path)),
                    None => warn!("Skipping {}: not a calendar date", day_path.display()),
                }
            }
        }
    }

    result.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(result)
}

/// Directory entries of the wanted kind whose UTF-8 name has exactly `len` bytes
fn named_entries(dir: &Path, want_dir: bool, len: usize) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() != want_dir {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.len() == len {
            entries.push((name, entry.path()));
        }
    }

    Ok(entries)
}

fn parse_number<T: std::str::FromStr>(name: &str, path: &Path) -> Option<T> {
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        warn!("Skipping {}: name is not numeric", path.display());
        return None;
    }
    name.parse().ok()
}
