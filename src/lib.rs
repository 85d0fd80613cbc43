//! # dayfile
//!
//! A flat-file, append-only time-series record store.
//!
//! Records are a UTC timestamp plus an opaque payload. They are partitioned
//! into one shard per UTC calendar day and kept in append order inside it.
//! On disk each shard is a text file at `<root>/YYYY/MM/DD.txt` holding one
//! record per line:
//!
//! ```text
//! 2000-01-01 12:00:00.000000 {"test": 1}
//! ```
//!
//! The store can be opened read-only or read-write, and an in-memory backend
//! with the same behavior is available for tests.
//!
//! ```no_run
//! use chrono::Utc;
//! use dayfile::{AccessMode, Database, Record, StoreConfig};
//!
//! # fn main() -> dayfile::Result<()> {
//! let config = StoreConfig::new()
//!     .with_directory("/var/lib/readings")
//!     .with_mode(AccessMode::ReadWrite);
//! let db = Database::open_file(&config)?;
//!
//! db.add(Record::new(Utc::now(), r#"{"temp": 21.5}"#))?;
//! for record in db.query_last(10)? {
//!     if !record.is_placeholder() {
//!         println!("{:?}", record);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod shard;
pub mod storage;
pub mod store;

pub use config::{AccessMode, StoreConfig};
pub use error::{Error, Result};
pub use metrics::MetricsCollector;
pub use record::Record;
pub use shard::Shard;
pub use storage::{FileShard, FileStorage, MemoryShard, MemoryStorage, Storage};
pub use store::Database;
