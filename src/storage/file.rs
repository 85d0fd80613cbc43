//! Durable file-tree backend
//!
//! One text file per day at `<root>/<YYYY>/<MM>/<DD>.txt`. Shards are
//! stateless views over their file; every operation reopens it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, trace};

use crate::codec;
use crate::config::{AccessMode, StoreConfig};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::shard::{ensure_same_day, ensure_storable, truncate_to_day, RecordIter, Shard};
use crate::storage::{layout, Storage};

/// Options every shard view inherits from its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileOptions {
    mode: AccessMode,
    permissions: u32,
    sync_writes: bool,
}

impl FileOptions {
    /// Open a day file for appending, creating it if needed
    fn open_append(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.permissions);
        }

        options.open(path)
    }
}

/// Durable storage rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    options: FileOptions,
}

impl FileStorage {
    /// Open a store rooted at `root` with default file options
    pub fn new<P: AsRef<Path>>(root: P, mode: AccessMode) -> Result<Self> {
        Self::open(&StoreConfig::new().with_directory(root).with_mode(mode))
    }

    /// Open a store from a configuration
    ///
    /// In read-write mode the root directory is created when missing; in read
    /// mode it must already exist.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let root = config.directory()?.to_path_buf();

        if config.mode.is_writable() {
            fs::create_dir_all(&root)?;
        } else if !root.is_dir() {
            return Err(Error::config(format!(
                "Root directory {} does not exist",
                root.display()
            )));
        }

        debug!("Opened file storage at {} ({})", root.display(), config.mode.name());

        Ok(Self {
            root,
            options: FileOptions {
                mode: config.mode,
                permissions: config.file_permissions,
                sync_writes: config.sync_writes,
            },
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn view(&self, date: NaiveDate, path: PathBuf) -> FileShard {
        FileShard {
            date,
            path,
            options: self.options,
        }
    }
}

impl Storage for FileStorage {
    type Shard = FileShard;

    fn mode(&self) -> AccessMode {
        self.options.mode
    }

    fn shard(&self, timestamp: &DateTime<Utc>) -> Result<FileShard> {
        let date = truncate_to_day(timestamp);
        let path = layout::shard_path(&self.root, date);

        if !path.try_exists()? {
            if !self.options.mode.is_writable() {
                return Err(Error::shard_not_found(path.display().to_string()));
            }

            let dir = layout::shard_dir(&self.root, date);
            fs::create_dir_all(&dir)?;
            self.options.open_append(&path)?;
            debug!("Created shard file {}", path.display());
        }

        Ok(self.view(date, path))
    }

    fn shards(&self) -> Result<Vec<FileShard>> {
        Ok(layout::list_shard_files(&self.root)?
            .into_iter()
            .map(|(date, path)| self.view(date, path))
            .collect())
    }
}

/// View of one day file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileShard {
    date: NaiveDate,
    path: PathBuf,
    options: FileOptions,
}

impl FileShard {
    /// Path of the day file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Shard for FileShard {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn add(&self, records: &[Record]) -> Result<usize> {
        if !self.options.mode.is_writable() {
            return Err(Error::ReadOnly);
        }

        let mut file = self.options.open_append(&self.path)?;
        let mut added = 0;
        let mut outcome = Ok(());

        for record in records {
            if let Err(e) = ensure_same_day(self.date, record).and_then(|()| ensure_storable(record)) {
                outcome = Err(e);
                break;
            }
            // One write per record: O_APPEND keeps a record in one piece
            file.write_all(&codec::encode_line_terminated(record))?;
            added += 1;
        }

        if self.options.sync_writes && added > 0 {
            file.sync_data()?;
        }

        outcome.map(|()| added)
    }

    fn scan(&self) -> RecordIter<'_> {
        match File::open(&self.path) {
            Ok(file) => {
                trace!("Scanning {}", self.path.display());
                Box::new(LineRecords {
                    reader: BufReader::new(file),
                    location: self.location(),
                    line: 0,
                    buf: Vec::new(),
                    done: false,
                })
            }
            Err(e) => {
                trace!("Reading {} as empty: {}", self.path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Streaming decoder over the lines of a day file
struct LineRecords<R> {
    reader: R,
    location: String,
    line: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Iterator for LineRecords<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(codec::LINE_TERMINATOR, &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line += 1;
                if self.buf.last() == Some(&codec::LINE_TERMINATOR) {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }

                let decoded = codec::decode_line(&self.buf).map_err(|e| e.at(self.location.as_str(), self.line));
                self.done = decoded.is_err();
                Some(decoded)
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}
