//! Configuration for dayfile
//!
//! This module provides the access mode and the options used to open a
//! durable store.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default permission bits for newly created day files
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;

/// Data access mode of a store, fixed when it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Read only; missing shards are errors and nothing is ever created
    Read,
    /// Read and append; missing shards are created on demand
    ReadWrite,
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::ReadWrite
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "r"),
            Self::ReadWrite => write!(f, "w"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "r" | "read" => Ok(Self::Read),
            "w" | "rw" | "read-write" => Ok(Self::ReadWrite),
            _ => Err(Error::config(format!("Unknown access mode: {}", s))),
        }
    }
}

impl AccessMode {
    /// Check if this mode permits appending records
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    /// Get the name of the access mode
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "read-write",
        }
    }
}

/// Configuration options for a durable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct StoreConfig {
    /// Root directory holding the `YYYY/MM/DD.txt` tree
    pub directory: Option<PathBuf>,
    /// Access mode
    pub mode: AccessMode,
    /// Permission bits for new day files (unix only)
    pub file_permissions: u32,
    /// Whether to sync file data to disk after every append
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            mode: AccessMode::default(),
            file_permissions: DEFAULT_FILE_PERMISSIONS,
            sync_writes: false,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn with_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the access mode
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the permission bits for new day files
    pub fn with_file_permissions(mut self, permissions: u32) -> Self {
        self.file_permissions = permissions;
        self
    }

    /// Set whether to sync writes to disk immediately
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.directory {
            None => return Err(Error::config("A root directory is required")),
            Some(ref dir) if dir.as_os_str().is_empty() => {
                return Err(Error::config("The root directory must not be empty"));
            }
            Some(_) => {}
        }

        if self.file_permissions > 0o777 {
            return Err(Error::config(format!(
                "File permissions must be at most 0o777, got {:#o}",
                self.file_permissions
            )));
        }

        Ok(())
    }

    /// Root directory, or a configuration error when unset
    pub fn directory(&self) -> Result<&Path> {
        self.directory
            .as_deref()
            .ok_or_else(|| Error::config("A root directory is required"))
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== dayfile Configuration ===\n");
        match self.directory {
            Some(ref dir) => result.push_str(&format!("  Directory: {:?}\n", dir)),
            None => result.push_str("  Directory: <unset>\n"),
        }
        result.push_str(&format!("  Mode: {}\n", self.mode.name()));
        result.push_str(&format!("  File Permissions: {:#o}\n", self.file_permissions));
        result.push_str(&format!("  Sync Writes: {}\n", self.sync_writes));

        result
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
