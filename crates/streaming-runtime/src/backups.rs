//! Timestamped backup copies of the master store.
//!
//! Backups are plain pretty-printed store documents written to a directory.
//! File names embed a UTC timestamp so that lexical order is chronological.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use streaming_core::Result;
use tracing::{info, warn};

/// File-name prefix shared by every backup.
pub const BACKUP_PREFIX: &str = "master_streaming_terms";

/// Writes and enumerates backups in one directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new timestamped file and return its path.
    pub fn write(&self, bytes: &[u8]) -> Result<PathBuf> {
        self.write_at(bytes, Utc::now())
    }

    /// Same as [`write`](Self::write) with an explicit timestamp.
    pub fn write_at(&self, bytes: &[u8], now: DateTime<Utc>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let stamp = now.format("%Y%m%dT%H%M%SZ");
        let mut path = self.dir.join(format!("{BACKUP_PREFIX}-{stamp}.json"));
        let mut counter = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("{BACKUP_PREFIX}-{stamp}-{counter}.json"));
            counter += 1;
        }

        std::fs::write(&path, bytes)?;
        info!("Backup written to {}", path.display());
        Ok(path)
    }

    /// All backup files in the directory, oldest first.
    pub fn list(&self) -> Vec<PathBuf> {
        if !self.dir.exists() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable backup entry: {}", e);
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(".json"))
                        .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    /// Most recent backup, if any.
    pub fn latest(&self) -> Option<PathBuf> {
        self.list().pop()
    }
}
