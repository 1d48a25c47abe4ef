//! Whole-document persistence for the master store.
//!
//! The aggregator only ever needs two operations on its backing storage:
//! fetch the current document and replace it. [`BlobStore`] captures exactly
//! that; remote backends (cloud drives, object stores) implement the same
//! trait and own their own auth and retry concerns.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use streaming_core::{Result, StreamingError};
use tracing::debug;

/// Opaque get/put storage for a single UTF-8 JSON document.
///
/// Each call must be all-or-nothing: a failed `put` leaves the previous
/// document in place.
pub trait BlobStore {
    /// Fetch the full current document.
    fn get(&self) -> Result<Vec<u8>>;

    /// Replace the full document.
    fn put(&self, bytes: &[u8]) -> Result<()>;

    /// Short human-readable location, used in log lines.
    fn describe(&self) -> String;
}

impl<B: BlobStore + ?Sized> BlobStore for &B {
    fn get(&self) -> Result<Vec<u8>> {
        (**self).get()
    }

    fn put(&self, bytes: &[u8]) -> Result<()> {
        (**self).put(bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ── FileBlobStore ─────────────────────────────────────────────────────────────

/// A document stored as a single local file.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self) -> Result<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StreamingError::BlobNotFound(self.path.clone()))
            }
            Err(source) => Err(StreamingError::FileRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    fn put(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ── MemoryBlobStore ───────────────────────────────────────────────────────────

/// In-process store, used by tests and when embedding the workflow.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    data: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    /// A store that already holds `bytes`.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(bytes.into())),
        }
    }

    /// Current contents, if any document has been stored.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self) -> Result<Vec<u8>> {
        self.contents()
            .ok_or_else(|| StreamingError::BlobNotFound(PathBuf::from("memory")))
    }

    fn put(&self, bytes: &[u8]) -> Result<()> {
        *self.data.lock().unwrap_or_else(|e| e.into_inner()) = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
