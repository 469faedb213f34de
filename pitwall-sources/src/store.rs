//! Data-access capability behind the frame source loader
//!
//! A store hands back the raw text of a named resource. Missing resources
//! are `Ok(None)`, not errors; parsing is the loader's job.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Errors raised while reading or decoding a stored resource
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed payload in {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Trait for the places recorded race data can live
pub trait DataStore: Send + Sync {
    /// Short description for log lines (e.g. the root directory)
    fn describe(&self) -> String;

    /// Read a resource by relative path
    ///
    /// Returns:
    /// - `Ok(Some(text))` if the resource exists
    /// - `Ok(None)` if it does not
    /// - `Err(_)` if it exists but could not be read
    fn read(&self, path: &str) -> Result<Option<String>, StoreError>;
}

/// Store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DataStore for DirectoryStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.root.join(path)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store, counting reads so callers can verify memoization
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource
    pub fn with(self, path: &str, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: &str, contents: impl Into<String>) {
        self.entries.lock().insert(path.to_string(), contents.into());
    }

    /// Number of `read` calls served so far, hits and misses alike
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DataStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().get(path).cloned())
    }
}

impl<T: DataStore + ?Sized> DataStore for std::sync::Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        (**self).read(path)
    }
}
