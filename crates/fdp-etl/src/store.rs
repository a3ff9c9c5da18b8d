//! Cache storage for raw payloads
//!
//! Every fetched payload is persisted before transformation, so the
//! transform phase can be retried without network cost and fetch strategies
//! can decide a refetch is unnecessary. The core only sees the
//! [`CacheStore`] capability; path resolution is the implementation's
//! business.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Durable cache for one item's raw bytes
pub trait CacheStore: Send + Sync {
    /// Whether a cached payload exists
    fn exists(&self) -> bool;

    /// Read the cached payload
    fn read(&self) -> io::Result<Vec<u8>>;

    /// Persist a payload, replacing any previous one
    fn save(&self, content: &[u8]) -> io::Result<()>;

    /// Opaque identity for logging
    fn key(&self) -> String;
}

/// Filesystem-backed cache store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        debug!(path = %self.path.display(), "Reading cached payload");
        fs::read(&self.path)
    }

    fn save(&self, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %self.path.display(), bytes = content.len(), "Caching payload");
        fs::write(&self.path, content)
    }

    fn key(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("9900/E0.csv"));

        assert!(!store.exists());
        store.save(b"col1,col2\n1,2").unwrap();
        assert!(store.exists());
        assert_eq!(store.read().unwrap(), b"col1,col2\n1,2");
    }

    #[test]
    fn test_save_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("E0.csv"));

        store.save(b"old").unwrap();
        store.save(b"new").unwrap();
        assert_eq!(store.read().unwrap(), b"new");
    }

    #[test]
    fn test_read_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.csv"));
        assert!(store.read().is_err());
    }
}
