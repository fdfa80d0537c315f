//! Index cache: previously extracted [`FileIndex`] records keyed by path.
//!
//! Entries are addressed by path and content hash, so a lookup only hits
//! when the file content is byte-identical to what was extracted. Workers
//! read and write the cache concurrently; racing writers for the same key
//! resolve last-writer-wins, which is safe because equal hashes imply equal
//! extraction results.

mod disk;
mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::Settings;
use crate::index::FileIndex;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Durable store of extraction results.
pub trait IndexCache: Send + Sync {
    /// Cached index for `path`, only if it was built from content with `hash`.
    fn get(&self, path: &Path, hash: u64) -> CacheResult<Option<Arc<FileIndex>>>;

    fn put(&self, path: &Path, hash: u64, index: Arc<FileIndex>) -> CacheResult<()>;

    /// Raw content of the last successful index of `path`.
    fn load_content(&self, path: &Path) -> CacheResult<Option<String>>;

    fn store_content(&self, path: &Path, content: &str) -> CacheResult<()>;
}

/// Build the cache described by `settings`.
pub fn from_settings(settings: &Settings) -> CacheResult<Arc<dyn IndexCache>> {
    match &settings.cache.directory {
        Some(dir) => {
            let cache = DiskCache::open(dir, settings.cache.clone())?;
            crate::log_event!("cache", "opened", "{}", dir.display());
            Ok(Arc::new(cache))
        }
        None => Ok(Arc::new(MemoryCache::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_settings_selects_store() {
        let settings = Settings::default();
        let cache = from_settings(&settings).unwrap();
        assert!(cache.load_content(Path::new("a.c")).unwrap().is_none());

        let temp = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.cache.directory = Some(temp.path().join("cache"));
        let cache = from_settings(&settings).unwrap();
        cache.store_content(Path::new("a.c"), "int x;").unwrap();
        assert!(temp.path().join("cache").is_dir());
    }
}
