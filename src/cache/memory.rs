use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use super::{CacheResult, IndexCache};
use crate::index::FileIndex;

#[derive(Debug, Default)]
struct Entry {
    index: Option<(u64, Arc<FileIndex>)>,
    content: Option<Arc<str>>,
}

/// Process-local cache backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<PathBuf, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IndexCache for MemoryCache {
    fn get(&self, path: &Path, hash: u64) -> CacheResult<Option<Arc<FileIndex>>> {
        Ok(self.entries.get(path).and_then(|entry| match &entry.index {
            Some((cached, index)) if *cached == hash => Some(Arc::clone(index)),
            _ => None,
        }))
    }

    fn put(&self, path: &Path, hash: u64, index: Arc<FileIndex>) -> CacheResult<()> {
        self.entries.entry(path.to_path_buf()).or_default().index = Some((hash, index));
        Ok(())
    }

    fn load_content(&self, path: &Path) -> CacheResult<Option<String>> {
        Ok(self
            .entries
            .get(path)
            .and_then(|entry| entry.content.as_deref().map(str::to_string)))
    }

    fn store_content(&self, path: &Path, content: &str) -> CacheResult<()> {
        self.entries.entry(path.to_path_buf()).or_default().content = Some(Arc::from(content));
        Ok(())
    }
}
