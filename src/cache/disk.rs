//! On-disk cache: one JSON document and one raw content file per path.
//!
//! ```text
//! <cache dir>/
//!   <sha256(mapped path)>.json     {path, content_hash, index}
//!   <sha256(mapped path)>.content  raw content of the last successful index
//! ```
//!
//! Paths are rewritten through `cache.path_mappings` before hashing so the
//! same cache serves checkouts at different locations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CacheError, CacheResult, IndexCache, MemoryCache};
use crate::config::CacheConfig;
use crate::index::FileIndex;

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    path: String,
    content_hash: u64,
    index: FileIndex,
}

#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    config: CacheConfig,
    memory: Option<MemoryCache>,
    tmp_counter: AtomicU64,
}

impl DiskCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, config: CacheConfig) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;

        let memory = config.retain_in_memory.then(MemoryCache::new);
        Ok(Self {
            dir,
            config,
            memory,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn mapped_key(&self, path: &Path) -> String {
        self.config.apply_path_mappings(&path.to_string_lossy())
    }

    fn entry_stem(&self, path: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.mapped_key(path).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn index_file(&self, path: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", self.entry_stem(path)))
    }

    fn content_file(&self, path: &Path) -> PathBuf {
        self.dir.join(format!("{}.content", self.entry_stem(path)))
    }

    /// Write through a temporary file and rename, so readers never see a
    /// partially written entry.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> CacheResult<()> {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("{}.{n}.tmp", std::process::id()));

        fs::write(&tmp, bytes).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, target).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            CacheError::Io {
                path: target.to_path_buf(),
                source,
            }
        })
    }

    fn read_optional(file: &Path) -> CacheResult<Option<Vec<u8>>> {
        match fs::read(file) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io {
                path: file.to_path_buf(),
                source,
            }),
        }
    }
}

impl IndexCache for DiskCache {
    fn get(&self, path: &Path, hash: u64) -> CacheResult<Option<Arc<FileIndex>>> {
        if let Some(memory) = &self.memory {
            if let Some(hit) = memory.get(path, hash)? {
                return Ok(Some(hit));
            }
        }

        let file = self.index_file(path);
        let Some(bytes) = Self::read_optional(&file)? else {
            return Ok(None);
        };
        let entry: DiskEntry =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
                path: file.clone(),
                reason: e.to_string(),
            })?;

        if entry.content_hash != hash {
            crate::debug_event!("cache", "stale", "{}", path.display());
            return Ok(None);
        }

        let mut index = entry.index;
        index.path = path.to_path_buf();
        let index = Arc::new(index);
        if let Some(memory) = &self.memory {
            memory.put(path, hash, Arc::clone(&index))?;
        }
        Ok(Some(index))
    }

    fn put(&self, path: &Path, hash: u64, index: Arc<FileIndex>) -> CacheResult<()> {
        let file = self.index_file(path);
        let entry = DiskEntry {
            path: self.mapped_key(path),
            content_hash: hash,
            index: (*index).clone(),
        };
        let bytes = serde_json::to_vec(&entry).map_err(|e| CacheError::Serialization {
            path: file.clone(),
            reason: e.to_string(),
        })?;
        self.write_atomic(&file, &bytes)?;

        if let Some(memory) = &self.memory {
            memory.put(path, hash, index)?;
        }
        Ok(())
    }

    fn load_content(&self, path: &Path) -> CacheResult<Option<String>> {
        if let Some(memory) = &self.memory {
            if let Some(content) = memory.load_content(path)? {
                return Ok(Some(content));
            }
        }

        let file = self.content_file(path);
        Self::read_optional(&file)?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| CacheError::Serialization {
                    path: file.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn store_content(&self, path: &Path, content: &str) -> CacheResult<()> {
        self.write_atomic(&self.content_file(path), content.as_bytes())?;
        if let Some(memory) = &self.memory {
            memory.store_content(path, content)?;
        }
        Ok(())
    }
}
