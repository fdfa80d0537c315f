//! The symbol extractor seam.
//!
//! Parsing source text into symbol facts is an external capability. The
//! pipeline only needs a pure function from `(path, content)` to a
//! [`FileIndex`]; implementations must be callable from several worker
//! threads at once.

mod facts_file;

pub use facts_file::FactsFileExtractor;

use crate::index::FileIndex;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported language for {path}")]
    UnsupportedLanguage { path: PathBuf },

    #[error("Extractor panicked while indexing {path}")]
    Panicked { path: PathBuf },
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Produces the symbol facts of one file.
///
/// The returned index's `path` and `content_hash` are overwritten by the
/// pipeline, so implementations may leave them at any value.
pub trait Extractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn extract(&self, path: &Path, content: &str) -> ExtractResult<FileIndex>;
}
