//! One-way signals to the live completion/diagnostics engine.
//!
//! The engine re-parses open buffers on its own schedule; the core only
//! tells it when something relevant happened and never waits for an answer.

use std::path::Path;

use crate::types::Range;

pub trait CompletionEngine: Send + Sync {
    /// The file is visible in the editor; warm its preamble.
    fn notify_view(&self, path: &Path);

    /// Recompute diagnostics for `path` after `debounce_ms`.
    fn diagnostics_update(&self, path: &Path, debounce_ms: i64);

    fn notify_save(&self, path: &Path);

    fn on_close(&self, path: &Path);

    /// Publish inactive preprocessor regions of an open file.
    fn skipped_ranges(&self, _path: &Path, _ranges: &[Range]) {}
}

/// Engine that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl CompletionEngine for NullEngine {
    fn notify_view(&self, _path: &Path) {}

    fn diagnostics_update(&self, _path: &Path, _debounce_ms: i64) {}

    fn notify_save(&self, _path: &Path) {}

    fn on_close(&self, _path: &Path) {}
}
