//! Job execution on a worker thread.

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::{IndexMode, Message, Shared};
use crate::extract::ExtractError;
use crate::index::{FileIndex, compute_hash};

/// Pull tickets until a shutdown message arrives or the channel closes.
pub(super) fn run(shared: Arc<Shared>, rx: Receiver<Message>, tx: Sender<Message>) {
    for message in rx {
        let path = match message {
            Message::Shutdown => break,
            Message::Index(path) => path,
        };

        let Some(mode) = shared.jobs.start(&path) else {
            continue;
        };
        shared.metrics.record_started();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&shared, &path, mode)));
        if outcome.is_err() {
            tracing::error!("[pipeline] job for {} panicked", path.display());
        }
        shared.metrics.record_completed();

        if let Some(next) = shared.jobs.finish(&path) {
            crate::debug_event!("pipeline", "follow-up", "{} ({next})", path.display());
            if tx.send(Message::Index(path.clone())).is_err() {
                shared.jobs.cancel(&path);
            }
        }
    }
}

/// Read, extract (or load from cache) and merge one file.
fn execute(shared: &Shared, path: &Path, mode: IndexMode) {
    let services = &shared.services;

    let content = match services.buffers.get_content(path) {
        Some(content) => content,
        None => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let changed = services.db.remove_file(path);
                crate::log_event!(
                    "pipeline",
                    "removed",
                    "{} no longer exists ({} symbols changed)",
                    path.display(),
                    changed.len()
                );
                return;
            }
            Err(e) => {
                fail(
                    shared,
                    path,
                    ExtractError::Unreadable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    },
                );
                return;
            }
        },
    };

    let hash = compute_hash(content.as_bytes());
    services.db.ensure_file(path);

    if mode == IndexMode::Lazy {
        if services.db.content_hash(path) == Some(hash) {
            crate::debug_event!("pipeline", "up to date", "{}", path.display());
            return;
        }
        match services.cache.get(path, hash) {
            Ok(Some(index)) => {
                shared.metrics.record_cache_hit();
                crate::debug_event!("pipeline", "cache hit", "{}", path.display());
                merge(shared, path, index, &content);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                shared.metrics.record_cache_error();
                tracing::warn!("[pipeline] cache read failed, extracting: {e}");
            }
        }
    }

    shared.metrics.record_extraction();
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        services.extractor.extract(path, &content)
    }))
    .unwrap_or_else(|_| {
        Err(ExtractError::Panicked {
            path: path.to_path_buf(),
        })
    });

    let mut index: FileIndex = match extracted {
        Ok(index) => index,
        Err(e) => {
            fail(shared, path, e);
            return;
        }
    };
    index.path = path.to_path_buf();
    index.content_hash = hash;
    let index = Arc::new(index);

    if let Err(e) = services.cache.put(path, hash, Arc::clone(&index)) {
        shared.metrics.record_cache_error();
        tracing::warn!("[pipeline] cache write failed: {e}");
    }
    if let Err(e) = services.cache.store_content(path, &content) {
        shared.metrics.record_cache_error();
        tracing::warn!("[pipeline] cache write failed: {e}");
    }

    merge(shared, path, index, &content);
}

fn merge(shared: &Shared, path: &Path, index: Arc<FileIndex>, content: &str) {
    let services = &shared.services;
    let skipped = index.skipped_ranges.clone();

    services.db.merge(path, index);
    shared.metrics.record_merge();

    if services.buffers.is_open(path) {
        services.buffers.on_indexed(path, content);
        services.engine.skipped_ranges(path, &skipped);
        services.engine.notify_view(path);
    }
}

fn fail(shared: &Shared, path: &Path, error: ExtractError) {
    shared.metrics.record_extract_failure();
    tracing::warn!("[pipeline] {error}");
    shared.services.db.record_error(path, error.to_string());
}
