//! Editor lifecycle notifications.

use std::path::Path;

use super::Dispatcher;
use crate::pipeline::IndexMode;
use crate::types::LanguageId;

impl Dispatcher {
    pub(super) fn did_open(&self, path: &Path, text: String, version: i32) {
        let cached = self.pipeline.load_cached_content(path);
        let unchanged = cached.as_deref() == Some(text.as_str());

        self.files.on_open(path, text, version);
        if let Some(content) = cached {
            self.files.set_index_content(path, content);
        }

        if let Some(index) = self.db.file(path).and_then(|file| file.index) {
            self.engine.skipped_ranges(path, &index.skipped_ranges);
        }

        // Headers are usually indexed through the files including them
        let (language, is_header) = LanguageId::from_path(path);
        let indexable = language != LanguageId::Unknown
            && (!is_header || self.settings.index.index_headers_on_open);
        if indexable || self.pipeline.pending_count() == 0 {
            let mode = if unchanged {
                IndexMode::Lazy
            } else {
                IndexMode::Normal
            };
            self.request_index(path, mode);
        } else {
            crate::debug_event!("dispatch", "deferred", "{}", path.display());
        }

        self.engine.notify_view(path);
        if self.settings.diagnostics.on_open >= 0 {
            self.engine
                .diagnostics_update(path, self.settings.diagnostics.on_open);
        }
    }

    pub(super) fn did_change(&self, path: &Path, text: String, version: i32) {
        if !self.files.on_change(path, text, version) {
            tracing::warn!("[dispatch] change for unopened file {}", path.display());
            return;
        }
        if self.settings.index.on_change {
            self.request_index(path, IndexMode::OnChange);
        }
        self.engine.notify_view(path);
        if self.settings.diagnostics.on_change >= 0 {
            self.engine
                .diagnostics_update(path, self.settings.diagnostics.on_change);
        }
    }

    pub(super) fn did_close(&self, path: &Path) {
        self.files.on_close(path);
        self.engine.on_close(path);
    }

    pub(super) fn did_save(&self, path: &Path) {
        self.files.on_save(path);
        self.request_index(path, IndexMode::Normal);
        self.engine.notify_save(path);
        if self.settings.diagnostics.on_save >= 0 {
            self.engine
                .diagnostics_update(path, self.settings.diagnostics.on_save);
        }
    }

    fn request_index(&self, path: &Path, mode: IndexMode) {
        if let Err(e) = self.pipeline.index(path, mode) {
            tracing::warn!("[dispatch] cannot index {}: {e}", path.display());
        }
    }
}
