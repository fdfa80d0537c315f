//! Pipeline configuration
//!
//! Reads from Settings (.symdb/settings.toml).

use crate::config::Settings;

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of extraction worker threads (at least 1)
    pub worker_threads: usize,

    /// Prefix for worker thread names
    pub thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get().max(1),
            thread_name: "symdb-indexer".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from Settings.
    ///
    /// - `index.threads` -> worker_threads (0 = number of CPUs)
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            worker_threads: settings.worker_threads().max(1),
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
