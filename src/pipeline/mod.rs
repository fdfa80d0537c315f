//! Background indexing pipeline
//!
//! Decides when a file must be (re-)extracted, runs extraction on a pool of
//! worker threads and merges the results into the [`QueryDb`].
//!
//! ## Architecture
//!
//! ```text
//!  index(path, mode)          ┌──────────┐      ┌─────────┐
//! ─────────────────▶ JobTable │ tickets  │─────▶│ workers │──▶ QueryDb::merge
//!                     (dedup) └──────────┘ FIFO └─────────┘
//!                                                  │  ▲
//!                                       Extractor ◀┘  └▶ IndexCache
//! ```
//!
//! - At most one job per path is queued or running; requests for a queued
//!   path replace its mode, requests for a running path schedule a
//!   follow-up that runs once the current job has merged.
//! - Extraction failures are logged and counted, never returned to callers.
//!
//! ## Usage
//!
//! ```ignore
//! let services = IndexServices::new(db, Arc::new(FactsFileExtractor::new()));
//! let pipeline = Pipeline::start(PipelineConfig::default(), services)?;
//! pipeline.index(Path::new("src/a.cc"), IndexMode::Normal)?;
//! pipeline.wait_idle(Duration::from_secs(5));
//! ```

pub mod config;
mod jobs;
pub mod metrics;
mod worker;

pub use config::PipelineConfig;
pub use metrics::{MetricsSnapshot, PipelineMetrics};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;
use thiserror::Error;

use crate::buffers::{OpenBuffers, WorkingFiles};
use crate::cache::{IndexCache, MemoryCache};
use crate::db::QueryDb;
use crate::engine::{CompletionEngine, NullEngine};
use crate::extract::Extractor;
use jobs::{JobTable, Scheduled};

/// Urgency and semantics of an index request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexMode {
    /// Unconditional re-extraction
    Normal,
    /// Re-extraction triggered by live edits
    OnChange,
    /// Resolve from the cache when the content is unchanged
    Lazy,
}

impl IndexMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexMode::Normal => "normal",
            IndexMode::OnChange => "on-change",
            IndexMode::Lazy => "lazy",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to spawn indexing worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Pipeline is shut down")]
    ShutDown,
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Collaborators the workers call into.
#[derive(Clone)]
pub struct IndexServices {
    pub db: Arc<QueryDb>,
    pub extractor: Arc<dyn Extractor>,
    pub cache: Arc<dyn IndexCache>,
    pub buffers: Arc<dyn OpenBuffers>,
    pub engine: Arc<dyn CompletionEngine>,
}

impl IndexServices {
    /// Services with an in-memory cache, no open buffers and no engine.
    pub fn new(db: Arc<QueryDb>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            db,
            extractor,
            cache: Arc::new(MemoryCache::new()),
            buffers: Arc::new(WorkingFiles::new()),
            engine: Arc::new(NullEngine),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn IndexCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_buffers(mut self, buffers: Arc<dyn OpenBuffers>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn CompletionEngine>) -> Self {
        self.engine = engine;
        self
    }
}

enum Message {
    Index(PathBuf),
    Shutdown,
}

/// State shared between the control path and the workers.
struct Shared {
    services: IndexServices,
    jobs: JobTable,
    metrics: PipelineMetrics,
}

/// The indexing pipeline.
///
/// Workers run until [`Pipeline::shutdown`] or drop.
pub struct Pipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
    sender: Sender<Message>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl Pipeline {
    /// Spawn the worker pool.
    pub fn start(config: PipelineConfig, services: IndexServices) -> PipelineResult<Self> {
        let shared = Arc::new(Shared {
            services,
            jobs: JobTable::default(),
            metrics: PipelineMetrics::default(),
        });
        let (tx, rx) = unbounded();

        let pipeline = Self {
            config,
            shared,
            sender: tx,
            workers: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        };

        for n in 0..pipeline.config.worker_threads {
            let shared = Arc::clone(&pipeline.shared);
            let rx = rx.clone();
            let tx = pipeline.sender.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{n}", pipeline.config.thread_name))
                .spawn(move || worker::run(shared, rx, tx))?;
            pipeline.workers.lock().push(handle);
        }

        crate::log_event!(
            "pipeline",
            "started",
            "{} workers",
            pipeline.config.worker_threads
        );
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<QueryDb> {
        &self.shared.services.db
    }

    /// Request a (re-)index of `path`.
    ///
    /// Never blocks on extraction. A request for a path that is already
    /// queued replaces its mode; one for a running path schedules a
    /// follow-up job.
    pub fn index(&self, path: &Path, mode: IndexMode) -> PipelineResult<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(PipelineError::ShutDown);
        }

        match self.shared.jobs.request(path, mode) {
            Scheduled::Enqueued => {
                if self.sender.send(Message::Index(path.to_path_buf())).is_err() {
                    self.shared.jobs.cancel(path);
                    return Err(PipelineError::ShutDown);
                }
                self.shared.metrics.record_queued();
                crate::debug_event!("pipeline", "queued", "{} ({mode})", path.display());
            }
            Scheduled::Replaced => {
                crate::debug_event!("pipeline", "requeued", "{} ({mode})", path.display());
            }
            Scheduled::Superseded => {
                self.shared.metrics.record_superseded();
                crate::debug_event!("pipeline", "superseded", "{} ({mode})", path.display());
            }
        }
        Ok(())
    }

    /// Raw content of the last successful index of `path`, if cached.
    ///
    /// Cache failures are logged and reported as a miss.
    pub fn load_cached_content(&self, path: &Path) -> Option<String> {
        match self.shared.services.cache.load_content(path) {
            Ok(content) => content,
            Err(e) => {
                self.shared.metrics.record_cache_error();
                tracing::warn!("[pipeline] cached content unavailable: {e}");
                None
            }
        }
    }

    /// Number of paths with queued or running work.
    pub fn pending_count(&self) -> usize {
        self.shared.jobs.pending()
    }

    /// Whether a worker is currently executing the job for `path`.
    pub fn is_running(&self, path: &Path) -> bool {
        self.shared.jobs.is_running(path)
    }

    /// Block until no work is pending. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.jobs.wait_idle(timeout)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stop accepting requests and join the workers.
    ///
    /// Tickets queued before the call still run; follow-ups scheduled after
    /// it are dropped.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for _ in &workers {
            let _ = self.sender.send(Message::Shutdown);
        }
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("[pipeline] worker exited with a panic");
            }
        }

        // Follow-ups sent behind the shutdown messages never run
        let dropped = self.shared.jobs.drop_queued();
        if dropped > 0 {
            crate::debug_event!("pipeline", "dropped", "{dropped} queued jobs");
        }
        crate::log_event!("pipeline", "stopped", "{}", self.metrics().summary());
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
