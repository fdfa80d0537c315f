//! Pipeline counters.
//!
//! Extraction and cache failures never reach a requester; these counters
//! (together with the log lines emitted beside them) are where they surface.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the control path and every worker.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    jobs_queued: AtomicU64,
    jobs_started: AtomicU64,
    jobs_completed: AtomicU64,
    superseded: AtomicU64,
    extractor_invocations: AtomicU64,
    cache_hits: AtomicU64,
    cache_errors: AtomicU64,
    extract_failures: AtomicU64,
    merges: AtomicU64,
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub jobs_queued: u64,
    pub jobs_started: u64,
    pub jobs_completed: u64,
    /// Requests that arrived while a job for the same path was running
    pub superseded: u64,
    pub extractor_invocations: u64,
    pub cache_hits: u64,
    pub cache_errors: u64,
    pub extract_failures: u64,
    pub merges: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineMetrics {
    pub fn record_queued(&self) {
        bump(&self.jobs_queued);
    }

    pub fn record_started(&self) {
        bump(&self.jobs_started);
    }

    pub fn record_completed(&self) {
        bump(&self.jobs_completed);
    }

    pub fn record_superseded(&self) {
        bump(&self.superseded);
    }

    pub fn record_extraction(&self) {
        bump(&self.extractor_invocations);
    }

    pub fn record_cache_hit(&self) {
        bump(&self.cache_hits);
    }

    pub fn record_cache_error(&self) {
        bump(&self.cache_errors);
    }

    pub fn record_extract_failure(&self) {
        bump(&self.extract_failures);
    }

    pub fn record_merge(&self) {
        bump(&self.merges);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            jobs_queued: load(&self.jobs_queued),
            jobs_started: load(&self.jobs_started),
            jobs_completed: load(&self.jobs_completed),
            superseded: load(&self.superseded),
            extractor_invocations: load(&self.extractor_invocations),
            cache_hits: load(&self.cache_hits),
            cache_errors: load(&self.cache_errors),
            extract_failures: load(&self.extract_failures),
            merges: load(&self.merges),
        }
    }
}

impl MetricsSnapshot {
    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{} jobs ({} superseded), {} extracted, {} from cache, {} failed, {} merged",
            self.jobs_completed,
            self.superseded,
            self.extractor_invocations,
            self.cache_hits,
            self.extract_failures,
            self.merges
        )
    }
}
