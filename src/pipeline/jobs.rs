//! Job table: at most one pending job per path.
//!
//! A path is either absent (idle), `Queued` (one ticket sits in the worker
//! queue) or `Running` (a worker owns it). The table is the single source of
//! truth for scheduling; the channel only carries tickets naming a path.
//!
//! ```text
//!   request        start          finish (no follow-up)
//! ─────────▶ Queued ─────▶ Running ─────────────────────▶ (removed)
//!            ▲  │ request:          │ request: follow_up = mode
//!            │  └ mode replaced     │
//!            └──────────────────────┘ finish (follow-up pending)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::IndexMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobSlot {
    Queued(IndexMode),
    Running {
        mode: IndexMode,
        follow_up: Option<IndexMode>,
    },
}

/// Outcome of [`JobTable::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheduled {
    /// New job; the caller must send a ticket
    Enqueued,
    /// An un-started job now carries the new mode
    Replaced,
    /// The running job was superseded; a follow-up runs after it
    Superseded,
}

#[derive(Debug, Default)]
pub(crate) struct JobTable {
    slots: Mutex<HashMap<PathBuf, JobSlot>>,
    idle: Condvar,
}

impl JobTable {
    /// Record a request for `path`. The last request's mode always governs.
    pub(crate) fn request(&self, path: &Path, mode: IndexMode) -> Scheduled {
        let mut slots = self.slots.lock();
        match slots.get_mut(path) {
            None => {
                slots.insert(path.to_path_buf(), JobSlot::Queued(mode));
                Scheduled::Enqueued
            }
            Some(JobSlot::Queued(queued)) => {
                *queued = mode;
                Scheduled::Replaced
            }
            Some(JobSlot::Running { follow_up, .. }) => {
                *follow_up = Some(mode);
                Scheduled::Superseded
            }
        }
    }

    /// Drop a queued job whose ticket could not be delivered.
    pub(crate) fn cancel(&self, path: &Path) {
        let mut slots = self.slots.lock();
        if matches!(slots.get(path), Some(JobSlot::Queued(_))) {
            slots.remove(path);
            if slots.is_empty() {
                self.idle.notify_all();
            }
        }
    }

    /// Claim the queued job for `path`. `None` for stale tickets.
    pub(crate) fn start(&self, path: &Path) -> Option<IndexMode> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(path)?;
        match *slot {
            JobSlot::Queued(mode) => {
                *slot = JobSlot::Running {
                    mode,
                    follow_up: None,
                };
                Some(mode)
            }
            JobSlot::Running { .. } => None,
        }
    }

    /// Release the running job for `path`.
    ///
    /// Returns the follow-up mode if the job was superseded; the slot is then
    /// queued again and the caller must send a new ticket.
    pub(crate) fn finish(&self, path: &Path) -> Option<IndexMode> {
        let mut slots = self.slots.lock();
        let follow_up = match slots.get(path) {
            Some(JobSlot::Running { follow_up, .. }) => *follow_up,
            _ => return None,
        };
        match follow_up {
            Some(mode) => {
                slots.insert(path.to_path_buf(), JobSlot::Queued(mode));
            }
            None => {
                slots.remove(path);
                if slots.is_empty() {
                    self.idle.notify_all();
                }
            }
        }
        follow_up
    }

    /// Forget every queued job. Used once no worker is left to run them.
    ///
    /// Returns the number of jobs dropped.
    pub(crate) fn drop_queued(&self) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| !matches!(slot, JobSlot::Queued(_)));
        if slots.is_empty() {
            self.idle.notify_all();
        }
        before - slots.len()
    }

    /// Number of paths with queued or running work.
    pub(crate) fn pending(&self) -> usize {
        self.slots.lock().len()
    }

    pub(crate) fn is_running(&self, path: &Path) -> bool {
        matches!(self.slots.lock().get(path), Some(JobSlot::Running { .. }))
    }

    /// Block until no work is pending or `timeout` elapses.
    ///
    /// Returns true when the table drained.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        while !slots.is_empty() {
            if self.idle.wait_until(&mut slots, deadline).timed_out() {
                return slots.is_empty();
            }
        }
        true
    }
}
