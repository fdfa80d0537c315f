//! Single-fulfilment reply slot.
//!
//! Every inbound request owns a [`ReplyOnce`]. Clones share one slot, the
//! first `reply` wins, later attempts are logged and ignored, and a slot
//! dropped without a reply sends an explicit empty result so the client is
//! never left waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crossbeam_channel::Sender;

use super::{DispatchError, ReplyValue, RequestId, Response};

const RECEIVED: u8 = 0;
const DISPATCHED: u8 = 1;
const REPLIED: u8 = 2;

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Dispatched,
    Replied,
}

/// Reply counters.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    replies: AtomicU64,
    double_replies: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub replies: u64,
    /// Second reply attempts that were ignored
    pub double_replies: u64,
    /// Requests whose handler never replied
    pub dropped: u64,
}

impl DispatchMetrics {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            replies: self.replies.load(Ordering::Relaxed),
            double_replies: self.double_replies.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Slot {
    id: RequestId,
    state: AtomicU8,
    responses: Sender<Response>,
    metrics: Arc<DispatchMetrics>,
}

/// Shared handle to a request's reply slot.
#[derive(Debug, Clone)]
pub struct ReplyOnce {
    slot: Arc<Slot>,
}

impl ReplyOnce {
    pub fn new(id: RequestId, responses: Sender<Response>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            slot: Arc::new(Slot {
                id,
                state: AtomicU8::new(RECEIVED),
                responses,
                metrics,
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.slot.id
    }

    pub fn state(&self) -> RequestState {
        match self.slot.state.load(Ordering::Acquire) {
            RECEIVED => RequestState::Received,
            DISPATCHED => RequestState::Dispatched,
            _ => RequestState::Replied,
        }
    }

    /// `Received → Dispatched`. No effect in any other state.
    pub fn mark_dispatched(&self) {
        let _ = self.slot.state.compare_exchange(
            RECEIVED,
            DISPATCHED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Fulfil the request. `None` is the explicit "no result" reply.
    ///
    /// Only the first call across all clones sends anything.
    pub fn reply(&self, result: Option<ReplyValue>) -> Result<(), DispatchError> {
        let id = self.slot.id;
        if self.slot.state.swap(REPLIED, Ordering::AcqRel) == REPLIED {
            self.slot.metrics.double_replies.fetch_add(1, Ordering::Relaxed);
            let err = DispatchError::DoubleReply { id };
            tracing::error!("[dispatch] {err}; ignoring");
            return Err(err);
        }
        self.slot.metrics.replies.fetch_add(1, Ordering::Relaxed);
        self.slot
            .responses
            .send(Response { id, result })
            .map_err(|_| DispatchError::TransportClosed { id })
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if *self.state.get_mut() == REPLIED {
            return;
        }
        self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            "[dispatch] {}; sending empty result",
            DispatchError::NoReply { id: self.id }
        );
        let _ = self.responses.send(Response {
            id: self.id,
            result: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    fn slot() -> (ReplyOnce, crossbeam_channel::Receiver<Response>, Arc<DispatchMetrics>) {
        let (tx, rx) = unbounded();
        let metrics = Arc::new(DispatchMetrics::default());
        (ReplyOnce::new(RequestId(1), tx, Arc::clone(&metrics)), rx, metrics)
    }

    #[test]
    fn test_state_transitions() {
        let (reply, rx, _) = slot();
        assert_eq!(reply.state(), RequestState::Received);
        reply.mark_dispatched();
        assert_eq!(reply.state(), RequestState::Dispatched);
        reply.reply(None).unwrap();
        assert_eq!(reply.state(), RequestState::Replied);

        // Dispatch after reply does not move the state back
        reply.mark_dispatched();
        assert_eq!(reply.state(), RequestState::Replied);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_second_reply_is_ignored() {
        let (reply, rx, metrics) = slot();
        reply.reply(None).unwrap();
        let err = reply.clone().reply(None).unwrap_err();
        assert!(matches!(err, DispatchError::DoubleReply { .. }));

        drop(reply);
        assert_eq!(rx.try_iter().count(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.replies, 1);
        assert_eq!(snapshot.double_replies, 1);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn test_dropped_slot_sends_empty_result() {
        let (reply, rx, metrics) = slot();
        let clone = reply.clone();
        drop(reply);
        assert!(rx.try_recv().is_err());
        drop(clone);

        let response = rx.try_recv().unwrap();
        assert_eq!(response.id, RequestId(1));
        assert!(response.result.is_none());
        assert_eq!(metrics.snapshot().dropped, 1);
    }

    #[test]
    fn test_concurrent_replies_send_exactly_once() {
        let (reply, rx, metrics) = slot();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reply = reply.clone();
                thread::spawn(move || reply.reply(None).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        drop(reply);

        assert_eq!(wins, 1);
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(metrics.snapshot().double_replies, 7);
    }
}
