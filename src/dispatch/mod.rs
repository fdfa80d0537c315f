//! Request dispatcher.
//!
//! Routes editor notifications to the pipeline and queries to handlers that
//! read the [`QueryDb`]. Queries never wait for indexing: a file that has
//! not been indexed yet simply yields an empty result.

mod handlers;
mod lifecycle;
mod reply;

pub use reply::{DispatchMetrics, DispatchSnapshot, ReplyOnce, RequestState};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::buffers::WorkingFiles;
use crate::config::Settings;
use crate::db::QueryDb;
use crate::engine::CompletionEngine;
use crate::pipeline::Pipeline;
use crate::types::{Position, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Request {id} replied to twice")]
    DoubleReply { id: RequestId },

    #[error("Request {id} dropped without a reply")]
    NoReply { id: RequestId },

    #[error("Response channel closed before request {id} was answered")]
    TransportClosed { id: RequestId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Hover {
        path: PathBuf,
        position: Position,
    },
    Definition {
        path: PathBuf,
        position: Position,
    },
    References {
        path: PathBuf,
        position: Position,
        include_declaration: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub kind: RequestKind,
}

/// Editor lifecycle events. Full-document sync only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DidOpen {
        path: PathBuf,
        text: String,
        version: i32,
    },
    DidChange {
        path: PathBuf,
        text: String,
        version: i32,
    },
    DidClose {
        path: PathBuf,
    },
    DidSave {
        path: PathBuf,
    },
}

/// A location resolved to a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub range: Range,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    /// Markdown contents and the range of the hovered symbol
    Hover { contents: String, range: Range },
    Locations(Vec<SourceLocation>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: RequestId,
    /// `None` is the explicit "no result" reply
    pub result: Option<ReplyValue>,
}

/// Routes requests and notifications on the control path.
pub struct Dispatcher {
    db: Arc<QueryDb>,
    pipeline: Arc<Pipeline>,
    files: Arc<WorkingFiles>,
    engine: Arc<dyn CompletionEngine>,
    settings: Arc<Settings>,
    responses: Sender<Response>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// `files` must be the same buffer set the pipeline reads content from.
    pub fn new(
        settings: Arc<Settings>,
        pipeline: Arc<Pipeline>,
        files: Arc<WorkingFiles>,
        engine: Arc<dyn CompletionEngine>,
        responses: Sender<Response>,
    ) -> Self {
        Self {
            db: Arc::clone(pipeline.db()),
            pipeline,
            files,
            engine,
            settings,
            responses,
            metrics: Arc::new(DispatchMetrics::default()),
        }
    }

    /// Reply slot for a request received outside [`Dispatcher::handle_request`].
    pub fn reply_slot(&self, id: RequestId) -> ReplyOnce {
        ReplyOnce::new(id, self.responses.clone(), Arc::clone(&self.metrics))
    }

    /// Answer `request`. Exactly one [`Response`] is sent for it.
    pub fn handle_request(&self, request: Request) {
        let reply = self.reply_slot(request.id);
        reply.mark_dispatched();

        let result = match &request.kind {
            RequestKind::Hover { path, position } => self.hover(path, *position),
            RequestKind::Definition { path, position } => self.definition(path, *position),
            RequestKind::References {
                path,
                position,
                include_declaration,
            } => self.references(path, *position, *include_declaration),
        };

        if let Err(e) = reply.reply(result) {
            tracing::warn!("[dispatch] {e}");
        }
    }

    pub fn handle_notification(&self, notification: Notification) {
        match notification {
            Notification::DidOpen {
                path,
                text,
                version,
            } => self.did_open(&path, text, version),
            Notification::DidChange {
                path,
                text,
                version,
            } => self.did_change(&path, text, version),
            Notification::DidClose { path } => self.did_close(&path),
            Notification::DidSave { path } => self.did_save(&path),
        }
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    pub fn working_files(&self) -> &WorkingFiles {
        &self.files
    }
}
