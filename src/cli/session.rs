//! One-shot server session for CLI commands.
//!
//! Wires the same components an editor integration would use, indexes the
//! requested files and answers queries through the dispatcher.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, unbounded};

use crate::buffers::WorkingFiles;
use crate::cache;
use crate::config::Settings;
use crate::db::QueryDb;
use crate::dispatch::{Dispatcher, ReplyValue, Request, RequestId, RequestKind, Response};
use crate::engine::NullEngine;
use crate::extract::FactsFileExtractor;
use crate::pipeline::{IndexMode, IndexServices, Pipeline, PipelineConfig};

const INDEX_TIMEOUT: Duration = Duration::from_secs(300);

pub struct Session {
    pub pipeline: Arc<Pipeline>,
    pub dispatcher: Dispatcher,
    responses: Receiver<Response>,
    next_id: u64,
}

impl Session {
    pub fn start(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);
        let db = Arc::new(QueryDb::new());
        let files = Arc::new(WorkingFiles::new());
        let cache = cache::from_settings(&settings).context("Failed to open index cache")?;

        let services = IndexServices::new(db, Arc::new(FactsFileExtractor::new()))
            .with_cache(cache)
            .with_buffers(files.clone());
        let pipeline = Arc::new(
            Pipeline::start(PipelineConfig::from_settings(&settings), services)
                .context("Failed to start indexing pipeline")?,
        );

        let (tx, rx) = unbounded();
        let dispatcher = Dispatcher::new(
            settings,
            Arc::clone(&pipeline),
            files,
            Arc::new(NullEngine),
            tx,
        );

        Ok(Self {
            pipeline,
            dispatcher,
            responses: rx,
            next_id: 1,
        })
    }

    /// Index `files` and wait for the pipeline to drain.
    ///
    /// Returns the canonical paths the files were indexed under.
    pub fn index_files(&self, files: &[PathBuf], mode: IndexMode) -> Result<Vec<PathBuf>> {
        let paths = files
            .iter()
            .map(|file| canonical(file))
            .collect::<Result<Vec<_>>>()?;

        for path in &paths {
            self.pipeline.index(path, mode)?;
        }
        if !self.pipeline.wait_idle(INDEX_TIMEOUT) {
            bail!(
                "Indexing did not finish within {}s ({} files pending)",
                INDEX_TIMEOUT.as_secs(),
                self.pipeline.pending_count()
            );
        }
        Ok(paths)
    }

    /// Send one request through the dispatcher and wait for its reply.
    pub fn query(&mut self, kind: RequestKind) -> Result<Option<ReplyValue>> {
        let id = RequestId(self.next_id);
        self.next_id += 1;

        self.dispatcher.handle_request(Request { id, kind });
        let response = self
            .responses
            .recv_timeout(Duration::from_secs(5))
            .with_context(|| format!("No response to request {id}"))?;
        if response.id != id {
            bail!("Response {} does not match request {id}", response.id);
        }
        Ok(response.result)
    }
}

pub fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Cannot resolve {}", path.display()))
}
