//! Shared fixtures for integration tests.
//!
//! Source files in tests use a tiny line-oriented format instead of C:
//!
//! ```text
//! def NAME KIND LINE COL [| hover [| comments]]
//! ref NAME KIND LINE COL
//! skip START_LINE END_LINE
//! error MESSAGE
//! panic
//! ```
//!
//! Lines and columns are zero-based, KIND is one of fn/type/var/macro.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use symdb::extract::ExtractResult;
use symdb::{
    CompletionEngine, Definition, ExtractError, Extractor, FileIndex, IndexServices, Pipeline,
    PipelineConfig, QueryDb, Range, SymbolFact, SymbolId, SymbolKind,
};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Id of fixture symbol `name`.
pub fn sym(name: &str) -> SymbolId {
    SymbolId::from_usr(&format!("c:@{name}"))
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn kind(s: &str) -> Option<SymbolKind> {
    match s {
        "fn" => Some(SymbolKind::Function),
        "type" => Some(SymbolKind::Type),
        "var" => Some(SymbolKind::Variable),
        "macro" => Some(SymbolKind::Macro),
        _ => None,
    }
}

/// Parse the fixture format into a [`FileIndex`].
pub fn parse_fixture(path: &Path, content: &str) -> ExtractResult<FileIndex> {
    let parse_error = |reason: String| ExtractError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    let mut index = FileIndex::new(path, 0);

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut sections = line.split('|').map(str::trim);
        let head: Vec<&str> = sections.next().unwrap_or("").split_whitespace().collect();

        match head.as_slice() {
            ["panic"] => panic!("fixture asked to panic"),
            ["error", message @ ..] => return Err(parse_error(message.join(" "))),
            ["skip", start, end] => {
                let start: u32 = start.parse().map_err(|_| parse_error(line.to_string()))?;
                let end: u32 = end.parse().map_err(|_| parse_error(line.to_string()))?;
                index.skipped_ranges.push(Range::new(start, 0, end, 0));
            }
            [op @ ("def" | "ref"), name, k, l, c] => {
                let kind = kind(k).ok_or_else(|| parse_error(line.to_string()))?;
                let l: u32 = l.parse().map_err(|_| parse_error(line.to_string()))?;
                let c: u16 = c.parse().map_err(|_| parse_error(line.to_string()))?;
                let end = c + name.len() as u16;
                let spell = Range::new(l, c, l, end);

                let id = sym(name);
                let pos = match index.symbols.iter().position(|f| f.id == id) {
                    Some(pos) => pos,
                    None => {
                        index.symbols.push(SymbolFact::new(id, kind));
                        index.symbols.len() - 1
                    }
                };
                let fact = &mut index.symbols[pos];

                if *op == "def" {
                    let mut def = Definition::new(Range::new(l, 0, l, end + 2))
                        .with_spell(spell)
                        .with_detailed_name(*name);
                    if let Some(hover) = sections.next() {
                        def = def.with_hover(hover);
                    }
                    if let Some(comments) = sections.next() {
                        def = def.with_comments(comments);
                    }
                    fact.definitions.push(def);
                } else {
                    fact.references.push(spell);
                }
            }
            _ => return Err(parse_error(line.to_string())),
        }
    }
    Ok(index)
}

struct Gate {
    entered: Sender<PathBuf>,
    release: Receiver<()>,
}

/// Test side of a gated extractor.
pub struct GateControl {
    entered: Receiver<PathBuf>,
    release: Sender<()>,
}

impl GateControl {
    /// Wait until a worker is inside the extractor.
    pub fn wait_entered(&self) -> PathBuf {
        self.entered
            .recv_timeout(TIMEOUT)
            .expect("extractor was never entered")
    }

    /// Whether a worker enters the extractor within a short grace period.
    pub fn try_wait_entered(&self) -> bool {
        self.entered.recv_timeout(Duration::from_millis(200)).is_ok()
    }

    /// Let one blocked extraction finish.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

/// Fixture extractor that counts calls and tracks overlapping runs.
#[derive(Default)]
pub struct LineExtractor {
    calls: AtomicUsize,
    running: Mutex<HashSet<PathBuf>>,
    /// Extractions that started while the same path was already running
    overlaps: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, String)>>,
    gate: Option<Gate>,
}

impl LineExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that blocks every call until released.
    pub fn gated() -> (Self, GateControl) {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let extractor = Self {
            gate: Some(Gate {
                entered: entered_tx,
                release: release_rx,
            }),
            ..Self::default()
        };
        (
            extractor,
            GateControl {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Contents passed to the extractor, in call order.
    pub fn seen(&self) -> Vec<(PathBuf, String)> {
        self.seen.lock().clone()
    }
}

impl Extractor for LineExtractor {
    fn name(&self) -> &str {
        "fixture"
    }

    fn extract(&self, path: &Path, content: &str) -> ExtractResult<FileIndex> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .push((path.to_path_buf(), content.to_string()));
        if !self.running.lock().insert(path.to_path_buf()) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        if let Some(gate) = &self.gate {
            gate.entered.send(path.to_path_buf()).unwrap();
            gate.release.recv_timeout(TIMEOUT).unwrap();
        }

        let result = std::panic::catch_unwind(|| parse_fixture(path, content));
        self.running.lock().remove(path);
        match result {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Engine that records every signal as a short string.
#[derive(Default)]
pub struct RecordingEngine {
    events: Mutex<Vec<String>>,
}

fn name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl RecordingEngine {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl CompletionEngine for RecordingEngine {
    fn notify_view(&self, path: &Path) {
        self.push(format!("view {}", name(path)));
    }

    fn diagnostics_update(&self, path: &Path, debounce_ms: i64) {
        self.push(format!("diagnostics {} {debounce_ms}", name(path)));
    }

    fn notify_save(&self, path: &Path) {
        self.push(format!("save {}", name(path)));
    }

    fn on_close(&self, path: &Path) {
        self.push(format!("close {}", name(path)));
    }

    fn skipped_ranges(&self, path: &Path, ranges: &[Range]) {
        self.push(format!("skipped {} {}", name(path), ranges.len()));
    }
}

/// Pipeline over a fresh database with `threads` workers.
pub fn start(extractor: Arc<LineExtractor>, threads: usize) -> (Arc<QueryDb>, Pipeline) {
    let db = Arc::new(QueryDb::new());
    let services = IndexServices::new(Arc::clone(&db), extractor);
    let pipeline =
        Pipeline::start(PipelineConfig::default().with_threads(threads), services).unwrap();
    (db, pipeline)
}
