pub mod buffers;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod engine;
pub mod extract;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod types;

pub use buffers::{OpenBuffers, WorkingFiles};
pub use cache::{CacheError, DiskCache, IndexCache, MemoryCache};
pub use config::Settings;
pub use db::{HoverContent, QueryDb, QueryFile, Symbol, SymbolRef};
pub use dispatch::{
    DispatchError, Dispatcher, Notification, ReplyOnce, ReplyValue, Request, RequestId,
    RequestKind, Response,
};
pub use engine::{CompletionEngine, NullEngine};
pub use extract::{ExtractError, Extractor, FactsFileExtractor};
pub use index::{Definition, FileIndex, SymbolFact, compute_hash};
pub use pipeline::{IndexMode, IndexServices, Pipeline, PipelineConfig, PipelineError};
pub use types::{FileId, LanguageId, Location, Position, Range, SymbolId, SymbolKind};
