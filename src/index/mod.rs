//! Per-file extraction records.
//!
//! A [`FileIndex`] is everything the extractor found in one file's content
//! at one point in time. It is immutable once produced: re-indexing a path
//! supersedes the whole record rather than patching it.

mod hash;

pub use hash::compute_hash;

use crate::types::{LanguageId, Range, SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One declaration or definition site of a symbol within a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Definition {
    /// Range of the name token, if the site spells the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell: Option<Range>,
    /// Full extent of the declaration.
    pub extent: Range,
    #[serde(default)]
    pub detailed_name: String,
    #[serde(default)]
    pub hover: String,
    #[serde(default)]
    pub comments: String,
}

/// Everything one file says about one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFact {
    pub id: SymbolId,
    pub kind: SymbolKind,
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub references: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndex {
    pub path: PathBuf,
    pub content_hash: u64,
    #[serde(default)]
    pub language: LanguageId,
    #[serde(default)]
    pub symbols: Vec<SymbolFact>,
    #[serde(default)]
    pub skipped_ranges: Vec<Range>,
}

impl Definition {
    pub fn new(extent: Range) -> Self {
        Self {
            extent,
            ..Self::default()
        }
    }

    pub fn with_spell(mut self, spell: Range) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn with_detailed_name(mut self, name: impl Into<String>) -> Self {
        self.detailed_name = name.into();
        self
    }

    pub fn with_hover(mut self, hover: impl Into<String>) -> Self {
        self.hover = hover.into();
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Text shown as the signature: hover text, else the detailed name.
    pub fn signature(&self) -> Option<&str> {
        if !self.hover.is_empty() {
            Some(&self.hover)
        } else if !self.detailed_name.is_empty() {
            Some(&self.detailed_name)
        } else {
            None
        }
    }
}

impl SymbolFact {
    pub fn new(id: SymbolId, kind: SymbolKind) -> Self {
        Self {
            id,
            kind,
            definitions: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_definition(mut self, def: Definition) -> Self {
        self.definitions.push(def);
        self
    }

    pub fn with_reference(mut self, range: Range) -> Self {
        self.references.push(range);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.references.is_empty()
    }
}

impl FileIndex {
    pub fn new(path: impl Into<PathBuf>, content_hash: u64) -> Self {
        let path = path.into();
        let (language, _) = LanguageId::from_path(&path);
        Self {
            path,
            content_hash,
            language,
            symbols: Vec::new(),
            skipped_ranges: Vec::new(),
        }
    }

    pub fn with_symbol(mut self, fact: SymbolFact) -> Self {
        self.symbols.push(fact);
        self
    }

    pub fn with_skipped_range(mut self, range: Range) -> Self {
        self.skipped_ranges.push(range);
        self
    }

    /// Fact for `id`, if this file mentions it.
    pub fn fact(&self, id: SymbolId) -> Option<&SymbolFact> {
        self.symbols.iter().find(|fact| fact.id == id)
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols.iter().map(|fact| fact.id)
    }
}
