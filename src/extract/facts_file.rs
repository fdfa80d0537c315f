//! Extractor backed by compiler-emitted fact files.
//!
//! A compiler plugin writes `<source>.facts.json` next to every translation
//! unit it compiles. This extractor loads that file instead of parsing the
//! source, which keeps the binary usable without an embedded front end.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ExtractError, ExtractResult, Extractor};
use crate::index::{Definition, FileIndex, SymbolFact};
use crate::types::{LanguageId, Range, SymbolId, SymbolKind};

const FACTS_SUFFIX: &str = "facts.json";

#[derive(Debug, Deserialize)]
struct FactsDocument {
    #[serde(default)]
    symbols: Vec<FactsSymbol>,
    #[serde(default)]
    skipped_ranges: Vec<Range>,
}

#[derive(Debug, Deserialize)]
struct FactsSymbol {
    usr: String,
    kind: FactsKind,
    #[serde(default)]
    definitions: Vec<Definition>,
    #[serde(default)]
    references: Vec<Range>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FactsKind {
    Type,
    Function,
    Variable,
    Macro,
}

impl From<FactsKind> for SymbolKind {
    fn from(kind: FactsKind) -> Self {
        match kind {
            FactsKind::Type => SymbolKind::Type,
            FactsKind::Function => SymbolKind::Function,
            FactsKind::Variable => SymbolKind::Variable,
            FactsKind::Macro => SymbolKind::Macro,
        }
    }
}

/// Reads symbol facts from `<source>.facts.json`.
#[derive(Debug, Default, Clone)]
pub struct FactsFileExtractor;

impl FactsFileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Location of the fact file for `source`.
    pub fn facts_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_os_string();
        name.push(".");
        name.push(FACTS_SUFFIX);
        PathBuf::from(name)
    }
}

impl Extractor for FactsFileExtractor {
    fn name(&self) -> &str {
        "facts-file"
    }

    fn extract(&self, path: &Path, _content: &str) -> ExtractResult<FileIndex> {
        let (language, _) = LanguageId::from_path(path);
        if language == LanguageId::Unknown {
            return Err(ExtractError::UnsupportedLanguage {
                path: path.to_path_buf(),
            });
        }

        let facts_path = Self::facts_path(path);
        let raw = fs::read_to_string(&facts_path).map_err(|e| ExtractError::Unreadable {
            path: facts_path.clone(),
            reason: e.to_string(),
        })?;
        let doc: FactsDocument = serde_json::from_str(&raw).map_err(|e| ExtractError::Parse {
            path: facts_path,
            reason: e.to_string(),
        })?;

        let mut index = FileIndex::new(path, 0);
        index.skipped_ranges = doc.skipped_ranges;
        index.symbols = doc
            .symbols
            .into_iter()
            .map(|sym| SymbolFact {
                id: SymbolId::from_usr(&sym.usr),
                kind: sym.kind.into(),
                definitions: sym.definitions,
                references: sym.references,
            })
            .collect();

        Ok(index)
    }
}
