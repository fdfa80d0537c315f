//! Database-resident records.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::index::{Definition, FileIndex};
use crate::types::{FileId, Location, Range, SymbolId, SymbolKind};

/// A definition together with the file that contributed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDef {
    pub file_id: FileId,
    pub def: Definition,
}

impl SymbolDef {
    /// Spelling location, if the definition spells the name.
    pub fn spell(&self) -> Option<Location> {
        self.def.spell.map(|range| Location {
            file_id: self.file_id,
            range,
        })
    }

    /// Spelling location, falling back to the full extent.
    pub fn location(&self) -> Location {
        Location {
            file_id: self.file_id,
            range: self.def.spell.unwrap_or(self.def.extent),
        }
    }
}

/// Aggregated view of one symbol across every indexed file.
///
/// Definitions are kept ordered by contributing file and hold at most one
/// entry per file, so merging the same file twice leaves the record
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub definitions: Vec<SymbolDef>,
    pub references: BTreeSet<Location>,
}

impl Symbol {
    pub(crate) fn new(id: SymbolId, kind: SymbolKind) -> Self {
        Self {
            id,
            kind,
            definitions: Vec::new(),
            references: BTreeSet::new(),
        }
    }

    /// Files that contribute a definition or reference.
    pub fn contributors(&self) -> BTreeSet<FileId> {
        self.definitions
            .iter()
            .map(|d| d.file_id)
            .chain(self.references.iter().map(|loc| loc.file_id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.references.is_empty()
    }

    /// Insert `def` from `file_id`, keeping one definition per file.
    ///
    /// A definition that spells the name replaces one that does not;
    /// otherwise the first definition seen for the file stays.
    pub(crate) fn add_definition(&mut self, file_id: FileId, def: &Definition) {
        match self.definitions.iter().position(|d| d.file_id == file_id) {
            Some(i) => {
                if self.definitions[i].def.spell.is_none() && def.spell.is_some() {
                    self.definitions[i].def = def.clone();
                }
            }
            None => {
                let at = self.definitions.partition_point(|d| d.file_id < file_id);
                self.definitions.insert(
                    at,
                    SymbolDef {
                        file_id,
                        def: def.clone(),
                    },
                );
            }
        }
    }

    pub(crate) fn add_reference(&mut self, file_id: FileId, range: Range) {
        self.references.insert(Location { file_id, range });
    }

    /// Drop everything contributed by `file_id`. Returns whether anything
    /// was removed.
    pub(crate) fn remove_file(&mut self, file_id: FileId) -> bool {
        let before = (self.definitions.len(), self.references.len());
        self.definitions.retain(|d| d.file_id != file_id);
        self.references.retain(|loc| loc.file_id != file_id);
        before != (self.definitions.len(), self.references.len())
    }
}

/// Per-path projection of the database.
#[derive(Debug, Clone)]
pub struct QueryFile {
    pub path: PathBuf,
    pub file_id: FileId,
    /// Current index, `None` until the first successful merge
    pub index: Option<Arc<FileIndex>>,
    /// Content hash of the last successful index
    pub content_hash: Option<u64>,
    /// Most recent extraction failure; cleared by the next successful merge
    pub last_error: Option<String>,
}

impl QueryFile {
    pub(crate) fn new(path: PathBuf, file_id: FileId) -> Self {
        Self {
            path,
            file_id,
            index: None,
            content_hash: None,
            last_error: None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

/// Role of a symbol occurrence under a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Definition,
    Reference,
}

/// A symbol occurrence found at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolRef {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub range: Range,
    pub role: Role,
}
