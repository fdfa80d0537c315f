//! Query database: the cross-file merge of every known [`FileIndex`].
//!
//! ## Consistency
//!
//! All state sits behind one coarse `RwLock`. A merge holds the write lock
//! for its whole remove-then-insert sequence, so readers observe either the
//! file's previous contributions or its new ones, never a mix. Merges are
//! rare compared to lookups, which share the read lock freely.
//!
//! ## Contributions
//!
//! Every definition and reference is tagged with the file that produced it.
//! Replacing a file's index first strips all of that file's tags from the
//! symbols its previous index mentioned, then inserts the new facts. Symbols
//! left without contributions are deleted.

mod hover;
mod symbol;

pub use hover::{HoverContent, select_hover};
pub use symbol::{QueryFile, Role, Symbol, SymbolDef, SymbolRef};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard};
use thiserror::Error;

use crate::index::{FileIndex, SymbolFact};
use crate::types::{FileId, Location, Position, Range, SymbolId};

/// Integrity violation detected while removing a file's old contributions.
///
/// Never returned to callers: it is logged and the affected symbol is
/// rebuilt from the remaining files.
#[derive(Error, Debug)]
#[error("Merge conflict on symbol {symbol} for {path}: {reason}")]
pub struct MergeConflict {
    pub symbol: SymbolId,
    pub path: PathBuf,
    pub reason: &'static str,
}

#[derive(Debug, Default)]
struct DbState {
    /// Slot `i` holds the file with id `i + 1`; slots are never removed.
    files: IndexMap<PathBuf, QueryFile>,
    symbols: HashMap<SymbolId, Symbol>,
}

/// The shared symbol database.
#[derive(Debug, Default)]
pub struct QueryDb {
    state: RwLock<DbState>,
}

/// Consistent read-only view of the database.
///
/// Holds the read lock; keep it short-lived.
pub struct DbView<'a> {
    state: RwLockReadGuard<'a, DbState>,
}

impl QueryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a consistent snapshot for several related lookups.
    pub fn read(&self) -> DbView<'_> {
        DbView {
            state: self.state.read(),
        }
    }

    /// Id for `path`, registering the file on first use.
    pub fn ensure_file(&self, path: &Path) -> FileId {
        if let Some(file) = self.state.read().files.get(path) {
            return file.file_id;
        }
        self.state.write().ensure_file(path)
    }

    /// Replace every contribution of `path` with those of `index`.
    ///
    /// Returns the symbols whose definitions or references changed.
    pub fn merge(&self, path: &Path, index: Arc<FileIndex>) -> HashSet<SymbolId> {
        let changed = self.state.write().merge(path, index);
        crate::debug_event!(
            "db",
            "merged",
            "{} ({} symbols changed)",
            path.display(),
            changed.len()
        );
        changed
    }

    /// Remove every contribution of `path`, keeping its file id.
    pub fn remove_file(&self, path: &Path) -> HashSet<SymbolId> {
        self.state.write().clear_file(path)
    }

    /// Record a failed extraction. The last good index stays in place.
    pub fn record_error(&self, path: &Path, error: impl Into<String>) {
        let mut state = self.state.write();
        let file_id = state.ensure_file(path);
        state.files[file_id.index()].last_error = Some(error.into());
    }

    pub fn lookup(&self, id: SymbolId) -> Option<Symbol> {
        self.read().lookup(id).cloned()
    }

    pub fn symbols_at(&self, path: &Path, position: Position) -> Vec<SymbolRef> {
        self.read().symbols_at(path, position)
    }

    pub fn file(&self, path: &Path) -> Option<QueryFile> {
        self.read().file(path).cloned()
    }

    pub fn content_hash(&self, path: &Path) -> Option<u64> {
        self.read().file(path).and_then(|file| file.content_hash)
    }

    pub fn symbol_count(&self) -> usize {
        self.read().symbol_count()
    }

    /// Number of files with a successful index.
    pub fn indexed_file_count(&self) -> usize {
        self.read().indexed_file_count()
    }
}

impl DbView<'_> {
    pub fn lookup(&self, id: SymbolId) -> Option<&Symbol> {
        self.state.symbols.get(&id)
    }

    pub fn file(&self, path: &Path) -> Option<&QueryFile> {
        self.state.files.get(path)
    }

    pub fn path_of(&self, file_id: FileId) -> Option<&Path> {
        self.state
            .files
            .get_index(file_id.index())
            .map(|(path, _)| path.as_path())
    }

    /// Resolve a location to `(path, range)`.
    pub fn resolve(&self, location: Location) -> Option<(PathBuf, Range)> {
        self.path_of(location.file_id)
            .map(|path| (path.to_path_buf(), location.range))
    }

    /// Symbols whose spelling or reference range contains `position`.
    ///
    /// Ordered innermost first (smallest enclosing range), then by the
    /// order the file declared them.
    pub fn symbols_at(&self, path: &Path, position: Position) -> Vec<SymbolRef> {
        let Some(index) = self.file(path).and_then(|file| file.index.as_deref()) else {
            return Vec::new();
        };

        let mut found: Vec<(usize, SymbolRef)> = Vec::new();
        for (order, fact) in index.symbols.iter().enumerate() {
            let spells = fact
                .definitions
                .iter()
                .filter_map(|def| def.spell)
                .map(|range| (range, Role::Definition));
            let refs = fact
                .references
                .iter()
                .map(|range| (*range, Role::Reference));

            for (range, role) in spells.chain(refs) {
                if !range.contains_position(position) {
                    continue;
                }
                let candidate = SymbolRef {
                    id: fact.id,
                    kind: fact.kind,
                    range,
                    role,
                };
                if !found
                    .iter()
                    .any(|(_, r)| r.id == candidate.id && r.range == candidate.range)
                {
                    found.push((order, candidate));
                }
            }
        }

        found.sort_by_key(|(order, r)| (r.range.span_key(), *order));
        found.into_iter().map(|(_, r)| r).collect()
    }

    pub fn symbol_count(&self) -> usize {
        self.state.symbols.len()
    }

    pub fn indexed_file_count(&self) -> usize {
        self.state
            .files
            .values()
            .filter(|file| file.is_indexed())
            .count()
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.state.symbols.keys().copied()
    }
}

/// Combined facts a single file states about each symbol.
///
/// A file may list the same symbol in several facts; comparing the merged
/// view keeps change detection independent of fact order.
fn facts_by_symbol(index: Option<&FileIndex>) -> HashMap<SymbolId, Vec<&SymbolFact>> {
    let mut map: HashMap<SymbolId, Vec<&SymbolFact>> = HashMap::new();
    if let Some(index) = index {
        for fact in &index.symbols {
            map.entry(fact.id).or_default().push(fact);
        }
    }
    map
}

impl DbState {
    fn ensure_file(&mut self, path: &Path) -> FileId {
        if let Some(index) = self.files.get_index_of(path) {
            return FileId::from_index(index);
        }
        let file_id = FileId::from_index(self.files.len());
        self.files
            .insert(path.to_path_buf(), QueryFile::new(path.to_path_buf(), file_id));
        file_id
    }

    fn merge(&mut self, path: &Path, index: Arc<FileIndex>) -> HashSet<SymbolId> {
        let file_id = self.ensure_file(path);
        let previous = self.files[file_id.index()].index.clone();

        let old_facts = facts_by_symbol(previous.as_deref());
        let new_facts = facts_by_symbol(Some(&index));
        let mut changed: HashSet<SymbolId> = old_facts
            .keys()
            .chain(new_facts.keys())
            .filter(|id| old_facts.get(id) != new_facts.get(id))
            .copied()
            .collect();

        for (id, facts) in &old_facts {
            let expected = facts.iter().any(|fact| !fact.is_empty());
            if self.remove_contribution(*id, file_id, path, expected) {
                changed.insert(*id);
            }
        }

        for fact in &index.symbols {
            self.add_contribution(file_id, fact);
        }

        let file = &mut self.files[file_id.index()];
        file.content_hash = Some(index.content_hash);
        file.last_error = None;
        file.index = Some(index);

        changed
    }

    fn clear_file(&mut self, path: &Path) -> HashSet<SymbolId> {
        let Some(file_index) = self.files.get_index_of(path) else {
            return HashSet::new();
        };
        let file_id = FileId::from_index(file_index);
        let Some(previous) = self.files[file_index].index.take() else {
            return HashSet::new();
        };
        self.files[file_index].content_hash = None;

        let mut changed = HashSet::new();
        for (id, facts) in facts_by_symbol(Some(&previous)) {
            let expected = facts.iter().any(|fact| !fact.is_empty());
            self.remove_contribution(id, file_id, path, expected);
            if expected {
                changed.insert(id);
            }
        }
        changed
    }

    /// Strip `file_id`'s contributions from `id`.
    ///
    /// Returns true when the symbol had to be rebuilt after a conflict.
    fn remove_contribution(
        &mut self,
        id: SymbolId,
        file_id: FileId,
        path: &Path,
        expected: bool,
    ) -> bool {
        let removed = match self.symbols.get_mut(&id) {
            Some(symbol) => {
                let removed = symbol.remove_file(file_id);
                if symbol.is_empty() {
                    self.symbols.remove(&id);
                }
                removed
            }
            None => false,
        };

        if expected && !removed {
            let conflict = MergeConflict {
                symbol: id,
                path: path.to_path_buf(),
                reason: "previous contribution not found",
            };
            tracing::error!("[db] {conflict}; rebuilding symbol");
            self.rebuild_symbol(id, file_id);
            return true;
        }
        false
    }

    fn add_contribution(&mut self, file_id: FileId, fact: &SymbolFact) {
        if fact.is_empty() {
            return;
        }
        let symbol = self
            .symbols
            .entry(fact.id)
            .or_insert_with(|| Symbol::new(fact.id, fact.kind));
        symbol.kind = fact.kind;
        for def in &fact.definitions {
            symbol.add_definition(file_id, def);
        }
        for range in &fact.references {
            symbol.add_reference(file_id, *range);
        }
    }

    /// Recompute `id` from the current index of every file except `skip`.
    fn rebuild_symbol(&mut self, id: SymbolId, skip: FileId) {
        self.symbols.remove(&id);

        let sources: Vec<(FileId, Arc<FileIndex>)> = self
            .files
            .values()
            .filter(|file| file.file_id != skip)
            .filter_map(|file| file.index.clone().map(|index| (file.file_id, index)))
            .collect();

        for (file_id, index) in sources {
            for fact in index.symbols.iter().filter(|fact| fact.id == id) {
                self.add_contribution(file_id, fact);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Definition;
    use crate::types::SymbolKind;

    fn foo() -> SymbolId {
        SymbolId::from_usr("c:@F@foo#")
    }

    fn bar() -> SymbolId {
        SymbolId::from_usr("c:@F@bar#")
    }

    fn header(symbol: SymbolId, name: &str, hash: u64) -> Arc<FileIndex> {
        Arc::new(
            FileIndex::new("a.h", hash).with_symbol(
                SymbolFact::new(symbol, SymbolKind::Function).with_definition(
                    Definition::new(Range::new(0, 0, 0, 16))
                        .with_spell(Range::new(0, 5, 0, 8))
                        .with_detailed_name(name)
                        .with_hover(format!("void {name}()")),
                ),
            ),
        )
    }

    fn source(symbol: SymbolId) -> Arc<FileIndex> {
        Arc::new(FileIndex::new("b.cc", 2).with_symbol(
            SymbolFact::new(symbol, SymbolKind::Function).with_reference(Range::new(10, 2, 10, 5)),
        ))
    }

    #[test]
    fn test_cross_file_aggregation() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        db.merge(Path::new("b.cc"), source(foo()));

        let view = db.read();
        let symbol = view.lookup(foo()).unwrap();
        assert_eq!(symbol.definitions.len(), 1);
        assert_eq!(
            view.path_of(symbol.definitions[0].file_id),
            Some(Path::new("a.h"))
        );
        let refs: Vec<_> = symbol
            .references
            .iter()
            .filter_map(|loc| view.resolve(*loc))
            .collect();
        assert_eq!(refs, vec![(PathBuf::from("b.cc"), Range::new(10, 2, 10, 5))]);
    }

    #[test]
    fn test_rename_replaces_contributions() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        db.merge(Path::new("b.cc"), source(foo()));

        let changed = db.merge(Path::new("a.h"), header(bar(), "bar", 3));
        assert_eq!(changed, HashSet::from([foo(), bar()]));

        // foo survives only through b.cc's reference
        let foo_sym = db.lookup(foo()).unwrap();
        assert!(foo_sym.definitions.is_empty());
        assert_eq!(foo_sym.references.len(), 1);

        let bar_sym = db.lookup(bar()).unwrap();
        assert_eq!(bar_sym.definitions[0].def.detailed_name, "bar");
        assert!(bar_sym.references.is_empty());

        // Re-merging b.cc without the reference removes foo entirely
        db.merge(Path::new("b.cc"), Arc::new(FileIndex::new("b.cc", 4)));
        assert!(db.lookup(foo()).is_none());
    }

    #[test]
    fn test_idempotent_merge() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        db.merge(Path::new("b.cc"), source(foo()));
        let before = db.lookup(foo());

        let changed = db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        assert!(changed.is_empty());
        assert_eq!(db.lookup(foo()), before);
        assert_eq!(db.symbol_count(), 1);
    }

    #[test]
    fn test_symbols_at_innermost_first() {
        let db = QueryDb::new();
        let outer = SymbolId::from_usr("c:@S@Widget");
        let inner = SymbolId::from_usr("c:@S@Widget@F@draw#");
        let index = FileIndex::new("w.cc", 1)
            .with_symbol(
                SymbolFact::new(outer, SymbolKind::Type).with_reference(Range::new(3, 0, 3, 20)),
            )
            .with_symbol(
                SymbolFact::new(inner, SymbolKind::Function).with_definition(
                    Definition::new(Range::new(3, 0, 3, 30)).with_spell(Range::new(3, 8, 3, 12)),
                ),
            );
        db.merge(Path::new("w.cc"), Arc::new(index));

        let hits = db.symbols_at(Path::new("w.cc"), Position::new(3, 9));
        let ids: Vec<_> = hits.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![inner, outer]);
        assert_eq!(hits[0].role, Role::Definition);

        assert!(db.symbols_at(Path::new("w.cc"), Position::new(7, 0)).is_empty());
        assert!(db.symbols_at(Path::new("unknown.cc"), Position::new(3, 9)).is_empty());
    }

    #[test]
    fn test_record_error_keeps_last_good_index() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        db.record_error(Path::new("a.h"), "parse failed");

        let file = db.file(Path::new("a.h")).unwrap();
        assert_eq!(file.content_hash, Some(1));
        assert_eq!(file.last_error.as_deref(), Some("parse failed"));
        assert!(db.lookup(foo()).is_some());

        db.merge(Path::new("a.h"), header(foo(), "foo", 5));
        assert!(db.file(Path::new("a.h")).unwrap().last_error.is_none());
    }

    #[test]
    fn test_remove_file() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        let id = db.ensure_file(Path::new("a.h"));

        let changed = db.remove_file(Path::new("a.h"));
        assert_eq!(changed, HashSet::from([foo()]));
        assert!(db.lookup(foo()).is_none());
        assert_eq!(db.indexed_file_count(), 0);
        // The id is stable across removal
        assert_eq!(db.ensure_file(Path::new("a.h")), id);
    }

    #[test]
    fn test_conflict_rebuilds_from_other_files() {
        let db = QueryDb::new();
        db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        db.merge(Path::new("b.cc"), source(foo()));

        // Corrupt the state: drop a.h's definition behind the merge's back
        {
            let mut state = db.state.write();
            let a = state.ensure_file(Path::new("a.h"));
            state.symbols.get_mut(&foo()).unwrap().remove_file(a);
        }

        let changed = db.merge(Path::new("a.h"), header(foo(), "foo", 1));
        assert!(changed.contains(&foo()));

        let symbol = db.lookup(foo()).unwrap();
        assert_eq!(symbol.definitions.len(), 1);
        assert_eq!(symbol.references.len(), 1);
    }
}
