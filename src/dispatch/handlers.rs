//! Query handlers. Each reads one consistent view of the database.

use std::path::Path;

use super::{Dispatcher, ReplyValue, SourceLocation};
use crate::db::{DbView, SymbolRef, select_hover};
use crate::types::{Location, Position};

impl Dispatcher {
    pub(super) fn hover(&self, path: &Path, position: Position) -> Option<ReplyValue> {
        let position = self.files.index_position(path, position);
        let view = self.db.read();
        let file = view.file(path)?;
        let language = file.index.as_ref()?.language;

        view.symbols_at(path, position).into_iter().find_map(|at| {
            let symbol = view.lookup(at.id)?;
            let content = select_hover(symbol, Some(file.file_id))?;
            Some(ReplyValue::Hover {
                contents: content.to_markdown(language),
                range: at.range,
            })
        })
    }

    /// Definitions of the innermost symbol at `position`.
    ///
    /// When the cursor already sits on one of the definitions, the others
    /// are returned instead.
    pub(super) fn definition(&self, path: &Path, position: Position) -> Option<ReplyValue> {
        let position = self.files.index_position(path, position);
        let view = self.db.read();
        let file_id = view.file(path)?.file_id;
        let at = innermost(&view, path, position)?;
        let symbol = view.lookup(at.id)?;

        let here = Location {
            file_id,
            range: at.range,
        };
        let all: Vec<Location> = symbol.definitions.iter().map(|d| d.location()).collect();
        let others: Vec<Location> = all.iter().copied().filter(|loc| *loc != here).collect();
        let chosen = if others.is_empty() { all } else { others };

        locations(&view, chosen)
    }

    pub(super) fn references(
        &self,
        path: &Path,
        position: Position,
        include_declaration: bool,
    ) -> Option<ReplyValue> {
        let position = self.files.index_position(path, position);
        let view = self.db.read();
        let at = innermost(&view, path, position)?;
        let symbol = view.lookup(at.id)?;

        let mut found: Vec<Location> = symbol.references.iter().copied().collect();
        if include_declaration {
            found.extend(symbol.definitions.iter().filter_map(|d| d.spell()));
        }
        locations(&view, found)
    }
}

fn innermost(view: &DbView<'_>, path: &Path, position: Position) -> Option<SymbolRef> {
    view.symbols_at(path, position).into_iter().next()
}

/// Resolve, sort and dedup; `None` when nothing resolves.
fn locations(view: &DbView<'_>, found: Vec<Location>) -> Option<ReplyValue> {
    let mut resolved: Vec<SourceLocation> = found
        .into_iter()
        .filter_map(|loc| view.resolve(loc))
        .map(|(path, range)| SourceLocation { path, range })
        .collect();
    resolved.sort();
    resolved.dedup();

    if resolved.is_empty() {
        None
    } else {
        Some(ReplyValue::Locations(resolved))
    }
}
