//! Hover text selection across a symbol's definitions.

use super::symbol::Symbol;
use crate::types::{FileId, LanguageId};

/// Signature and documentation chosen for a hover reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverContent {
    pub signature: Option<String>,
    pub comments: Option<String>,
}

impl HoverContent {
    /// Render as markdown: fenced signature, blank line, comments.
    pub fn to_markdown(&self, language: LanguageId) -> String {
        let mut out = String::new();
        if let Some(signature) = &self.signature {
            out.push_str("```");
            out.push_str(language.identifier());
            out.push('\n');
            out.push_str(signature);
            out.push_str("\n```");
        }
        if let Some(comments) = &self.comments {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(comments);
        }
        out
    }
}

/// Pick hover content for `symbol` as seen from the file `queried`.
///
/// Signature preference:
/// 1. a definition spelled in the queried file
/// 2. the longest hover text anywhere (first one on ties)
/// 3. the first non-empty detailed name
///
/// Comments are the first non-empty comment text in stored order.
/// Returns `None` when there is neither a signature nor comments.
pub fn select_hover(symbol: &Symbol, queried: Option<FileId>) -> Option<HoverContent> {
    let local = queried.and_then(|file_id| {
        symbol
            .definitions
            .iter()
            .filter(|d| d.file_id == file_id && d.def.spell.is_some())
            .find_map(|d| d.def.signature())
    });

    let longest_hover = || {
        symbol
            .definitions
            .iter()
            .map(|d| d.def.hover.as_str())
            .filter(|hover| !hover.is_empty())
            .fold(None, |best: Option<&str>, hover| match best {
                Some(b) if b.len() >= hover.len() => Some(b),
                _ => Some(hover),
            })
    };

    let first_name = || {
        symbol
            .definitions
            .iter()
            .map(|d| d.def.detailed_name.as_str())
            .find(|name| !name.is_empty())
    };

    let signature = local.or_else(longest_hover).or_else(first_name);
    let comments = symbol
        .definitions
        .iter()
        .map(|d| d.def.comments.as_str())
        .find(|c| !c.is_empty());

    if signature.is_none() && comments.is_none() {
        return None;
    }
    Some(HoverContent {
        signature: signature.map(str::to_string),
        comments: comments.map(str::to_string),
    })
}
