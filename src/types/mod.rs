mod language;

pub use language::LanguageId;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

use crate::index::compute_hash;

/// Stable cross-file identity of a symbol.
///
/// Built from a unified symbol resolution string (USR), so the same entity
/// declared in a header and defined in a source file shares one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

/// Zero-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u16,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

/// A range inside a specific indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_id: FileId,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Type,
    Function,
    Variable,
    Macro,
}

impl SymbolId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Derive the id from a USR string.
    pub fn from_usr(usr: &str) -> Self {
        Self(compute_hash(usr.as_bytes()))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    /// Convert to the underlying u32 value
    pub fn to_u32(self) -> u32 {
        self.0.get()
    }

    /// Id for the file stored at zero-based slot `index`.
    pub(crate) fn from_index(index: usize) -> Self {
        let offset = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self(NonZeroU32::MIN.saturating_add(offset))
    }

    /// Zero-based slot of this file.
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl Position {
    pub fn new(line: u32, column: u16) -> Self {
        Self { line, column }
    }
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }

        if line == self.start_line && column < self.start_column {
            return false;
        }

        if line == self.end_line && column > self.end_column {
            return false;
        }

        true
    }

    pub fn contains_position(&self, position: Position) -> bool {
        self.contains(position.line, position.column)
    }

    /// Ordering key for "smallest enclosing range first".
    ///
    /// Fewer spanned lines sort first; on the same line count the narrower
    /// column span wins.
    pub fn span_key(&self) -> (u32, i32) {
        let lines = self.end_line.saturating_sub(self.start_line);
        let columns = i32::from(self.end_column) - i32::from(self.start_column);
        (lines, columns)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line + 1,
            self.start_column + 1,
            self.end_line + 1,
            self.end_column + 1
        )
    }
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Macro => "macro",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_creation() {
        assert!(FileId::new(0).is_none());

        let id = FileId::new(100).unwrap();
        assert_eq!(id.value(), 100);
    }

    #[test]
    fn test_file_id_index_round_trip() {
        let id = FileId::from_index(0);
        assert_eq!(id.value(), 1);
        assert_eq!(FileId::from_index(41).index(), 41);
    }

    #[test]
    fn test_symbol_id_from_usr_is_stable() {
        let a = SymbolId::from_usr("c:@F@foo#");
        let b = SymbolId::from_usr("c:@F@foo#");
        let c = SymbolId::from_usr("c:@F@bar#");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(format!("{a}").len(), 16);
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(10, 5, 15, 20);

        // Inside range
        assert!(range.contains(12, 10));
        assert!(range.contains(10, 5)); // Start position
        assert!(range.contains(15, 20)); // End position

        // Outside range
        assert!(!range.contains(9, 10)); // Before start line
        assert!(!range.contains(16, 10)); // After end line
        assert!(!range.contains(10, 4)); // Before start column
        assert!(!range.contains(15, 21)); // After end column
    }

    #[test]
    fn test_span_key_orders_innermost_first() {
        let call = Range::new(4, 2, 4, 20);
        let name = Range::new(4, 2, 4, 5);
        let body = Range::new(1, 0, 9, 1);

        let mut ranges = vec![body, call, name];
        ranges.sort_by_key(Range::span_key);
        assert_eq!(ranges, vec![name, call, body]);
    }

    #[test]
    fn test_range_display_is_one_based() {
        assert_eq!(Range::new(0, 0, 0, 3).to_string(), "1:1-1:4");
    }
}
