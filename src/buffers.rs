//! Open-buffer tracking.
//!
//! [`OpenBuffers`] is the seam the pipeline reads content through: it only
//! returns text for files whose editor buffer differs from disk. The
//! dispatcher owns a concrete [`WorkingFiles`] set, which also remembers the
//! content the file was last indexed with so that buffer positions can be
//! mapped back onto the index after unsaved edits.

use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::types::Position;

/// Source of live editor content.
pub trait OpenBuffers: Send + Sync {
    /// Buffer text, present only if the file is open with unsaved edits.
    fn get_content(&self, path: &Path) -> Option<String>;

    fn is_open(&self, path: &Path) -> bool;

    /// `content` was just merged into the index for `path`.
    fn on_indexed(&self, _path: &Path, _content: &str) {}
}

#[derive(Debug, Clone)]
pub struct WorkingFile {
    pub text: String,
    pub version: i32,
    /// Buffer differs from what is on disk
    pub dirty: bool,
    /// Content the current index was built from, if known
    pub index_content: Option<String>,
}

/// Files currently open in the editor.
#[derive(Debug, Default)]
pub struct WorkingFiles {
    files: DashMap<PathBuf, WorkingFile>,
}

impl WorkingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(&self, path: &Path, text: impl Into<String>, version: i32) {
        let text = text.into();
        let dirty = fs::read_to_string(path).map_or(true, |disk| disk != text);
        self.files.insert(
            path.to_path_buf(),
            WorkingFile {
                text,
                version,
                dirty,
                index_content: None,
            },
        );
    }

    /// Replace the buffer text (full-document sync).
    ///
    /// Returns false when the file is not open.
    pub fn on_change(&self, path: &Path, text: impl Into<String>, version: i32) -> bool {
        match self.files.get_mut(path) {
            Some(mut file) => {
                file.text = text.into();
                file.version = version;
                file.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn on_save(&self, path: &Path) {
        if let Some(mut file) = self.files.get_mut(path) {
            file.dirty = false;
        }
    }

    pub fn on_close(&self, path: &Path) -> Option<WorkingFile> {
        self.files.remove(path).map(|(_, file)| file)
    }

    pub fn set_index_content(&self, path: &Path, content: impl Into<String>) {
        if let Some(mut file) = self.files.get_mut(path) {
            file.index_content = Some(content.into());
        }
    }

    pub fn get(&self, path: &Path) -> Option<WorkingFile> {
        self.files.get(path).map(|file| file.clone())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Map a buffer position onto the indexed content.
    ///
    /// Identity when the file is not open or no indexed content is known.
    pub fn index_position(&self, path: &Path, position: Position) -> Position {
        let Some(file) = self.files.get(path) else {
            return position;
        };
        let Some(index_content) = file.index_content.as_deref() else {
            return position;
        };
        if index_content == file.text {
            return position;
        }
        match map_line(&file.text, index_content, position.line) {
            Some(line) => Position::new(line, position.column),
            None => position,
        }
    }
}

impl OpenBuffers for WorkingFiles {
    fn get_content(&self, path: &Path) -> Option<String> {
        self.files
            .get(path)
            .filter(|file| file.dirty)
            .map(|file| file.text.clone())
    }

    fn is_open(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn on_indexed(&self, path: &Path, content: &str) {
        self.set_index_content(path, content);
    }
}

/// Find the indexed line matching buffer line `line`.
///
/// Searches outward from the same line number for an identical line and
/// returns the nearest match; ties prefer the line above.
fn map_line(buffer: &str, indexed: &str, line: u32) -> Option<u32> {
    let target = buffer.lines().nth(line as usize)?;
    let indexed: Vec<&str> = indexed.lines().collect();
    let origin = line as usize;

    for distance in 0..=origin.max(indexed.len()) {
        let above = origin.checked_sub(distance);
        let below = origin + distance;

        if let Some(i) = above {
            if indexed.get(i) == Some(&target) {
                return u32::try_from(i).ok();
            }
        }
        if distance > 0 && indexed.get(below) == Some(&target) {
            return u32::try_from(below).ok();
        }
        if above.is_none() && below >= indexed.len() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_clean_file_has_no_live_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.cc");
        fs::write(&path, "int x;\n").unwrap();

        let files = WorkingFiles::new();
        files.on_open(&path, "int x;\n", 1);

        assert!(files.is_open(&path));
        assert!(files.get_content(&path).is_none());

        files.on_change(&path, "int y;\n", 2);
        assert_eq!(files.get_content(&path).as_deref(), Some("int y;\n"));

        files.on_save(&path);
        assert!(files.get_content(&path).is_none());

        assert!(files.on_close(&path).is_some());
        assert!(!files.is_open(&path));
    }

    #[test]
    fn test_open_with_unsaved_text_is_dirty() {
        let files = WorkingFiles::new();
        let path = Path::new("/nonexistent/b.cc");
        files.on_open(path, "void f();", 1);
        assert_eq!(files.get_content(path).as_deref(), Some("void f();"));
    }

    #[test]
    fn test_change_on_unopened_file_is_ignored() {
        let files = WorkingFiles::new();
        assert!(!files.on_change(Path::new("c.cc"), "x", 1));
        assert!(files.is_empty());
    }

    #[test]
    fn test_map_line_follows_inserted_lines() {
        let indexed = "a\nb\nfoo();\nc\n";
        let buffer = "a\nnew\nnew\nb\nfoo();\nc\n";

        assert_eq!(map_line(buffer, indexed, 4), Some(2));
        assert_eq!(map_line(buffer, indexed, 0), Some(0));
        assert_eq!(map_line(buffer, indexed, 1), None);
        assert_eq!(map_line(buffer, indexed, 99), None);
    }

    #[test]
    fn test_map_line_reaches_back_past_end_of_index() {
        let indexed = "a\nb\nfoo();\n";
        let buffer = format!("{}a\nb\nfoo();\n", "// added\n".repeat(47));

        assert_eq!(map_line(&buffer, indexed, 49), Some(2));
        assert_eq!(map_line(&buffer, indexed, 47), Some(0));
        assert_eq!(map_line(&buffer, indexed, 10), None);
    }

    #[test]
    fn test_index_position_after_large_insertion() {
        let files = WorkingFiles::new();
        let path = Path::new("/nonexistent/e.cc");
        let text = format!("{}int x;\n", "// note\n".repeat(60));
        files.on_open(path, text, 2);
        files.set_index_content(path, "int x;\n");

        assert_eq!(
            files.index_position(path, Position::new(60, 4)),
            Position::new(0, 4)
        );
    }

    #[test]
    fn test_index_position_uses_index_content() {
        let files = WorkingFiles::new();
        let path = Path::new("/nonexistent/d.cc");
        files.on_open(path, "// header\nint x;\n", 1);
        files.set_index_content(path, "int x;\n");

        assert_eq!(
            files.index_position(path, Position::new(1, 4)),
            Position::new(0, 4)
        );
        // Unknown files pass through untouched
        assert_eq!(
            files.index_position(Path::new("other.cc"), Position::new(3, 1)),
            Position::new(3, 1)
        );
    }
}
