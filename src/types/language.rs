use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language of an indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LanguageId {
    C,
    Cpp,
    ObjC,
    ObjCpp,
    #[default]
    Unknown,
}

impl LanguageId {
    /// Detect language from the file extension.
    ///
    /// Returns the language and whether the file is a header. Headers map to
    /// C++ because a bare `.h` is most often included from C++ sources.
    pub fn from_path(path: &Path) -> (LanguageId, bool) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "c" => (LanguageId::C, false),
            "cc" | "cpp" | "cxx" | "c++" => (LanguageId::Cpp, false),
            "m" => (LanguageId::ObjC, false),
            "mm" => (LanguageId::ObjCpp, false),
            "h" | "hh" | "hpp" | "hxx" | "inc" | "inl" => (LanguageId::Cpp, true),
            _ => (LanguageId::Unknown, false),
        }
    }

    /// Identifier used to tag fenced code blocks.
    pub fn identifier(&self) -> &'static str {
        match self {
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
            LanguageId::ObjC => "objective-c",
            LanguageId::ObjCpp => "objective-cpp",
            LanguageId::Unknown => "",
        }
    }
}
