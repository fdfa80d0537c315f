//! End-to-end: fact files on disk, CLI session, dispatcher replies.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use symdb::cli::Session;
use symdb::{FactsFileExtractor, IndexMode, Position, ReplyValue, RequestKind, Settings};

fn range(line: u32, start: u16, end: u16) -> serde_json::Value {
    json!({"start_line": line, "start_column": start, "end_line": line, "end_column": end})
}

fn write_source(dir: &Path, name: &str, source: &str, facts: serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    fs::write(FactsFileExtractor::facts_path(&path), facts.to_string()).unwrap();
    path
}

fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let header = write_source(
        dir,
        "greet.h",
        "/// Prints a greeting.\nvoid greet(int times);\n",
        json!({
            "symbols": [{
                "usr": "c:@F@greet#I#",
                "kind": "function",
                "definitions": [{
                    "spell": range(1, 5, 10),
                    "extent": range(1, 0, 21),
                    "detailed_name": "greet",
                    "hover": "void greet(int times)",
                    "comments": "Prints a greeting."
                }]
            }]
        }),
    );
    let source = write_source(
        dir,
        "main.cc",
        "#include \"greet.h\"\nint main() {\n  greet(3);\n}\n",
        json!({
            "symbols": [{
                "usr": "c:@F@greet#I#",
                "kind": "function",
                "references": [range(2, 2, 7)]
            }]
        }),
    );
    (header, source)
}

fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.index.threads = 2;
    settings.cache.directory = Some(dir.join("cache"));
    settings
}

#[test]
fn test_session_answers_queries_from_fact_files() {
    let temp = TempDir::new().unwrap();
    let (header, source) = fixture(temp.path());

    let mut session = Session::start(settings(temp.path())).unwrap();
    let paths = session
        .index_files(&[header, source.clone()], IndexMode::Normal)
        .unwrap();
    let source = fs::canonicalize(source).unwrap();
    assert_eq!(paths[1], source);

    let hover = session
        .query(RequestKind::Hover {
            path: source.clone(),
            position: Position::new(2, 4),
        })
        .unwrap();
    match hover {
        Some(ReplyValue::Hover { contents, .. }) => {
            assert_eq!(
                contents,
                "```cpp\nvoid greet(int times)\n```\n\nPrints a greeting."
            );
        }
        other => panic!("expected hover, got {other:?}"),
    }

    let defs = session
        .query(RequestKind::Definition {
            path: source,
            position: Position::new(2, 4),
        })
        .unwrap();
    match defs {
        Some(ReplyValue::Locations(locations)) => {
            assert_eq!(locations.len(), 1);
            assert!(locations[0].path.ends_with("greet.h"));
            assert_eq!(locations[0].range.start_line, 1);
            assert_eq!(locations[0].to_string(), format!("{}:2:6-2:11", locations[0].path.display()));
        }
        other => panic!("expected locations, got {other:?}"),
    }
}

#[test]
fn test_second_session_reuses_disk_cache() {
    let temp = TempDir::new().unwrap();
    let (header, source) = fixture(temp.path());
    let files = [header, source];

    let first = Session::start(settings(temp.path())).unwrap();
    first.index_files(&files, IndexMode::Lazy).unwrap();
    assert_eq!(first.pipeline.metrics().extractor_invocations, 2);

    // Fact files vanish; the cache still has both indexes
    for file in &files {
        fs::remove_file(FactsFileExtractor::facts_path(file)).unwrap();
    }

    let second = Session::start(settings(temp.path())).unwrap();
    second.index_files(&files, IndexMode::Lazy).unwrap();
    let metrics = second.pipeline.metrics();
    assert_eq!(metrics.extractor_invocations, 0);
    assert_eq!(metrics.cache_hits, 2);
    assert_eq!(second.pipeline.db().symbol_count(), 1);
}

#[test]
fn test_missing_fact_file_is_reported_not_fatal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orphan.c");
    fs::write(&path, "int x;\n").unwrap();

    let session = Session::start(settings(temp.path())).unwrap();
    let paths = session.index_files(&[path], IndexMode::Normal).unwrap();

    let file = session.pipeline.db().file(&paths[0]).unwrap();
    assert!(!file.is_indexed());
    assert!(file.last_error.unwrap().contains("orphan.c.facts.json"));
    assert_eq!(session.pipeline.metrics().extract_failures, 1);
}

#[test]
fn test_index_files_rejects_missing_paths() {
    let temp = TempDir::new().unwrap();
    let session = Session::start(settings(temp.path())).unwrap();
    let err = session
        .index_files(&[temp.path().join("nope.cc")], IndexMode::Normal)
        .unwrap_err();
    assert!(err.to_string().contains("nope.cc"));
}
