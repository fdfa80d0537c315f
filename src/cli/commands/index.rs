//! Index command.

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::Session;
use crate::config::Settings;
use crate::pipeline::IndexMode;

/// Index `files` and print one status line per file.
///
/// Returns the number of files that failed to index.
pub fn run_index(settings: Settings, files: &[PathBuf], force: bool) -> Result<usize> {
    let session = Session::start(settings)?;
    let mode = if force {
        IndexMode::Normal
    } else {
        IndexMode::Lazy
    };
    let paths = session.index_files(files, mode)?;

    let db = session.pipeline.db();
    let mut failed = 0;
    for path in &paths {
        match db.file(path) {
            Some(file) if file.last_error.is_some() => {
                failed += 1;
                let error = file.last_error.unwrap_or_default();
                println!("FAIL  {}: {error}", path.display());
            }
            Some(file) => {
                let symbols = file.index.as_ref().map_or(0, |index| index.symbols.len());
                println!("OK    {} ({symbols} symbols)", path.display());
            }
            None => {
                failed += 1;
                println!("SKIP  {}", path.display());
            }
        }
    }

    println!();
    println!(
        "{} files, {} symbols in database",
        db.indexed_file_count(),
        db.symbol_count()
    );
    println!("{}", session.pipeline.metrics().summary());
    Ok(failed)
}
