//! Hover, definition and references commands.

use anyhow::Result;

use crate::cli::args::QueryArgs;
use crate::cli::{Session, canonical};
use crate::config::Settings;
use crate::dispatch::{ReplyValue, RequestKind};
use crate::pipeline::IndexMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Hover,
    Definition,
    References { include_declaration: bool },
}

/// Index the query's files, answer one request and print the reply.
///
/// Returns false when the request had no result.
pub fn run_query(settings: Settings, args: &QueryArgs, kind: QueryKind) -> Result<bool> {
    let mut session = Session::start(settings)?;
    session.index_files(&args.files, IndexMode::Lazy)?;

    let path = canonical(&args.at.path)?;
    let position = args.at.position;
    let request = match kind {
        QueryKind::Hover => RequestKind::Hover { path, position },
        QueryKind::Definition => RequestKind::Definition { path, position },
        QueryKind::References {
            include_declaration,
        } => RequestKind::References {
            path,
            position,
            include_declaration,
        },
    };

    match session.query(request)? {
        Some(ReplyValue::Hover { contents, range }) => {
            println!("{contents}");
            println!();
            println!("({range})");
            Ok(true)
        }
        Some(ReplyValue::Locations(locations)) => {
            for location in &locations {
                println!("{location}");
            }
            Ok(true)
        }
        None => {
            eprintln!("No result");
            Ok(false)
        }
    }
}
