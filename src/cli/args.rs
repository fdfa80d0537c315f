//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::types::Position;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "symdb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Incremental C/C++ symbol index",
    long_about = "Index pre-extracted symbol facts and answer hover, definition and references queries.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of indexing threads (overrides config)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up .symdb directory
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Index source files and print a summary
    Index {
        /// Source files (facts are read from <file>.facts.json)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Re-extract even when the cache holds the same content
        #[arg(short, long)]
        force: bool,
    },

    /// Show hover text for the symbol at a position
    Hover(QueryArgs),

    /// Go to the definition of the symbol at a position
    Definition(QueryArgs),

    /// List references to the symbol at a position
    Refs {
        #[command(flatten)]
        query: QueryArgs,

        /// Include declarations in the result
        #[arg(long)]
        declaration: bool,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    /// Files to index before answering
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Query position as FILE:LINE:COLUMN (1-based)
    #[arg(long, value_parser = parse_target)]
    pub at: Target,
}

/// A position inside a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    /// Zero-based
    pub position: Position,
}

/// Parse `FILE:LINE:COLUMN` with 1-based line and column.
pub fn parse_target(s: &str) -> Result<Target, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(column), Some(line), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected FILE:LINE:COLUMN, got '{s}'"));
    };
    if path.is_empty() {
        return Err(format!("missing file in '{s}'"));
    }

    let line: u32 = line
        .parse()
        .map_err(|_| format!("invalid line '{line}'"))?;
    let column: u16 = column
        .parse()
        .map_err(|_| format!("invalid column '{column}'"))?;
    if line == 0 || column == 0 {
        return Err("line and column are 1-based".to_string());
    }

    Ok(Target {
        path: PathBuf::from(path),
        position: Position::new(line - 1, column - 1),
    })
}
