use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;

use symdb::Settings;
use symdb::cli::commands::index::run_index;
use symdb::cli::commands::init::{run_config, run_init};
use symdb::cli::commands::query::{QueryKind, run_query};
use symdb::cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Init { force } = cli.command {
        run_init(force)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path).map_err(|e| anyhow!("{e}"))?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration.");
            Settings::default()
        }),
    };
    if let Some(threads) = cli.threads {
        settings.index.threads = threads;
    }
    symdb::logging::init_with_config(&settings.logging);

    let ok = match &cli.command {
        Commands::Init { .. } => true,
        Commands::Config => {
            run_config(&settings)?;
            true
        }
        Commands::Index { files, force } => run_index(settings, files, *force)? == 0,
        Commands::Hover(args) => run_query(settings, args, QueryKind::Hover)?,
        Commands::Definition(args) => run_query(settings, args, QueryKind::Definition)?,
        Commands::Refs { query, declaration } => run_query(
            settings,
            query,
            QueryKind::References {
                include_declaration: *declaration,
            },
        )?,
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
