//! bookshelf command line front end.
//!
//! Loads configuration, sets up logging, opens the database and hands the
//! parsed command to the store. Results are printed to stdout as JSON; errors
//! are printed to stderr as JSON with a non-zero exit code.

mod cli;
mod commands;

use crate::cli::Cli;
use crate::commands::Defaults;
use bookshelf_config::Config;
use bookshelf_store::error::ErrorKind;
use bookshelf_store::{Database, Repositories};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, verbose: u8) {
    let default = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_logging(&config.log.level, cli.verbose);

    if let Some(parent) = config.database.path.parent().filter(|parent| !parent.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        tracing::error!(path = %parent.display(), "could not create database directory: {err}");
        return ExitCode::FAILURE;
    }
    let db = match Database::connect(&config.database.path, Some(config.database.max_connections)).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(path = %config.database.path.display(), "could not open database: {err:?}");
            return ExitCode::FAILURE;
        },
    };

    let repos = Repositories::sqlite(&db, config.database.timeout());
    let defaults = Defaults {
        page_size: config.listing.page_size,
    };
    let result = commands::run(cli.command, &repos, defaults).await;
    db.close().await;

    match result {
        Ok(body) => {
            println!("{body:#}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            if matches!(&*err, ErrorKind::Store) {
                tracing::error!("{err:?}");
            } else {
                tracing::debug!("{err:?}");
            }
            eprintln!("{:#}", commands::error_body(&err));
            ExitCode::FAILURE
        },
    }
}
