//! CLI entry point for paperdl.

use anyhow::Result;
use clap::Parser;
use paperdl_core::{Database, resolve_default_db_path};
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Command::Config(args) => commands::run_config_command(&args),
        Command::Domains(args) => {
            let db = open_database().await?;
            let result = commands::run_domains_command(&args, db.clone()).await;
            db.close().await;
            result
        }
        Command::Download(args) => {
            let loaded = app_config::load_default_file_config()?;
            if loaded.loaded_from_file {
                debug!(path = ?loaded.path, "loaded config file");
            }

            let db = open_database().await?;
            let result =
                commands::run_download_command(&args, loaded.config.as_ref(), db.clone()).await;
            db.close().await;
            result
        }
    }
}

async fn open_database() -> Result<Database> {
    let db_path = resolve_default_db_path()?;
    Ok(Database::new(&db_path).await?)
}
