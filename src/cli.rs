//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Resolve DOIs, PMIDs, and titles to downloadable documents via
/// community mirror networks.
#[derive(Parser, Debug)]
#[command(name = "paperdl")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download document(s) by DOI, PMID, or title.
    Download(DownloadArgs),
    /// List known mirrors and their health statistics.
    Domains(DomainsArgs),
    /// Show configuration location and effective values.
    Config(ConfigArgs),
}

/// Arguments for the `domains` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct DomainsArgs {
    /// Emit the mirror list as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `download` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// DOI string. May be repeated: -d FIRST_DOI -d SECOND_DOI ...
    #[arg(short = 'd', long = "doi")]
    pub doi: Vec<String>,

    /// PMID number. May be repeated: -p FIRST_PMID -p SECOND_PMID ...
    #[arg(short = 'p', long = "pmid")]
    pub pmid: Vec<u64>,

    /// Title string. May be repeated: -t FIRST_TITLE -t SECOND_TITLE ...
    #[arg(short = 't', long = "title")]
    pub title: Vec<String>,

    /// Output directory or file path. With multiple identifiers this is
    /// always treated as a directory. Defaults to the current directory
    /// with a title-derived filename.
    #[arg(short = 'o', long = "out")]
    pub out: Option<String>,

    /// Mirror base URL. When omitted, one is chosen automatically from
    /// the persisted mirror statistics.
    #[arg(short = 'u', long = "mirror-url")]
    pub mirror_url: Option<String>,

    /// Proxy in the form SCHEME=PROXY_ADDRESS, e.g.
    /// -x http=http://127.0.0.1:7890. Overrides the config file.
    #[arg(short = 'x', long = "proxy")]
    pub proxy: Option<String>,

    /// Path to a file with one DOI per line. Identifiers that fail are
    /// written next to it with a `_failed` suffix for re-running.
    #[arg(short = 'i', long = "input-file")]
    pub input_file: Option<PathBuf>,
}

/// Arguments for the `config` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Show the location of the config file.
    #[arg(short, long)]
    pub location: bool,

    /// Get one config value by section and key: --get SECTION KEY.
    #[arg(short, long, num_args = 2, value_names = ["SECTION", "KEY"])]
    pub get: Option<Vec<String>>,
}
