//! Command-line interface definitions.
//!
//! Every option can also be given through an environment variable, and any
//! option left unset falls back to the YAML file named by `--config`, then to
//! the built-in defaults (see [`Settings`](crate::config::Settings)).

use crate::batch::TransferPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the news sorter.
///
/// # Examples
///
/// ```sh
/// # Today's run, stage by stage
/// news_sorter collect
/// news_sorter parse
/// news_sorter clean
///
/// # Re-sort an older day, keeping the fetched records
/// news_sorter --date 20250729 clean --policy copy
///
/// # Everything at once, with a config file
/// news_sorter --config ./news.yaml run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "NEWS_SORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory for hash store, metadata and record directories
    #[arg(short, long, global = true, env = "NEWS_SORTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Collection-run identifier (defaults to today's date, YYYYMMDD)
    #[arg(long, global = true, env = "NEWS_SORTER_DATE")]
    pub date: Option<String>,

    /// RSS feed to poll
    #[arg(long, global = true, env = "NEWS_SORTER_FEED_URL")]
    pub feed_url: Option<String>,

    /// User-Agent sent with every request
    #[arg(long, global = true, env = "NEWS_SORTER_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "NEWS_SORTER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Whether routed records leave the input directory
    #[arg(long, value_enum, env = "NEWS_SORTER_POLICY")]
    pub policy: Option<TransferPolicy>,

    /// Only route to with-form when the "In This Article:" section is present too
    #[arg(long, env = "NEWS_SORTER_REQUIRE_SECTION")]
    pub require_section: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current feed items without saving anything
    CheckFeed,
    /// Save feed items not seen in earlier runs
    Collect,
    /// Fetch and extract the articles collected for the date
    Parse,
    /// Sort the date's records into with-form and without-form
    Clean(CleanArgs),
    /// collect, parse and clean in one go
    Run(CleanArgs),
}

impl Command {
    pub fn clean_args(&self) -> Option<&CleanArgs> {
        match self {
            Self::Clean(args) | Self::Run(args) => Some(args),
            _ => None,
        }
    }
}
