//! # News Sorter
//!
//! Collects finance news from an RSS feed, fetches the full articles, and
//! sorts them by whether their page boilerplate could be stripped.
//!
//! ## Usage
//!
//! ```sh
//! news_sorter --data-dir ./data run
//! ```
//!
//! ## Architecture
//!
//! The application is a sequential pipeline over JSON files:
//! 1. **Collecting**: read the feed and keep links not seen before
//!    ([`dedup`], [`scrapers::rss`])
//! 2. **Parsing**: fetch each article and extract its main text
//!    ([`scrapers::article`])
//! 3. **Cleaning**: strip the read-time / comments boilerplate and route each
//!    record to a with-form or without-form directory ([`classify`], [`batch`])

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod batch;
mod classify;
mod cli;
mod config;
mod dedup;
mod error;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::Settings;
use error::Result;
use fetch::HttpFetcher;
use models::RunReport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_sorter starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let outcome = run(args).await;

    let elapsed = start_time.elapsed();
    match outcome {
        Ok(()) => {
            info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, ?elapsed, "Execution failed");
            std::process::ExitCode::FAILURE
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run(args: Cli) -> Result<()> {
    let settings = Settings::resolve(&args.global, args.command.clean_args())?;
    info!(date = %settings.date, data_dir = %settings.data_dir.display(), "Using settings");

    match args.command {
        Command::CheckFeed => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let count = pipeline::check_feed(&settings, &fetcher).await?;
            info!(count, "Feed check complete");
        }
        Command::Collect => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let collected = pipeline::collect(&settings, &fetcher).await?;
            collected.feed_result(&settings.feed_url)?;
        }
        Command::Parse => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            pipeline::parse(&settings, &fetcher).await?;
        }
        Command::Clean(_) => {
            let report = pipeline::clean(&settings).await?;
            println!(
                "[Complete] with-form: {}, without-form: {}, failed: {}",
                report.with_form, report.without_form, report.failed
            );
        }
        Command::Run(_) => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let RunReport {
                collected,
                parsed,
                sorted,
            } = pipeline::run(&settings, &fetcher).await?;
            info!(
                fetched = collected.fetched,
                new = collected.new_count(),
                parsed = parsed.succeeded,
                parse_failed = parsed.failed,
                with_form = sorted.with_form,
                without_form = sorted.without_form,
                clean_failed = sorted.failed,
                "Run complete"
            );
            println!(
                "[Complete] with-form: {}, without-form: {}, failed: {}",
                sorted.with_form,
                sorted.without_form,
                parsed.failed + sorted.failed
            );
            collected.feed_result(&settings.feed_url)?;
        }
    }
    Ok(())
}
