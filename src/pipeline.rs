//! The collection stages, wired to their inputs and outputs on disk.
//!
//! 1. **collect**: read the feed, drop links seen in earlier runs, append the
//!    rest to the day's metadata file and remember their hashes
//! 2. **parse**: fetch every article in the day's metadata file and write one
//!    record per article
//! 3. **clean**: classify the day's records into with-form / without-form
//!
//! [`run`] chains the three, handing only newly collected items to the fetch
//! step.
//!
//! Each stage returns `Err` only when it cannot run at all. Individual items
//! that fail are logged and counted in the stage's report.

use crate::batch::{BatchOptions, run_batch};
use crate::classify::Classifier;
use crate::config::Settings;
use crate::dedup::{SeenHashStore, filter_new};
use crate::error::Result;
use crate::fetch::FetchText;
use crate::models::{BatchReport, CollectReport, FeedItem, ParseReport, RunReport};
use crate::outputs::json::{read_metadata, write_metadata, write_record};
use crate::scrapers::{article, rss};
use crate::utils::{ensure_writable_dir, record_file_name};
use tracing::{error, info, instrument};

/// Print items the way the collector lists them on the console.
pub fn print_items(items: &[FeedItem]) {
    for item in items {
        println!("Title: {}", item.title);
        println!("Link: {}", item.link);
        println!("Published: {}", item.published);
        println!("{}", "-".repeat(80));
    }
}

/// Read the feed and list it without persisting anything.
#[instrument(level = "info", skip_all, fields(feed_url = %settings.feed_url))]
pub async fn check_feed<F: FetchText>(settings: &Settings, fetcher: &F) -> Result<usize> {
    let items = rss::fetch_feed(fetcher, &settings.feed_url).await?;
    print_items(&items);
    Ok(items.len())
}

/// Collect new feed items for `settings.date`.
///
/// The metadata file is written before the hash store, so a failed write
/// never marks items as seen.
///
/// # Returns
///
/// The feed size, the items not seen before, and the feed error if the feed
/// could not be read. A failed feed read leaves every file untouched.
///
/// # Errors
///
/// Only when the hash store or the metadata file can't be read or written.
#[instrument(level = "info", skip_all, fields(date = %settings.date))]
pub async fn collect<F: FetchText>(settings: &Settings, fetcher: &F) -> Result<CollectReport> {
    let mut store = SeenHashStore::load(settings.seen_hashes_path()).await?;

    let (items, feed_error) = rss::read_items(fetcher, &settings.feed_url).await;
    let mut report = CollectReport {
        fetched: items.len(),
        feed_error: feed_error.map(|e| e.to_string()),
        ..Default::default()
    };
    if items.is_empty() {
        info!("No articles found or RSS fetch failed");
        return Ok(report);
    }

    let (new_items, new_hashes) = filter_new(&items, store.hashes());
    if new_items.is_empty() {
        info!(fetched = report.fetched, "No new articles to save");
        return Ok(report);
    }
    print_items(&new_items);

    // A second run on the same date adds to that date's file.
    let path = settings.metadata_path();
    let mut saved = if path.exists() {
        read_metadata(&path).await?
    } else {
        Vec::new()
    };
    saved.extend(new_items.iter().cloned());
    write_metadata(&path, &saved).await?;

    store.merge(new_hashes);
    store.save().await?;

    report.new_items = new_items;
    info!(fetched = report.fetched, new = report.new_count(), "Collection complete");
    Ok(report)
}

/// Fetch and extract every article listed for `settings.date`.
#[instrument(level = "info", skip_all, fields(date = %settings.date))]
pub async fn parse<F: FetchText>(settings: &Settings, fetcher: &F) -> Result<ParseReport> {
    let items = read_metadata(&settings.metadata_path()).await?;
    parse_items(settings, fetcher, &items).await
}

/// Fetch and extract `items`, writing one record per article into the
/// date's raw record directory.
///
/// # Errors
///
/// Only when the record directory can't be created or written to; failed
/// articles are counted in the report.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn parse_items<F: FetchText>(
    settings: &Settings,
    fetcher: &F,
    items: &[FeedItem],
) -> Result<ParseReport> {
    let out_dir = settings.raw_records_dir();
    ensure_writable_dir(&out_dir).await?;

    let (records, fetch_failed) = article::fetch_articles(fetcher, items).await;
    let mut report = ParseReport {
        succeeded: 0,
        failed: fetch_failed,
    };

    for record in records {
        let path = out_dir.join(record_file_name(&record.title, &record.link));
        match write_record(&path, &record).await {
            Ok(()) => {
                info!(title = %record.title, "Saved article record");
                report.succeeded += 1;
            }
            Err(e) => {
                error!(title = %record.title, error = %e, "Could not save article record");
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        dir = %out_dir.display(),
        "Parsed articles"
    );
    Ok(report)
}

/// Classify the records fetched for `settings.date`.
#[instrument(level = "info", skip_all, fields(date = %settings.date))]
pub async fn clean(settings: &Settings) -> Result<BatchReport> {
    let options = BatchOptions {
        classifier: Classifier::new(settings.markers()),
        policy: settings.policy,
        require_section: settings.require_section,
    };
    run_batch(
        &settings.raw_records_dir(),
        &settings.with_form_dir(),
        &settings.without_form_dir(),
        &options,
    )
    .await
}

/// Collect, then fetch and classify only what this collection found new.
///
/// Stops after collecting when the feed yields nothing new, so links seen in
/// earlier runs are never fetched again.
#[instrument(level = "info", skip_all, fields(date = %settings.date))]
pub async fn run<F: FetchText>(settings: &Settings, fetcher: &F) -> Result<RunReport> {
    let collected = collect(settings, fetcher).await?;
    if collected.new_items.is_empty() {
        info!("Nothing new collected; stopping");
        return Ok(RunReport {
            collected,
            ..Default::default()
        });
    }

    let parsed = parse_items(settings, fetcher, &collected.new_items).await?;
    let sorted = clean(settings).await?;
    Ok(RunReport {
        collected,
        parsed,
        sorted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TransferPolicy;
    use crate::dedup::hash_link;
    use crate::fetch::testing::StubFetcher;
    use crate::models::ArticleRecord;
    use tempfile::tempdir;

    const FEED_URL: &str = "https://feed.example/rss";

    fn feed(links: &[&str]) -> String {
        let items: String = links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                format!(
                    "<item><title>Story {i}</title><link>{link}</link><pubDate>Tue, 29 Jul 2025 1{i}:00:00 GMT</pubDate></item>"
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>{items}</channel></rss>"#)
    }

    fn page(body: &str) -> String {
        format!(r#"<html><body><nav>Menu</nav><div class="caas-body">{body}</div></body></html>"#)
    }

    fn settings(data_dir: &std::path::Path) -> Settings {
        Settings {
            feed_url: FEED_URL.to_string(),
            data_dir: data_dir.to_path_buf(),
            date: "20250729".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_twice_saves_only_new_items() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let fetcher = StubFetcher::new().with(FEED_URL, &feed(&["https://x/1", "https://x/2"]));
        let report = collect(&settings, &fetcher).await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.new_count(), 2);

        let fetcher = StubFetcher::new().with(FEED_URL, &feed(&["https://x/3", "https://x/2"]));
        let report = collect(&settings, &fetcher).await.unwrap();
        assert_eq!(report.fetched, 2);
        let new: Vec<&str> = report.new_items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(new, vec!["https://x/3"]);
        assert!(report.feed_error.is_none());

        let saved = read_metadata(&settings.metadata_path()).await.unwrap();
        let links: Vec<&str> = saved.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://x/1", "https://x/2", "https://x/3"]);

        let store = SeenHashStore::load(settings.seen_hashes_path()).await.unwrap();
        assert_eq!(store.hashes().len(), 3);
        assert!(store.hashes().contains(&hash_link("https://x/3")));
    }

    #[tokio::test]
    async fn test_collect_with_unreachable_feed_keeps_state() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let fetcher = StubFetcher::new().with(FEED_URL, &feed(&["https://x/1"]));
        collect(&settings, &fetcher).await.unwrap();
        let before = std::fs::read_to_string(settings.seen_hashes_path()).unwrap();

        let report = collect(&settings, &StubFetcher::new()).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert!(report.new_items.is_empty());
        let reason = report.feed_error.as_deref().unwrap();
        assert!(reason.contains("404"));
        assert!(report.feed_result(FEED_URL).is_err());
        let after = std::fs::read_to_string(settings.seen_hashes_path()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_collect_nothing_new_writes_nothing() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let fetcher = StubFetcher::new().with(FEED_URL, &feed(&[]));

        let report = collect(&settings, &fetcher).await.unwrap();
        assert_eq!(report.new_count(), 0);
        assert!(report.feed_error.is_none());
        assert!(!settings.metadata_path().exists());
        assert!(!settings.seen_hashes_path().exists());
    }

    #[tokio::test]
    async fn test_parse_writes_one_record_per_article() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let fetcher = StubFetcher::new()
            .with(FEED_URL, &feed(&["https://x/1", "https://x/2"]))
            .with("https://x/1", &page("<p>2 min read</p><p>Text one</p><p>View Comments</p>"));
        collect(&settings, &fetcher).await.unwrap();

        let report = parse(&settings, &fetcher).await.unwrap();
        assert_eq!(report, ParseReport { succeeded: 1, failed: 1 });

        let path = settings
            .raw_records_dir()
            .join(record_file_name("Story 0", "https://x/1"));
        let record: ArticleRecord =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(record.link, "https://x/1");
        assert_eq!(record.body, "2 min read\nText one\nView Comments");
        assert_eq!(record.read_time, None);
    }

    #[tokio::test]
    async fn test_parse_without_metadata_fails() {
        let dir = tempdir().unwrap();
        let err = parse(&settings(dir.path()), &StubFetcher::new()).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_full_pipeline_routes_records() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            policy: TransferPolicy::Move,
            ..settings(dir.path())
        };

        let fetcher = StubFetcher::new()
            .with(FEED_URL, &feed(&["https://x/1", "https://x/2"]))
            .with("https://x/1", &page("<p>5 min read</p><p>Markets rose.</p><p>View Comments</p>"))
            .with("https://x/2", &page("<p>Video only</p>"));

        collect(&settings, &fetcher).await.unwrap();
        parse(&settings, &fetcher).await.unwrap();
        let report = clean(&settings).await.unwrap();

        assert_eq!(report, BatchReport { with_form: 1, without_form: 1, failed: 0 });

        let cleaned = settings
            .with_form_dir()
            .join(record_file_name("Story 0", "https://x/1"));
        let record: ArticleRecord =
            serde_json::from_str(&std::fs::read_to_string(cleaned).unwrap()).unwrap();
        assert_eq!(record.body, "Markets rose.");
        assert_eq!(record.read_time, Some(5));

        assert!(settings
            .without_form_dir()
            .join(record_file_name("Story 1", "https://x/2"))
            .exists());
        assert_eq!(std::fs::read_dir(settings.raw_records_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_twice_fetches_each_article_once() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            policy: TransferPolicy::Copy,
            ..settings(dir.path())
        };
        let fetcher = StubFetcher::new()
            .with(FEED_URL, &feed(&["https://x/1"]))
            .with("https://x/1", &page("<p>3 min read</p><p>Body</p><p>View Comments</p>"));

        let first = run(&settings, &fetcher).await.unwrap();
        assert_eq!(first.collected.new_count(), 1);
        assert_eq!(first.parsed, ParseReport { succeeded: 1, failed: 0 });
        assert_eq!(first.sorted, BatchReport { with_form: 1, without_form: 0, failed: 0 });

        let second = run(&settings, &fetcher).await.unwrap();
        assert_eq!(second.collected.fetched, 1);
        assert_eq!(second.collected.new_count(), 0);
        assert_eq!(second.parsed, ParseReport::default());
        assert_eq!(second.sorted, BatchReport::default());

        assert_eq!(fetcher.requests(FEED_URL), 2);
        assert_eq!(fetcher.requests("https://x/1"), 1);
        assert_eq!(std::fs::read_dir(settings.without_form_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_only_fetches_new_items() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let fetcher = StubFetcher::new()
            .with(FEED_URL, &feed(&["https://x/1"]))
            .with("https://x/1", &page("<p>Video only</p>"));
        run(&settings, &fetcher).await.unwrap();

        let fetcher = StubFetcher::new()
            .with(FEED_URL, &feed(&["https://x/2", "https://x/1"]))
            .with("https://x/1", &page("<p>Video only</p>"))
            .with("https://x/2", &page("<p>1 min read</p><p>Short</p><p>View Comments</p>"));
        let report = run(&settings, &fetcher).await.unwrap();

        assert_eq!(report.collected.new_count(), 1);
        assert_eq!(fetcher.requests("https://x/1"), 0);
        assert_eq!(fetcher.requests("https://x/2"), 1);
        assert_eq!(report.sorted, BatchReport { with_form: 1, without_form: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_run_with_unreachable_feed_reports_it() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());

        let report = run(&settings, &StubFetcher::new()).await.unwrap();
        assert!(report.collected.feed_error.is_some());
        assert_eq!(report.parsed, ParseReport::default());
        assert!(!settings.metadata_path().exists());
        assert!(!settings.seen_hashes_path().exists());
    }
}
