//! Article page fetching and main-text extraction.
//!
//! Yahoo Finance wraps the story in one of a couple of known containers.
//! [`extract_main_text`] tries them in order and falls back to the visible
//! text of the whole page. The fallback keeps headers and footers, which the
//! cleaner later strips (or rejects).

use crate::error::Result;
use crate::fetch::FetchText;
use crate::models::{ArticleRecord, FeedItem};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, error, info, instrument};

/// Content containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &["div.caas-body", "div.article-body"];

/// Elements whose text never renders.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

static CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

/// Best-effort main text of an HTML document.
///
/// Text nodes are trimmed, empty ones dropped, and the rest joined with
/// newlines.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for (selector, name) in CANDIDATES.iter().zip(CONTENT_SELECTORS) {
        if let Some(container) = document.select(selector).next() {
            debug!(selector = *name, "Matched content container");
            return visible_text(container);
        }
    }

    debug!("No content container; using whole document");
    visible_text(document.root_element())
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let line = text.trim();
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Fetch one article and build its record.
#[instrument(level = "info", skip_all, fields(url = %item.link))]
pub async fn fetch_article<F: FetchText>(fetcher: &F, item: &FeedItem) -> Result<ArticleRecord> {
    let html = fetcher.fetch_text(&item.link).await?;
    let body = extract_main_text(&html);
    debug!(chars = body.chars().count(), "Extracted article text");
    Ok(ArticleRecord::from_item(item, body))
}

/// Fetch every item one after another.
///
/// A failed item is logged with its title and left out; the rest still run.
/// Returns the records plus the number of failures.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn fetch_articles<F: FetchText>(fetcher: &F, items: &[FeedItem]) -> (Vec<ArticleRecord>, usize) {
    let results: Vec<Option<ArticleRecord>> = stream::iter(items)
        .then(|item| async move {
            match fetch_article(fetcher, item).await {
                Ok(record) => {
                    info!(title = %item.title, "Fetched article");
                    Some(record)
                }
                Err(e) => {
                    error!(title = %item.title, url = %item.link, error = %e, "Article fetch failed");
                    None
                }
            }
        })
        .collect()
        .await;

    let failed = results.iter().filter(|r| r.is_none()).count();
    let records: Vec<ArticleRecord> = results.into_iter().flatten().collect();
    info!(fetched = records.len(), failed, "Fetched article contents");
    (records, failed)
}
