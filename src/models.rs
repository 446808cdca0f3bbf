//! Data models passed between pipeline stages.
//!
//! - [`FeedItem`]: one `<item>` of the RSS feed, as written to the per-date
//!   metadata file
//! - [`ArticleRecord`]: one fetched article, one JSON file on disk
//! - [`CollectReport`], [`ParseReport`], [`BatchReport`]: per-stage summaries,
//!   combined in [`RunReport`]

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A candidate article announced by the feed.
///
/// The `link` is the stable identifier used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedItem {
    /// Headline as published in the feed.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
    /// The feed's `pubDate`, kept verbatim.
    pub published: String,
}

/// A fetched article as persisted under the per-date record directories.
///
/// Records produced by the fetch stage carry no `read_time`; the cleaner
/// adds it and replaces `body` with the stripped slice. Fields this crate
/// does not know about survive a load/save cycle through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub body: String,
    /// Estimated minutes to read, set only on with-form records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    /// Build a fresh record from a feed item and its extracted text.
    pub fn from_item(item: &FeedItem, body: String) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.clone(),
            published: item.published.clone(),
            body,
            read_time: None,
            extra: Map::new(),
        }
    }
}

/// Outcome of one `collect` pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectReport {
    /// Items present in the feed.
    pub fetched: usize,
    /// Items not seen in any earlier run, in feed order.
    pub new_items: Vec<FeedItem>,
    /// Why the feed could not be read. `fetched` is 0 when set.
    pub feed_error: Option<String>,
}

impl CollectReport {
    pub fn new_count(&self) -> usize {
        self.new_items.len()
    }

    /// Turn a failed feed read into a stage error.
    ///
    /// # Errors
    ///
    /// `PipelineError::FeedUnavailable` when `feed_error` is set.
    pub fn feed_result(&self, feed_url: &str) -> Result<()> {
        match &self.feed_error {
            Some(reason) => Err(PipelineError::FeedUnavailable {
                url: feed_url.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Outcome of one `parse` pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Outcome of one `clean` pass.
///
/// `with_form + without_form + failed` equals the number of JSON files found
/// in the input directory. `failed` files are left in the input directory; a
/// with-form record whose source could not be deleted under the move policy
/// counts as `with_form`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub with_form: usize,
    pub without_form: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.with_form + self.without_form + self.failed
    }
}

/// Outcome of a full collect, parse and clean run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub collected: CollectReport,
    pub parsed: ParseReport,
    pub sorted: BatchReport,
}
