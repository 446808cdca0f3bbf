//! RSS feed reader.
//!
//! Fetches the feed and turns every `<item>` into a [`FeedItem`] using its
//! `title`, `link` and `pubDate` children, in document order.
//!
//! ```xml
//! <rss version="2.0">
//!   <channel>
//!     <item>
//!       <title>Stocks rally as ...</title>
//!       <link>https://finance.yahoo.com/news/stocks-rally-123.html</link>
//!       <pubDate>Tue, 29 Jul 2025 12:00:00 GMT</pubDate>
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::error::{PipelineError, Result};
use crate::fetch::FetchText;
use crate::models::FeedItem;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse a feed document.
///
/// Items without a `link` can't be deduplicated or fetched and are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let trimmed = xml.trim_start();
    if !trimmed.starts_with("<?xml") && !xml.contains("<rss") {
        return Err(PipelineError::NotAFeed {
            preview: truncate_for_log(trimmed, 200),
        });
    }

    let rss: Rss = quick_xml::de::from_str(xml)?;

    let mut items = Vec::with_capacity(rss.channel.items.len());
    for raw in rss.channel.items {
        let link = raw.link.map(|l| l.trim().to_string()).unwrap_or_default();
        if link.is_empty() {
            warn!(title = ?raw.title, "Feed item has no link; skipping");
            continue;
        }
        items.push(FeedItem {
            title: raw.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            link,
            published: raw.pub_date.map(|p| p.trim().to_string()).unwrap_or_default(),
        });
    }
    Ok(items)
}

/// Fetch and parse the feed at `feed_url`.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_feed<F: FetchText>(fetcher: &F, feed_url: &str) -> Result<Vec<FeedItem>> {
    let xml = fetcher.fetch_text(feed_url).await?;
    let items = parse_feed(&xml)?;
    info!(count = items.len(), "Read feed items");
    Ok(items)
}

/// Like [`fetch_feed`], but a failed read still yields a (empty) item list.
///
/// The error comes back alongside so the caller can report it; callers that
/// persist state use this so an unreachable feed leaves the store untouched.
///
/// # Returns
///
/// The feed items, plus the transport or parse error when the read failed.
pub async fn read_items<F: FetchText>(
    fetcher: &F,
    feed_url: &str,
) -> (Vec<FeedItem>, Option<PipelineError>) {
    match fetch_feed(fetcher, feed_url).await {
        Ok(items) => (items, None),
        Err(e) => {
            if e.is_transport() {
                error!(error = %e, %feed_url, "Feed request failed");
            } else {
                error!(error = %e, %feed_url, "Feed could not be parsed");
            }
            (Vec::new(), Some(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Yahoo Finance</title>
    <link>https://finance.yahoo.com/</link>
    <description>Latest News and Updates</description>
    <item>
      <title>Stocks rally &amp; bonds slip</title>
      <link>https://finance.yahoo.com/news/stocks-rally-1.html</link>
      <pubDate>Tue, 29 Jul 2025 12:00:00 GMT</pubDate>
      <source url="https://www.reuters.com/">Reuters</source>
      <guid isPermaLink="false">stocks-rally-1</guid>
      <media:content url="https://s.yimg.com/a.jpg" width="130" height="86"/>
    </item>
    <item>
      <title><![CDATA[Fed holds rates]]></title>
      <link>https://finance.yahoo.com/news/fed-holds-2.html</link>
      <pubDate>Tue, 29 Jul 2025 11:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_in_document_order() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Stocks rally & bonds slip");
        assert_eq!(items[0].link, "https://finance.yahoo.com/news/stocks-rally-1.html");
        assert_eq!(items[0].published, "Tue, 29 Jul 2025 12:00:00 GMT");
        assert_eq!(items[1].title, "Fed holds rates");
    }

    #[test]
    fn test_parse_feed_without_items() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title></channel></rss>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_item_without_link_is_dropped() {
        let xml = r#"<rss version="2.0"><channel>
            <item><title>No link</title></item>
            <item><title>Has link</title><link>https://example.com/a</link></item>
        </channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Has link");
        assert_eq!(items[0].published, "");
    }

    #[test]
    fn test_html_response_is_not_a_feed() {
        let err = parse_feed("<html><body>Access denied</body></html>").unwrap_err();
        assert!(matches!(err, PipelineError::NotAFeed { .. }));
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let err = parse_feed(r#"<?xml version="1.0"?><rss><channel><item>"#).unwrap_err();
        assert!(matches!(err, PipelineError::FeedParse(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_uses_fetcher() {
        let fetcher = StubFetcher::new().with("https://feed.example/rss", FEED);
        let items = fetch_feed(&fetcher, "https://feed.example/rss").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_read_items_reports_failures() {
        let fetcher = StubFetcher::new()
            .with("https://feed.example/html", "<html></html>")
            .with("https://feed.example/rss", FEED);

        let (items, err) = read_items(&fetcher, "https://feed.example/missing").await;
        assert!(items.is_empty());
        assert!(matches!(err, Some(PipelineError::Status { .. })));

        let (items, err) = read_items(&fetcher, "https://feed.example/html").await;
        assert!(items.is_empty());
        assert!(matches!(err, Some(PipelineError::NotAFeed { .. })));

        let (items, err) = read_items(&fetcher, "https://feed.example/rss").await;
        assert_eq!(items.len(), 2);
        assert!(err.is_none());
    }
}
