//! Network-facing stages of the pipeline.
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Feed Reader | [`rss`] | feed URL | `Vec<FeedItem>` |
//! | Article Fetcher + Body Extractor | [`article`] | `FeedItem` | `ArticleRecord` |
//!
//! Both take a [`FetchText`](crate::fetch::FetchText) so they run against a
//! real HTTP client in production and canned pages in tests. Items are
//! processed strictly one at a time, and a failed item is logged and skipped
//! without failing the rest.

pub mod article;
pub mod rss;
