//! JSON persistence for feed metadata and article records.
//!
//! All files are pretty-printed UTF-8 JSON:
//!
//! ```text
//! data/
//! ├── seen_hashes.json                          # see crate::dedup
//! ├── articles_20250729.json                    # [FeedItem]
//! ├── parsed-news/articles_full_20250729/*.json # ArticleRecord
//! ├── with-form/articles_cleaned_20250729/
//! └── without-form/articles_full_20250729/
//! ```

use crate::error::{PipelineError, Result};
use crate::models::{ArticleRecord, FeedItem};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PipelineError::json(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, json)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| PipelineError::json(path, e))
}

/// Write the run's new feed items as one JSON array.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_metadata(path: &Path, items: &[FeedItem]) -> Result<()> {
    write_pretty(path, items).await?;
    info!(count = items.len(), "Saved article metadata");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_metadata(path: &Path) -> Result<Vec<FeedItem>> {
    read_json(path).await
}

pub async fn write_record(path: &Path, record: &ArticleRecord) -> Result<()> {
    write_pretty(path, record).await
}

pub async fn read_record(path: &Path) -> Result<ArticleRecord> {
    read_json(path).await
}
