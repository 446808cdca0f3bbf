//! Small helpers shared across stages: log truncation, file naming, date
//! stamps, and output directory checks.

use crate::dedup::hash_link;
use crate::error::{PipelineError, Result};
use chrono::Local;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Longest slug kept in a record file name, in characters.
const MAX_SLUG_CHARS: usize = 80;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Convert a title to a lowercase, hyphenated slug.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// File name for an article's record: a bounded title slug plus the first
/// eight hex digits of the link hash, so equal titles don't collide.
pub fn record_file_name(title: &str, link: &str) -> String {
    let hash = hash_link(link);
    let slug: String = slugify_title(title)
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("{}.json", &hash[..8])
    } else {
        format!("{}-{}.json", slug, &hash[..8])
    }
}

/// Today's local date as `YYYYMMDD`, the default collection-run identifier.
pub fn today_stamp() -> String {
    Local::now().format("%Y%m%d").to_string()
}

/// Name of the empty file written to check a directory accepts writes.
const WRITE_CHECK_FILE: &str = ".write-check";

/// Ensure a directory exists and accepts new files.
///
/// # Errors
///
/// `PipelineError::Io` when the directory can't be created or a file can't
/// be written into it. A check file that can't be removed afterwards is
/// only logged.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;

    let check = path.join(WRITE_CHECK_FILE);
    fs::write(&check, b"")
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    if let Err(e) = fs::remove_file(&check).await {
        warn!(file = %check.display(), error = %e, "Could not remove write check file");
    }
    info!("Output directory is writable");
    Ok(())
}
