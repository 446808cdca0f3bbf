//! Link-hash deduplication across collection runs.
//!
//! Every link the collector has ever saved is remembered as the hex SHA-256
//! of the link. The set lives in a JSON array on disk, is loaded at the start
//! of a run, and is rewritten wholesale at the end. Hashes are never removed.
//!
//! Two collection runs must not share a store path at the same time: the
//! file is read-modify-written without locking.

use crate::error::{PipelineError, Result};
use crate::models::FeedItem;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Hex SHA-256 of a link. Always 64 lowercase hex characters.
pub fn hash_link(link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split `items` into the ones not yet in `seen`, in their original order,
/// together with the hashes to add to the store.
///
/// A link repeated within `items` is kept only the first time.
///
/// # Arguments
///
/// * `items` - Feed items in feed order
/// * `seen` - Hashes persisted by earlier runs
///
/// # Returns
///
/// The unseen items and their hashes. Nothing is persisted here; the caller
/// merges the hashes once the items are safely written.
pub fn filter_new(items: &[FeedItem], seen: &BTreeSet<String>) -> (Vec<FeedItem>, BTreeSet<String>) {
    let mut new_items = Vec::new();
    let mut new_hashes = BTreeSet::new();

    for item in items {
        let hash = hash_link(&item.link);
        if seen.contains(&hash) || new_hashes.contains(&hash) {
            continue;
        }
        new_items.push(item.clone());
        new_hashes.insert(hash);
    }

    (new_items, new_hashes)
}

/// The persisted set of seen link hashes.
#[derive(Debug)]
pub struct SeenHashStore {
    path: PathBuf,
    hashes: BTreeSet<String>,
}

impl SeenHashStore {
    /// Load the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// `PipelineError::Io` if the file exists but can't be read, and
    /// `PipelineError::Json` if it isn't a JSON array of strings.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let hashes = match fs::read_to_string(&path).await {
            Ok(raw) => {
                let list: Vec<String> =
                    serde_json::from_str(&raw).map_err(|e| PipelineError::json(&path, e))?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No hash store yet; starting empty");
                BTreeSet::new()
            }
            Err(e) => return Err(PipelineError::io(&path, e)),
        };
        info!(count = hashes.len(), "Loaded seen hashes");
        Ok(Self { path, hashes })
    }

    pub fn hashes(&self) -> &BTreeSet<String> {
        &self.hashes
    }

    pub fn merge(&mut self, new_hashes: BTreeSet<String>) {
        self.hashes.extend(new_hashes);
    }

    /// Rewrite the store file. The new content goes to a sibling temp file
    /// first and is renamed over the old one.
    ///
    /// # Errors
    ///
    /// `PipelineError::Io` or `PipelineError::Json` if the temp file can't be
    /// written or renamed; the previous store file is then left as it was.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }

        let list: Vec<&String> = self.hashes.iter().collect();
        let json = serde_json::to_string_pretty(&list).map_err(|e| PipelineError::json(&self.path, e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| PipelineError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PipelineError::io(&self.path, e))?;

        info!(count = self.hashes.len(), "Saved seen hashes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item(link: &str) -> FeedItem {
        FeedItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            published: "Tue, 29 Jul 2025 12:00:00 GMT".to_string(),
        }
    }

    #[test]
    fn test_hash_link_format() {
        let hash = hash_link("https://finance.yahoo.com/news/a.html");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_link_known_value() {
        assert_eq!(
            hash_link(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_link_is_deterministic_and_distinct() {
        assert_eq!(hash_link("https://a.example"), hash_link("https://a.example"));
        assert_ne!(hash_link("https://a.example"), hash_link("https://b.example"));
    }

    #[test]
    fn test_filter_new_preserves_order() {
        let items = vec![item("https://x/1"), item("https://x/2"), item("https://x/3")];
        let mut seen = BTreeSet::new();
        seen.insert(hash_link("https://x/2"));

        let (new_items, new_hashes) = filter_new(&items, &seen);
        let links: Vec<&str> = new_items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://x/1", "https://x/3"]);
        assert_eq!(new_hashes.len(), 2);
        assert!(!new_hashes.contains(&hash_link("https://x/2")));
    }

    #[test]
    fn test_filter_new_is_idempotent() {
        let items = vec![item("https://x/1"), item("https://x/2")];
        let mut seen = BTreeSet::new();

        let (first, hashes) = filter_new(&items, &seen);
        assert_eq!(first.len(), 2);
        seen.extend(hashes);

        let (second, hashes) = filter_new(&items, &seen);
        assert!(second.is_empty());
        assert!(hashes.is_empty());
    }

    #[test]
    fn test_filter_new_drops_repeats_within_batch() {
        let items = vec![item("https://x/1"), item("https://x/1")];
        let (new_items, new_hashes) = filter_new(&items, &BTreeSet::new());
        assert_eq!(new_items.len(), 1);
        assert_eq!(new_hashes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_store_loads_empty() {
        let dir = tempdir().unwrap();
        let store = SeenHashStore::load(dir.path().join("seen_hashes.json")).await.unwrap();
        assert!(store.hashes().is_empty());
    }

    #[tokio::test]
    async fn test_store_round_trip_keeps_old_hashes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen_hashes.json");

        let mut store = SeenHashStore::load(&path).await.unwrap();
        store.merge(BTreeSet::from([hash_link("https://x/1")]));
        store.save().await.unwrap();

        let mut store = SeenHashStore::load(&path).await.unwrap();
        store.merge(BTreeSet::from([hash_link("https://x/2")]));
        store.save().await.unwrap();

        let store = SeenHashStore::load(&path).await.unwrap();
        assert_eq!(store.hashes().len(), 2);
        assert!(store.hashes().contains(&hash_link("https://x/1")));
        assert!(!path.with_extension("json.tmp").exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let list: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen_hashes.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SeenHashStore::load(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Json { .. }));
    }
}
