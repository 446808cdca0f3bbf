//! Runtime configuration.
//!
//! Values come from three layers, highest priority first: command-line flags
//! (or their `NEWS_SORTER_*` environment variables), an optional YAML file,
//! and built-in defaults. Every path the pipeline touches is derived from
//! `data_dir` and the collection `date`.
//!
//! ```yaml
//! feed_url: https://finance.yahoo.com/news/rssindex
//! data_dir: /var/lib/news
//! date: "20250729"
//! policy: copy
//! require_section: true
//! ```

use crate::batch::TransferPolicy;
use crate::classify::MarkerPolicy;
use crate::cli::{CleanArgs, GlobalArgs};
use crate::error::{PipelineError, Result};
use crate::fetch::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::utils::today_stamp;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_FEED_URL: &str = "https://finance.yahoo.com/news/rssindex";

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub feed_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub data_dir: PathBuf,
    /// Collection-run identifier, `YYYYMMDD`.
    pub date: String,
    pub policy: TransferPolicy,
    /// Also require the "In This Article:" section for with-form routing.
    pub require_section: bool,
    pub read_time_case_sensitive: bool,
    pub comments_case_sensitive: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let markers = MarkerPolicy::default();
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            data_dir: PathBuf::from("data"),
            date: today_stamp(),
            policy: TransferPolicy::Move,
            require_section: false,
            read_time_case_sensitive: markers.read_time_case_sensitive,
            comments_case_sensitive: markers.comments_case_sensitive,
        }
    }
}

impl Settings {
    /// Parse settings from YAML. Missing keys take their defaults.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Read a YAML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let settings = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    /// Build settings from the YAML file named by `--config` (if any), then
    /// apply flag overrides.
    pub fn resolve(global: &GlobalArgs, clean: Option<&CleanArgs>) -> Result<Self> {
        let mut settings = match &global.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_global(global);
        if let Some(clean) = clean {
            settings.apply_clean(clean);
        }
        settings.validate()?;
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    fn apply_global(&mut self, args: &GlobalArgs) {
        if let Some(v) = &args.feed_url {
            self.feed_url = v.clone();
        }
        if let Some(v) = &args.user_agent {
            self.user_agent = v.clone();
        }
        if let Some(v) = args.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = &args.data_dir {
            self.data_dir = v.clone();
        }
        if let Some(v) = &args.date {
            self.date = v.clone();
        }
    }

    fn apply_clean(&mut self, args: &CleanArgs) {
        if let Some(policy) = args.policy {
            self.policy = policy;
        }
        if args.require_section {
            self.require_section = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.date.is_empty() || !self.date.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(PipelineError::Config(format!(
                "date {:?} must be a non-empty run identifier such as 20250729",
                self.date
            )));
        }
        if self.timeout_secs == 0 {
            return Err(PipelineError::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(PipelineError::Config("user_agent must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn markers(&self) -> MarkerPolicy {
        MarkerPolicy {
            read_time_case_sensitive: self.read_time_case_sensitive,
            comments_case_sensitive: self.comments_case_sensitive,
        }
    }

    pub fn seen_hashes_path(&self) -> PathBuf {
        self.data_dir.join("seen_hashes.json")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(format!("articles_{}.json", self.date))
    }

    pub fn raw_records_dir(&self) -> PathBuf {
        self.data_dir
            .join("parsed-news")
            .join(format!("articles_full_{}", self.date))
    }

    pub fn with_form_dir(&self) -> PathBuf {
        self.data_dir
            .join("with-form")
            .join(format!("articles_cleaned_{}", self.date))
    }

    pub fn without_form_dir(&self) -> PathBuf {
        self.data_dir
            .join("without-form")
            .join(format!("articles_full_{}", self.date))
    }
}
