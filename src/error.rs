//! Error taxonomy for the collection pipeline.
//!
//! Per-item failures (one bad link, one unreadable record) are carried as
//! values and counted by the stage that produced them. Stage-level failures
//! bubble up to `main`, which logs them and exits.
//!
//! A record without recognizable boilerplate is *not* an error: it is the
//! [`Classification::WithoutForm`](crate::classify::Classification) outcome.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("http error {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("response is not an RSS document: {preview}")]
    NotAFeed { preview: String },

    #[error("feed {url} unavailable: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("feed parse error: {0}")]
    FeedParse(#[from] quick_xml::de::DeError),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Network-side failures, as opposed to local disk or data problems.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::Transport { .. } | Self::Status { .. }
        )
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
