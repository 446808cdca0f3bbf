//! HTTP retrieval for the feed and article pages.
//!
//! The upstream site blocks default client identities, so every request
//! carries a browser `User-Agent`. Each URL gets a single attempt bounded by
//! a fixed timeout; there is no retry.

use crate::error::{PipelineError, Result};
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Anything that can turn a URL into a document body.
///
/// Stages take this instead of a concrete client so tests can serve canned
/// documents. Implementors may write `async fn fetch_text`.
pub trait FetchText {
    /// Retrieve `url` as text.
    ///
    /// # Errors
    ///
    /// Any failure to obtain a 2xx body, as a transport-side
    /// [`PipelineError`] (see [`PipelineError::is_transport`]).
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// `reqwest`-backed [`FetchText`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client that sends `user_agent` on every request and gives up
    /// after `timeout`.
    ///
    /// # Errors
    ///
    /// `PipelineError::Config` if the TLS backend or the header value is
    /// rejected.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl FetchText for HttpFetcher {
    /// GET `url` and decode the body as UTF-8, whatever charset the server
    /// declares. Non-2xx responses are errors.
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|source| PipelineError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let transport = |source: reqwest::Error| PipelineError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(parsed).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        debug!(bytes = bytes.len(), %status, "Fetched document");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
