//! Playlist source loading
//!
//! Retrieves raw playlist text for a list of source URLs. All sources of
//! a request are fetched concurrently; results come back in input order
//! (one slot per source), and an individual failure never affects the
//! other sources.

use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::SourceFetchError;
use crate::models::PlaylistSource;

const USER_AGENT: &str = concat!("iptv-aggregator/", env!("CARGO_PKG_VERSION"));

/// Retrieval of one playlist source's raw text
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &PlaylistSource) -> Result<String, SourceFetchError>;
}

/// reqwest-backed source fetcher with a per-fetch timeout
pub struct HttpSourceLoader {
    client: Client,
}

impl HttpSourceLoader {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceLoader {
    async fn fetch(&self, source: &PlaylistSource) -> Result<String, SourceFetchError> {
        let url = source.url.as_str();
        debug!("Fetching playlist source {}", url);

        let response = self
            .client
            .get(source.url.clone())
            .send()
            .await
            .map_err(|error| fetch_error(url, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceFetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|error| fetch_error(url, &error))
    }
}

fn fetch_error(url: &str, error: &reqwest::Error) -> SourceFetchError {
    if error.is_timeout() {
        SourceFetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        SourceFetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Fetch every source concurrently; the result vector lines up with the
/// input by position, so no completion-order reshuffling can occur.
pub async fn fetch_all(
    fetcher: &dyn SourceFetcher,
    sources: &[PlaylistSource],
) -> Vec<Result<String, SourceFetchError>> {
    let results = future::join_all(sources.iter().map(|source| fetcher.fetch(source))).await;
    for (source, result) in sources.iter().zip(&results) {
        if let Err(error) = result {
            warn!("Skipping source {}: {}", source.url, error);
        }
    }
    results
}
