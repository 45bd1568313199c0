//! HTTP boundary: raw bytes for a URL.

use async_trait::async_trait;
use bytes::Bytes;
use common::{IngestError, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::PortalConfig;

/// Anything that can turn a URL into raw bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// reqwest-backed fetcher with the configured timeout and user agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &PortalConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

fn map_reqwest_error(url: &Url, err: reqwest::Error) -> IngestError {
    if err.is_timeout() {
        IngestError::Timeout {
            url: url.to_string(),
        }
    } else {
        IngestError::network(url.as_str(), err)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?
            .error_for_status()
            .map_err(|e| map_reqwest_error(url, e))?;

        let bytes = resp.bytes().await.map_err(|e| map_reqwest_error(url, e))?;
        debug!(%url, size = bytes.len(), "downloaded");
        Ok(bytes)
    }
}

/// Runs a fetch that gives up as soon as `cancel` fires.
pub async fn fetch_cancellable(
    fetcher: &dyn Fetcher,
    url: &Url,
    cancel: &CancellationToken,
) -> Result<Bytes> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IngestError::Cancelled { url: url.to_string() }),
        result = fetcher.fetch(url) => result,
    }
}
