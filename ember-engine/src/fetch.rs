//! Remote media retrieval.

use async_trait::async_trait;

use crate::error::{EngineError, Result};

/// Downloads raw media bytes for the cache. Injected so tests can swap in a
/// stub and count downloads.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed fetcher for CDN media.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        log::debug!("[MediaFetcher] fetching {}", uri);
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::TransientNetwork(format!(
                "media download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
