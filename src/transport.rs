//! Outbound JSON transport
//!
//! The handshake endpoints only ever need one capability: POST a JSON body
//! and get a decoded JSON response back. `ApiClient` is that seam; the
//! default implementation rides on `reqwest`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Minimal JSON POST capability used by the handshake endpoints
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// POST `body` as JSON to `url` and return the decoded JSON response
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the response status is not
    /// successful, or the body is not valid JSON.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}

/// `reqwest`-backed client for real deployments
pub struct HttpApiClient {
    client: reqwest::Client,
}

impl HttpApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        log::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("{url} returned status {}", response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("invalid JSON response from {url}"))
    }
}
