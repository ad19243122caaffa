//! PostgREST-style catalog source.
//!
//! Issues `GET {base}/rest/v1/{table}?select=*&order=name.asc` with the
//! anonymous key in both the `apikey` and `Authorization: Bearer` headers.
//! Ordering is delegated to the remote service and never re-sorted here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::{debug, warn};

use super::{decode_rows, RemoteCatalogSource, RemoteFetchError};
use crate::config::RecipeSyncConfig;
use crate::recipe::CatalogSnapshot;

/// Error bodies are truncated to this many bytes in [`RemoteFetchError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct RestCatalogSource {
    client: reqwest::Client,
    endpoint: String,
}

impl RestCatalogSource {
    /// # Errors
    ///
    /// [`RemoteFetchError::InvalidConfig`] if the key is not a valid header
    /// value or the HTTP client fails to build.
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteFetchError> {
        let base = base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(RemoteFetchError::InvalidConfig("remote_url is empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|e| RemoteFetchError::InvalidConfig(format!("Invalid API key: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| RemoteFetchError::InvalidConfig(format!("Invalid API key: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteFetchError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{base}/rest/v1/{table}"),
        })
    }

    /// Build from config; `remote_url` and `api_key` are required.
    pub fn from_config(config: &RecipeSyncConfig) -> Result<Self, RemoteFetchError> {
        let base_url = config
            .remote_url
            .as_deref()
            .ok_or_else(|| RemoteFetchError::InvalidConfig("remote_url is not set".into()))?;
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| RemoteFetchError::InvalidConfig("api_key is not set".into()))?;
        Self::new(base_url, api_key, &config.catalog_table, config.request_timeout())
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteCatalogSource for RestCatalogSource {
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_all(&self) -> Result<CatalogSnapshot, RemoteFetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "name.asc")])
            .send()
            .await
            .map_err(|e| RemoteFetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!(status = status.as_u16(), "Catalog fetch rejected");
            return Err(RemoteFetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteFetchError::Transport(e.to_string()))?;
        let recipes = decode_rows(&bytes)?;
        debug!(rows = recipes.len(), bytes = bytes.len(), "Catalog rows decoded");

        Ok(CatalogSnapshot::fresh(recipes))
    }
}
