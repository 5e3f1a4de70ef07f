//! Direct HTTP GET backend — the cheapest, least capable fallback.
//!
//! No script execution, so it only works when the site serves static
//! result markup. Kept last in the chain as a free attempt.

use crate::config::Config;
use crate::fetch::{FetchError, PageFetcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;
use tracing::warn;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fetch.http_timeout_secs))
            .build()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "non-success status from direct fetch");
            return Ok(None);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(body))
    }
}
