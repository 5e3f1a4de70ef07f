//! Rendering-proxy backend — a hosted browser-rendering HTTP API.
//!
//! Sits first in the chain: the most bypass-capable and the most
//! rate-limited option. The proxy executes page scripts server-side and
//! returns the rendered markup. Only constructed when an API key is
//! configured; without one the chain simply does not include it.

use crate::config::Config;
use crate::fetch::{FetchError, PageFetcher};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub struct RenderApiFetcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RenderApiFetcher {
    /// Build the backend if an API key is available, checking the config
    /// first and the `FORAGER_RENDER_API_KEY` environment variable second.
    pub fn from_config(config: &Config) -> Result<Option<Self>, FetchError> {
        let api_key = config
            .fetch
            .render_api_key
            .clone()
            .or_else(|| std::env::var("FORAGER_RENDER_API_KEY").ok());
        let Some(api_key) = api_key else {
            return Ok(None);
        };
        Ok(Some(Self::new(
            config.fetch.render_endpoint.clone(),
            api_key,
            Duration::from_secs(config.fetch.render_timeout_secs),
        )?))
    }

    pub fn new(
        endpoint: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl PageFetcher for RenderApiFetcher {
    fn name(&self) -> &'static str {
        "render-api"
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("url", url),
                ("render_js", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "render api rejected request");
            return Ok(None);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            warn!(url, "render api returned empty body");
            return Ok(None);
        }
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> RenderApiFetcher {
        RenderApiFetcher::new(
            server.uri(),
            "test-key".to_string(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn test_forwards_target_url_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("url", "https://example.com/search?q=bolt"))
            .and(query_param("render_js", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rendered</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let html = fetcher_for(&server)
            .fetch("https://example.com/search?q=bolt")
            .await
            .expect("fetch");
        assert_eq!(html.as_deref(), Some("<html>rendered</html>"));
    }

    #[tokio::test]
    async fn test_quota_error_is_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let html = fetcher_for(&server)
            .fetch("https://example.com")
            .await
            .expect("fetch");
        assert!(html.is_none());
    }

    #[tokio::test]
    async fn test_disabled_without_api_key() {
        let config = Config::default();
        // Default config carries no key; the env var is absent in tests.
        if std::env::var("FORAGER_RENDER_API_KEY").is_err() {
            let backend = RenderApiFetcher::from_config(&config).expect("build");
            assert!(backend.is_none());
        }
    }
}
