//! Page retrieval via an ordered chain of fallback backends.
//!
//! Each backend implements the same capability interface and the chain
//! tries them in fixed priority order until one yields non-empty content.
//! Ordering encodes a cost/reliability tradeoff: the most bypass-capable,
//! rate-limited backend first, the cheapest last as a free fallback.

pub mod browser;
pub mod challenge;
pub mod http;
pub mod render_api;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure taxonomy for a single fetch attempt. Every variant is
/// recoverable: the chain logs it and falls through to the next backend.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("challenge page persisted after {attempts} attempts")]
    Challenged { attempts: u32 },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// A single page-retrieval backend.
///
/// `Ok(None)` means "no content": a legitimate soft failure, not an
/// error. Backends own their timeouts; nothing here blocks forever.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError>;
}

/// Ordered list of backends tried until one returns non-empty content.
pub struct FetchChain {
    backends: Vec<Arc<dyn PageFetcher>>,
}

impl FetchChain {
    pub fn new(backends: Vec<Arc<dyn PageFetcher>>) -> Self {
        Self { backends }
    }

    /// Retrieve a page, falling through backends in priority order.
    ///
    /// Only emptiness is checked here, never authenticity. A
    /// backend later in the list is never consulted once an earlier one
    /// has produced content. `None` means every backend came up empty;
    /// callers treat that as a soft failure for the query, not a fatal
    /// condition for the run.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        for backend in &self.backends {
            match backend.fetch(url).await {
                Ok(Some(html)) if !html.trim().is_empty() => {
                    debug!(
                        backend = backend.name(),
                        url,
                        bytes = html.len(),
                        "backend returned content"
                    );
                    return Some(html);
                }
                Ok(_) => {
                    warn!(backend = backend.name(), url, "no content, falling through");
                }
                Err(e) => {
                    warn!(backend = backend.name(), url, error = %e, "backend failed, falling through");
                }
            }
        }
        warn!(url, "all fetch backends exhausted");
        None
    }
}
