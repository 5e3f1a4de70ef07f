//! Idempotent image persistence keyed by a deterministic filename.
//!
//! Re-invocation with an existing target is a no-op; any failure returns
//! an empty path and never aborts the run.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ImageStore {
    dir: PathBuf,
    client: reqwest::Client,
}

impl ImageStore {
    pub fn new(dir: PathBuf, timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()?;
        Ok(Self { dir, client })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Fetch and persist an image once.
    ///
    /// Returns the saved path, or an empty string when there is nothing to
    /// fetch or the fetch/write fails. An already-present target file is
    /// returned immediately without touching the network.
    pub async fn download(&self, image_url: &str, base_name: &str) -> String {
        if image_url.is_empty() {
            return String::new();
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "cannot create image directory");
            return String::new();
        }

        let path = self.dir.join(format!("{base_name}.jpg"));
        if path.exists() {
            debug!(path = %path.display(), "image already present, skipping fetch");
            return path.display().to_string();
        }

        let bytes = match self.fetch_bytes(image_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(image_url, error = %e, "image fetch failed");
                return String::new();
            }
        };

        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => path.display().to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "image write failed");
                // Never leave a partial file behind to satisfy the
                // exists-check on a later run.
                let _ = tokio::fs::remove_file(&path).await;
                String::new()
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
