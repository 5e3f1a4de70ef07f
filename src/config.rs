//! Runtime configuration with defaults tuned for the target storefront.
//!
//! Everything that encodes site layout (markers) or pacing policy lives
//! here so a storefront change is a config edit, not a code change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site origin; relative product URLs are resolved against this.
    pub base_url: String,
    pub user_agent: String,
    /// Per-query result cap.
    pub max_results: usize,
    /// Minimum acceptable match score, 0-100.
    pub match_threshold: u8,
    pub fetch: FetchConfig,
    pub pacing: PacingConfig,
    pub challenge: ChallengeConfig,
    pub paths: PathConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.zoro.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_results: 5,
            match_threshold: 50,
            fetch: FetchConfig::default(),
            pacing: PacingConfig::default(),
            challenge: ChallengeConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Search endpoint URL for a query term.
    pub fn search_url(&self, term: &str) -> String {
        format!(
            "{}/search?q={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(term)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Rendering-proxy endpoint. The backend is skipped entirely when no
    /// API key is configured (here or via `FORAGER_RENDER_API_KEY`).
    pub render_endpoint: String,
    pub render_api_key: Option<String>,
    pub render_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub browser_timeout_secs: u64,
    pub browser_headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            render_endpoint: "https://app.scrapingbee.com/api/v1/".to_string(),
            render_api_key: None,
            render_timeout_secs: 25,
            http_timeout_secs: 20,
            browser_timeout_secs: 20,
            browser_headless: false,
            viewport_width: 1366,
            viewport_height: 768,
        }
    }
}

/// Delay bands in seconds. Randomized delays are sampled uniformly from
/// `[min, max]` by the pacer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_query_delay_secs: f64,
    pub max_query_delay_secs: f64,
    /// Idle span after a page load before inspecting content. Inspecting
    /// immediately reliably meets the challenge page.
    pub min_dwell_secs: f64,
    pub max_dwell_secs: f64,
    pub challenge_cooldown_secs: f64,
    pub soft_retry_secs: f64,
    pub min_image_delay_secs: f64,
    pub max_image_delay_secs: f64,
    /// Consecutive zero-result queries that trigger the long cooldown.
    pub failure_cooldown_after: u32,
    pub failure_cooldown_secs: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_query_delay_secs: 4.0,
            max_query_delay_secs: 9.0,
            min_dwell_secs: 8.0,
            max_dwell_secs: 15.0,
            challenge_cooldown_secs: 10.0,
            soft_retry_secs: 3.0,
            min_image_delay_secs: 2.0,
            max_image_delay_secs: 4.0,
            failure_cooldown_after: 3,
            failure_cooldown_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Substrings that identify an anti-bot interstitial, scanned
    /// case-insensitively.
    pub challenge_markers: Vec<String>,
    /// Substrings that identify a real result page, in priority order.
    pub ready_markers: Vec<String>,
    pub max_attempts: u32,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            challenge_markers: vec![
                "data-cfasync".to_string(),
                "__cf_chl_jschl_tk__".to_string(),
            ],
            ready_markers: vec![
                "data-test=\"productCard\"".to_string(),
                "data-test=\"productCardTitle\"".to_string(),
            ],
            max_attempts: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Persistent browser profile directory. Defaults to
    /// `~/.forager/profile`.
    pub profile_dir: Option<PathBuf>,
    pub image_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            profile_dir: None,
            image_dir: PathBuf::from("product_images"),
        }
    }
}

impl PathConfig {
    pub fn resolved_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".forager")
                .join("profile")
        })
    }
}
