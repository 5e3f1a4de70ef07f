//! Headless-browser backend with challenge-aware retry.
//!
//! Keeps one persistent Chromium session (profile directory on disk) for
//! the whole run: acquire once, reuse, shut down explicitly. A mutex
//! serializes fetches, since concurrent sessions against a persistent
//! profile corrupt shared state, and the challenge detector bounds the
//! retry loop per fetch.

use crate::config::Config;
use crate::fetch::challenge::{ChallengeDetector, NavAction, Observation};
use crate::fetch::{FetchError, PageFetcher};
use crate::pipeline::pacing::Pacer;
use crate::stealth;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, ReloadParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

pub struct BrowserFetcher {
    config: Config,
    pacer: Arc<Pacer>,
    session: tokio::sync::Mutex<Option<BrowserSession>>,
}

impl BrowserFetcher {
    pub fn new(config: Config, pacer: Arc<Pacer>) -> Self {
        Self {
            config,
            pacer,
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Close the persistent browser session if one was started.
    pub async fn shutdown(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            if let Err(e) = session.browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            let _ = session.browser.wait().await;
            session.handler_task.abort();
            debug!("browser session closed");
        }
    }

    async fn launch(&self) -> Result<BrowserSession, FetchError> {
        let profile_dir = self.config.paths.resolved_profile_dir();
        std::fs::create_dir_all(&profile_dir).map_err(|e| {
            FetchError::Unavailable(format!(
                "cannot create profile dir {}: {e}",
                profile_dir.display()
            ))
        })?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .window_size(
                self.config.fetch.viewport_width,
                self.config.fetch.viewport_height,
            )
            .args(stealth::launch_args())
            .arg(format!("--user-agent={}", self.config.user_agent))
            .request_timeout(Duration::from_secs(self.config.fetch.browser_timeout_secs));
        if !self.config.fetch.browser_headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(FetchError::Unavailable)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;

        // Stealth patching is best-effort; a failure only means a more
        // detectable session, not an unusable one.
        match AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(stealth::fingerprint::stealth_script())
            .build()
        {
            Ok(params) => {
                if let Err(e) = page.execute(params).await {
                    warn!(error = %e, "stealth script injection failed");
                }
            }
            Err(e) => warn!(error = %e, "stealth script params invalid"),
        }

        info!(profile = %profile_dir.display(), "browser session started");
        Ok(BrowserSession {
            browser,
            page,
            handler_task,
        })
    }

    async fn navigate(&self, page: &Page, action: NavAction, url: &str) -> bool {
        let timeout = Duration::from_secs(self.config.fetch.browser_timeout_secs);
        let result = match action {
            NavAction::Navigate => tokio::time::timeout(timeout, page.goto(url))
                .await
                .map(|r| r.map(|_| ())),
            NavAction::Reload => {
                tokio::time::timeout(timeout, page.execute(ReloadParams::default()))
                    .await
                    .map(|r| r.map(|_| ()))
            }
        };
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(url, error = %e, "navigation failed");
                false
            }
            Err(_) => {
                warn!(url, "navigation timed out");
                false
            }
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        // Holding the lock for the whole fetch keeps the persistent
        // profile single-writer.
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let session = guard.as_mut().expect("session just ensured");

        let mut detector = ChallengeDetector::new(self.config.challenge.clone());
        loop {
            let action = detector.begin_attempt();
            let navigated = self.navigate(&session.page, action, url).await;

            // Idle like a human before looking at the page; inspecting
            // immediately reliably meets the challenge page.
            self.pacer.dwell().await;

            let html = if navigated {
                match session.page.content().await {
                    Ok(html) => Some(html),
                    Err(e) => {
                        warn!(url, error = %e, "content capture failed");
                        None
                    }
                }
            } else {
                None
            };

            match detector.observe(html) {
                Observation::Ready(html) => {
                    debug!(url, attempts = detector.attempts(), "result page ready");
                    return Ok(Some(html));
                }
                Observation::Challenged => {
                    info!(
                        url,
                        attempt = detector.attempts(),
                        "challenge detected, cooling down"
                    );
                    self.pacer.challenge_cooldown().await;
                }
                Observation::Continue => {
                    self.pacer.soft_pause().await;
                }
                Observation::Exhausted(last) => {
                    warn!(
                        url,
                        attempts = detector.attempts(),
                        got_content = last.is_some(),
                        "retry budget exhausted"
                    );
                    if last.is_none() && detector.challenged_last() {
                        return Err(FetchError::Challenged {
                            attempts: detector.attempts(),
                        });
                    }
                    return Ok(last);
                }
            }
        }
    }
}
