//! Per-query orchestration: fetch, extract, score, persist images.
//!
//! Queries run strictly one at a time; sequencing is the mechanism that
//! enforces pacing against the target site. A query that produces nothing
//! is a soft failure: it yields the sentinel row and the run moves on.

pub mod pacing;

use crate::config::Config;
use crate::extract;
use crate::fetch::browser::BrowserFetcher;
use crate::fetch::http::HttpFetcher;
use crate::fetch::render_api::RenderApiFetcher;
use crate::fetch::{FetchChain, PageFetcher};
use crate::io::images::ImageStore;
use crate::matching;
use crate::records::{image_basename, ScoredProduct};
use anyhow::{Context, Result};
use pacing::Pacer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Pipeline {
    config: Config,
    chain: FetchChain,
    pacer: Arc<Pacer>,
    images: ImageStore,
    browser: Option<Arc<BrowserFetcher>>,
}

impl Pipeline {
    /// Assemble the full production pipeline: rendering proxy (when
    /// configured), persistent browser, plain HTTP, in that order.
    pub fn new(config: Config, seed: Option<u64>) -> Result<Self> {
        let pacer = Arc::new(match seed {
            Some(seed) => Pacer::seeded(config.pacing.clone(), seed),
            None => Pacer::new(config.pacing.clone()),
        });

        let mut backends: Vec<Arc<dyn PageFetcher>> = Vec::new();
        match RenderApiFetcher::from_config(&config) {
            Ok(Some(render)) => backends.push(Arc::new(render)),
            Ok(None) => info!("render api not configured, skipping backend"),
            Err(e) => warn!(error = %e, "render api unavailable"),
        }

        let browser = Arc::new(BrowserFetcher::new(config.clone(), pacer.clone()));
        backends.push(browser.clone());

        match HttpFetcher::new(&config) {
            Ok(http) => backends.push(Arc::new(http)),
            Err(e) => warn!(error = %e, "http backend unavailable"),
        }

        let images = ImageStore::new(
            config.paths.image_dir.clone(),
            Duration::from_secs(config.fetch.http_timeout_secs),
            &config.user_agent,
        )
        .context("building image store")?;

        Ok(Self {
            config,
            chain: FetchChain::new(backends),
            pacer,
            images,
            browser: Some(browser),
        })
    }

    /// Assemble a pipeline from explicit parts. Used by tests to swap in
    /// scripted fetch backends and a recording pacer.
    pub fn with_parts(
        config: Config,
        chain: FetchChain,
        pacer: Arc<Pacer>,
        images: ImageStore,
    ) -> Self {
        Self {
            config,
            chain,
            pacer,
            images,
            browser: None,
        }
    }

    /// Release process-wide resources (the persistent browser session).
    pub async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.shutdown().await;
        }
    }

    /// Retrieve, extract and score one search term. No sentinel handling
    /// here; an empty vec means nothing passed the threshold.
    pub async fn search(&self, term: &str) -> Vec<ScoredProduct> {
        let url = self.config.search_url(term);
        let Some(html) = self.chain.fetch(&url).await else {
            info!(term, "no content from any backend");
            return Vec::new();
        };

        // Over-collect so scoring has slack to reject weak matches and
        // still fill the cap.
        let candidates =
            extract::extract_candidates(&html, &self.config.base_url, self.config.max_results * 2);
        if candidates.is_empty() {
            info!(term, "no structural match on result page");
            return Vec::new();
        }

        matching::rank_candidates(
            term,
            candidates,
            self.config.match_threshold,
            self.config.max_results,
        )
    }

    /// Run the whole batch. Every input query produces at least one output
    /// row; `observe` is called once per query with its rows (for progress
    /// reporting).
    pub async fn run(
        &self,
        queries: &[String],
        mut observe: impl FnMut(&str, &[ScoredProduct]),
    ) -> Vec<ScoredProduct> {
        let mut all = Vec::new();
        let mut consecutive_failures: u32 = 0;

        for (index, term) in queries.iter().enumerate() {
            if index > 0 {
                self.pacer.between_queries().await;
            }
            info!(term, "searching");

            let mut results = self.search(term).await;
            if results.is_empty() {
                consecutive_failures += 1;
                info!(term, consecutive_failures, "no results");
                let sentinel = ScoredProduct::not_found(term);
                observe(term, std::slice::from_ref(&sentinel));
                all.push(sentinel);

                if consecutive_failures >= self.config.pacing.failure_cooldown_after {
                    warn!(
                        consecutive_failures,
                        "consecutive failures hit the limit, backing off"
                    );
                    self.pacer.failure_cooldown().await;
                    consecutive_failures = 0;
                }
                continue;
            }

            consecutive_failures = 0;
            for (rank, product) in results.iter_mut().enumerate() {
                let base_name = image_basename(term, &product.sku, rank + 1);
                product.image_path = self.images.download(&product.image_url, &base_name).await;
                if !product.image_url.is_empty() {
                    self.pacer.image_pause().await;
                }
            }
            observe(term, &results);
            all.extend(results);
        }

        all
    }
}

#[cfg(test)]
mod tests {
    use super::pacing::{test_pacer, RecordingSleeper};
    use super::*;
    use crate::fetch::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const RESULT_PAGE: &str = r#"
        <html><body>
          <a data-test="productCard" href="/i/G111/">
            <div data-test="productCardTitle">3/8in Drive Ratchet Wrench</div>
            <div data-test="productCardPrice">$24.99</div>
            <span>SKU #G111</span>
          </a>
          <a data-test="productCard" href="/i/G222/">
            <div data-test="productCardTitle">Impact Driver</div>
          </a>
          <a data-test="productCard" href="/i/G333/">
            <div data-test="productCardTitle">Socket Set</div>
          </a>
        </body></html>
    "#;

    const EMPTY_PAGE: &str = "<html><body><p>nothing here</p></body></html>";

    /// Backend that serves one canned page for every URL.
    struct CannedFetcher {
        body: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn page(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            })
        }

        fn nothing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, _url: &str) -> Result<Option<String>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.map(String::from))
        }
    }

    fn test_config(threshold: u8) -> Config {
        Config {
            match_threshold: threshold,
            paths: crate::config::PathConfig {
                image_dir: std::env::temp_dir().join("forager-test-images"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pipeline_with(
        backend: Arc<dyn PageFetcher>,
        config: Config,
    ) -> (Pipeline, Arc<RecordingSleeper>) {
        let (pacer, recorder) = test_pacer(config.pacing.clone(), 42);
        let images = ImageStore::new(
            config.paths.image_dir.clone(),
            Duration::from_secs(2),
            "test-agent",
        )
        .expect("image store");
        (
            Pipeline::with_parts(config, FetchChain::new(vec![backend]), Arc::new(pacer), images),
            recorder,
        )
    }

    #[tokio::test]
    async fn test_scenario_matching_card_accepted_others_rejected() {
        let (pipeline, _) = pipeline_with(CannedFetcher::page(RESULT_PAGE), test_config(70));

        let results = pipeline.search("3/8 Drive Ratchet").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "3/8in Drive Ratchet Wrench");
        assert_eq!(results[0].sku, "G111");
        assert!(results[0].match_score >= 90);
    }

    #[tokio::test]
    async fn test_scenario_markerless_page_yields_sentinel() {
        let (pipeline, _) = pipeline_with(CannedFetcher::page(EMPTY_PAGE), test_config(50));

        let queries = vec!["Widget XYZ".to_string()];
        let rows = pipeline.run(&queries, |_, _| {}).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].search_term, "Widget XYZ");
        assert_eq!(rows[0].title, "Not found");
        assert_eq!(rows[0].match_score, 0);
    }

    #[tokio::test]
    async fn test_scenario_consecutive_failures_trigger_cooldown() {
        let config = test_config(50);
        let cooldown = Duration::from_secs_f64(config.pacing.failure_cooldown_secs);
        let (pipeline, recorder) = pipeline_with(CannedFetcher::nothing(), config);

        let queries: Vec<String> = (1..=4).map(|i| format!("query {i}")).collect();
        let rows = pipeline.run(&queries, |_, _| {}).await;

        // Four sentinels out.
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.is_not_found()));

        // The third barren query trips the long cooldown; with the
        // counter reset, the fourth alone does not trip another.
        let long_pauses = recorder
            .durations()
            .iter()
            .filter(|d| **d == cooldown)
            .count();
        assert_eq!(long_pauses, 1);
    }

    #[tokio::test]
    async fn test_cooldown_fires_before_next_query_fetch() {
        let config = test_config(50);
        let cooldown = Duration::from_secs_f64(config.pacing.failure_cooldown_secs);
        let backend = CannedFetcher::nothing();
        let (pipeline, recorder) = pipeline_with(backend.clone(), config);

        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = order.clone();
        let queries: Vec<String> = (1..=4).map(|i| format!("query {i}")).collect();
        pipeline
            .run(&queries, |term, _| {
                seen.lock().expect("order lock").push(term.to_string());
            })
            .await;

        // After the third query's sentinel the cooldown pause was taken;
        // only then did the fourth query run.
        assert_eq!(order.lock().expect("order lock").len(), 4);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
        assert!(recorder.durations().contains(&cooldown));
    }

    #[tokio::test]
    async fn test_results_never_exceed_cap_and_threshold() {
        let mut page = String::from("<html><body>");
        for i in 0..20 {
            page.push_str(&format!(
                "<a data-test=\"productCard\" href=\"/i/H{i}/\">\
                   <div data-test=\"productCardTitle\">Hex Bolt</div></a>"
            ));
        }
        page.push_str("</body></html>");
        let leaked: &'static str = Box::leak(page.into_boxed_str());

        let (pipeline, _) = pipeline_with(CannedFetcher::page(leaked), test_config(50));
        let results = pipeline.search("Hex Bolt").await;
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.match_score >= 50));
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        // Two misses, a hit, then two more misses: the counter never
        // reaches three.
        struct Alternating {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl PageFetcher for Alternating {
            fn name(&self) -> &'static str {
                "alternating"
            }

            async fn fetch(&self, _url: &str) -> Result<Option<String>, FetchError> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 2 {
                    Ok(Some(RESULT_PAGE.to_string()))
                } else {
                    Ok(None)
                }
            }
        }

        let config = test_config(70);
        let cooldown = Duration::from_secs_f64(config.pacing.failure_cooldown_secs);
        let (pacer, recorder) = test_pacer(config.pacing.clone(), 9);
        let images = ImageStore::new(
            config.paths.image_dir.clone(),
            Duration::from_secs(2),
            "test-agent",
        )
        .expect("image store");
        let pipeline = Pipeline::with_parts(
            config,
            FetchChain::new(vec![Arc::new(Alternating {
                calls: AtomicUsize::new(0),
            })]),
            Arc::new(pacer),
            images,
        );

        let queries: Vec<String> = vec![
            "miss one".to_string(),
            "miss two".to_string(),
            "3/8 Drive Ratchet".to_string(),
            "miss three".to_string(),
            "miss four".to_string(),
        ];
        let rows = pipeline.run(&queries, |_, _| {}).await;

        assert_eq!(rows.len(), 5);
        assert!(!recorder.durations().contains(&cooldown));
    }
}
