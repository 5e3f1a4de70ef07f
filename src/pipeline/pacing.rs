//! Request pacing: randomized delays and escalating cooldowns.
//!
//! All waiting in the pipeline goes through the `Pacer` so that pacing is
//! policy, not scattered sleeps. The random source is seedable and the
//! sleep itself is injectable, so tests assert on sampled bounds and call
//! counts without waiting in real time.

use crate::config::PacingConfig;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleep provider. The default is the tokio timer; tests substitute a
/// recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Samples delays from the configured bands and waits them out.
pub struct Pacer {
    config: PacingConfig,
    rng: Mutex<StdRng>,
    sleeper: Arc<dyn Sleeper>,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self::with_sleeper(config, StdRng::from_entropy(), Arc::new(TokioSleeper))
    }

    /// Deterministic pacer for reproducible runs and tests.
    pub fn seeded(config: PacingConfig, seed: u64) -> Self {
        Self::with_sleeper(config, StdRng::seed_from_u64(seed), Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: PacingConfig, rng: StdRng, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            config,
            rng: Mutex::new(rng),
            sleeper,
        }
    }

    fn sample(&self, min_secs: f64, max_secs: f64) -> Duration {
        if max_secs <= min_secs {
            return Duration::from_secs_f64(min_secs.max(0.0));
        }
        let secs = self
            .rng
            .lock()
            .expect("pacer rng lock")
            .gen_range(min_secs..=max_secs);
        Duration::from_secs_f64(secs)
    }

    /// Randomized gap between consecutive queries.
    pub async fn between_queries(&self) {
        let d = self.sample(
            self.config.min_query_delay_secs,
            self.config.max_query_delay_secs,
        );
        self.sleeper.sleep(d).await;
    }

    /// Idle span after a page load, before inspecting content.
    pub async fn dwell(&self) {
        let d = self.sample(self.config.min_dwell_secs, self.config.max_dwell_secs);
        self.sleeper.sleep(d).await;
    }

    /// Fixed cooldown after hitting a challenge page.
    pub async fn challenge_cooldown(&self) {
        self.sleeper
            .sleep(Duration::from_secs_f64(self.config.challenge_cooldown_secs))
            .await;
    }

    /// Short pause when a page is neither challenged nor ready yet.
    pub async fn soft_pause(&self) {
        self.sleeper
            .sleep(Duration::from_secs_f64(self.config.soft_retry_secs))
            .await;
    }

    /// Long cooldown after a run of consecutive total failures.
    pub async fn failure_cooldown(&self) {
        self.sleeper
            .sleep(Duration::from_secs_f64(self.config.failure_cooldown_secs))
            .await;
    }

    /// Randomized pause after downloading an image.
    pub async fn image_pause(&self) {
        let d = self.sample(
            self.config.min_image_delay_secs,
            self.config.max_image_delay_secs,
        );
        self.sleeper.sleep(d).await;
    }
}

/// Test sleeper that records requested durations instead of waiting.
#[cfg(test)]
pub(crate) struct RecordingSleeper {
    pub recorded: Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::new(Vec::new()),
        })
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.recorded.lock().expect("recorder lock").clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.recorded.lock().expect("recorder lock").push(duration);
    }
}

#[cfg(test)]
pub(crate) fn test_pacer(config: PacingConfig, seed: u64) -> (Pacer, Arc<RecordingSleeper>) {
    let recorder = RecordingSleeper::new();
    let pacer = Pacer::with_sleeper(config, StdRng::seed_from_u64(seed), recorder.clone());
    (pacer, recorder)
}
