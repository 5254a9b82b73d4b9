/*!
 * Translation backend interface.
 *
 * This module defines the common contract implemented by the fast
 * machine-translation backend and the AI chat-completion backend, plus the
 * shared retry discipline: bounded attempts with capped exponential backoff,
 * failing open to the source text when the budget runs out. A backend outage
 * degrades translation quality, never availability.
 */

use async_trait::async_trait;
use log::warn;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::BackendError;

pub mod ai;
pub mod fast;
pub mod mock;

/// Injectable sleep abstraction so retry logic is testable without real
/// delays.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Sleep for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry policy shared by all backends: up to `max_attempts` calls with
/// `min(2^attempt, cap)` seconds between them.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Total number of attempts (not just retries)
    pub max_attempts: u32,
    /// Upper bound on the backoff delay
    pub backoff_cap: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryStrategy {
    /// Create a strategy using the real tokio timer.
    pub fn new(max_attempts: u32, backoff_cap_secs: u64) -> Self {
        Self::with_sleeper(max_attempts, backoff_cap_secs, Arc::new(TokioSleeper))
    }

    /// Create a strategy with a custom sleeper (used by tests).
    pub fn with_sleeper(max_attempts: u32, backoff_cap_secs: u64, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_cap: Duration::from_secs(backoff_cap_secs),
            sleeper,
        }
    }

    /// Backoff delay before the given attempt (1-based for retries).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(2u64.saturating_pow(attempt.min(32)));
        exp.min(self.backoff_cap)
    }

    /// Wait out the backoff delay for the given attempt.
    pub async fn wait(&self, attempt: u32) {
        self.sleeper.sleep(self.delay_for(attempt)).await;
    }

    /// Sleep for a fixed duration through the injected sleeper (used for
    /// inter-request rate limiting).
    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration).await;
        }
    }
}

/// Common trait for translation backends.
///
/// Implementations provide a single protocol round trip in
/// `translate_once`; the provided `translate` wraps it in the shared retry
/// discipline and fail-open policy.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// The retry policy governing this backend
    fn retry(&self) -> &RetryStrategy;

    /// Perform one translation request without retrying.
    async fn translate_once(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, BackendError>;

    /// Translate with retries, failing open to the input text.
    ///
    /// Empty input short-circuits without a network call. On each failure a
    /// capped exponential backoff is waited out; once the attempt budget is
    /// exhausted the original text is returned unchanged.
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let strategy = self.retry().clone();
        for attempt in 0..strategy.max_attempts {
            if attempt > 0 {
                strategy.wait(attempt).await;
            }
            match self.translate_once(text, source_lang, target_lang).await {
                Ok(translated) => return translated,
                Err(e) => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        self.name(),
                        attempt + 1,
                        strategy.max_attempts,
                        e
                    );
                }
            }
        }

        warn!(
            "{}: retry budget exhausted, keeping source text ({} chars)",
            self.name(),
            text.len()
        );
        text.to_string()
    }
}
