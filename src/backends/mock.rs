/*!
 * Mock translation backend for tests.
 *
 * Applies a configurable pure transform instead of calling a network
 * service, counts invocations, and can be scripted to fail so retry and
 * fail-open behavior can be exercised without real delays.
 */

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::BackendError;

use super::{RetryStrategy, Sleeper, TranslationBackend};

type Transform = dyn Fn(&str) -> String + Send + Sync;

/// Sleeper that records requested delays instead of waiting them out.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: std::sync::Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Delays requested so far.
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Scripted backend used throughout the test suite.
pub struct MockBackend {
    transform: Arc<Transform>,
    /// Number of initial calls that fail before the transform succeeds;
    /// `u32::MAX` means every call fails
    fail_first: u32,
    calls: AtomicUsize,
    retry: RetryStrategy,
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("fail_first", &self.fail_first)
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockBackend {
    /// Backend applying an arbitrary transform to every chunk.
    pub fn with_transform(
        retry: RetryStrategy,
        transform: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            transform: Arc::new(transform),
            fail_first: 0,
            calls: AtomicUsize::new(0),
            retry,
        }
    }

    /// Backend that returns its input unchanged.
    pub fn identity(retry: RetryStrategy) -> Self {
        Self::with_transform(retry, |text| text.to_string())
    }

    /// Backend that uppercases every chunk.
    pub fn uppercase(retry: RetryStrategy) -> Self {
        Self::with_transform(retry, |text| text.to_uppercase())
    }

    /// Backend whose every call fails with a network error.
    pub fn always_failing(retry: RetryStrategy) -> Self {
        let mut mock = Self::identity(retry);
        mock.fail_first = u32::MAX;
        mock
    }

    /// Backend that fails `n` times, then succeeds.
    pub fn failing_first(retry: RetryStrategy, n: u32) -> Self {
        let mut mock = Self::identity(retry);
        mock.fail_first = n;
        mock
    }

    /// Number of `translate_once` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock-backend"
    }

    fn retry(&self) -> &RetryStrategy {
        &self.retry
    }

    async fn translate_once(
        &self,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if (call as u64) < self.fail_first as u64 {
            return Err(BackendError::Network("scripted failure".to_string()));
        }
        Ok((self.transform)(text))
    }
}
