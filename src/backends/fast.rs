/*!
 * Fast machine-translation backend.
 *
 * Speaks the DeepLX-style JSON protocol: `{text, source_lang, target_lang}`
 * in, `{code, data}` out. High throughput, no understanding of math
 * notation; in hybrid mode its output is repaired afterwards by the AI
 * formula-fix pass.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::BackendError;

use super::{RetryStrategy, TranslationBackend};

/// Request body of the fast-translation protocol.
#[derive(Debug, Serialize)]
struct FastRequest<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

/// Response body of the fast-translation protocol.
#[derive(Debug, Deserialize)]
struct FastResponse {
    /// Protocol status code; 200 means success regardless of HTTP status
    code: i64,
    /// Translated text
    data: Option<String>,
    /// Alternative field some deployments use instead of `data`
    text: Option<String>,
}

/// Client for the fast translation service.
#[derive(Debug)]
pub struct FastBackend {
    /// HTTP client with the per-call timeout baked in
    client: Client,
    /// Full endpoint URL
    endpoint: String,
    /// Retry policy
    retry: RetryStrategy,
    /// Delay inserted before each request to stay under the service's
    /// request rate
    rate_limit_delay: Duration,
}

impl FastBackend {
    /// Create a new fast backend client.
    pub fn new(
        endpoint: impl Into<String>,
        timeout_secs: u64,
        retry: RetryStrategy,
        rate_limit_delay_ms: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            retry,
            rate_limit_delay: Duration::from_millis(rate_limit_delay_ms),
        }
    }
}

#[async_trait]
impl TranslationBackend for FastBackend {
    fn name(&self) -> &'static str {
        "fast-backend"
    }

    fn retry(&self) -> &RetryStrategy {
        &self.retry
    }

    async fn translate_once(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, BackendError> {
        self.retry.pause(self.rate_limit_delay).await;

        let request = FastRequest {
            text,
            source_lang,
            target_lang,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::RateLimited {
                status: status.as_u16(),
                message,
            });
        }

        let body: FastResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        if body.code != 200 {
            return Err(BackendError::RateLimited {
                status: u16::try_from(body.code).unwrap_or(0),
                message: format!("service returned code {}", body.code),
            });
        }

        let translated = body
            .data
            .or(body.text)
            .ok_or_else(|| BackendError::MalformedResponse("missing data field".to_string()))?;

        debug!(
            "fast backend translated {} -> {} chars",
            text.len(),
            translated.len()
        );
        Ok(translated)
    }
}
