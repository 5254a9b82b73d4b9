/*!
 * AI chat-completion backend.
 *
 * Speaks the OpenAI-compatible chat protocol. Two task modes share the
 * client: full translation (which also normalizes math notation in-prompt)
 * and formula-fix, a restricted prompt that repairs notation in already
 * translated text without touching the wording.
 *
 * Model output is never trusted as-is: thinking blocks are stripped, stray
 * HTML script tags are rewritten to Unicode, and responses that look like a
 * refusal, a clarification question, or runaway generation are rejected as
 * malformed so the retry/fail-open discipline can handle them.
 */

use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::BackendError;
use crate::text::markup::strip_html_markup;

use super::{RetryStrategy, TranslationBackend};

/// System prompt for the full-translation task.
const TRANSLATE_SYSTEM_PROMPT: &str = "\
You are a professional academic translator. Translate the user's text from \
{source} to {target}, following these rules strictly:

1. Translate every paragraph and sentence completely; never omit content.
2. Convert all LaTeX math to plain Unicode notation: superscript digits \
(\u{2070}\u{00b9}\u{00b2}\u{00b3}\u{2074}\u{2075}\u{2076}\u{2077}\u{2078}\u{2079}\u{207a}\u{207b}), subscript digits (\u{2080}\u{2081}\u{2082}\u{2083}\u{2084}\u{2085}\u{2086}\u{2087}\u{2088}\u{2089}\u{208a}\u{208b}), Greek letters, and \
math symbols. Example: $^{13}C$ becomes \u{00b9}\u{00b3}C, $O_2$ becomes O\u{2082}.
3. Keep all Markdown structure: headings, emphasis markers, line breaks, \
and image markers exactly as they appear.
4. Do not translate names of people, places, journals, or institutions, and \
never touch base64 image data or placeholder tokens.
5. Output plain text only: no HTML tags such as <sup> or <sub>, no \
explanations, no meta commentary.";

/// System prompt for the formula-fix task.
const FORMULA_FIX_SYSTEM_PROMPT: &str = "\
You are a math-notation repair assistant. The user gives you already \
translated text whose formulas may render badly. Your only task is to fix \
the notation; every other character must stay exactly as it is.

Rules:
1. Convert LaTeX to Unicode: $^{13}C$ becomes \u{00b9}\u{00b3}C, $O_2$ becomes O\u{2082}, \
$\\sim$ becomes \u{223c}, $\\pm$ becomes \u{00b1}.
2. Replace HTML script tags: <sup>13</sup> becomes \u{00b9}\u{00b3}.
3. Remove replacement-character boxes.
4. Keep placeholder tokens of the form <<<IMAGE_PLACEHOLDER_n>>> untouched.
5. Never add explanations, never ask questions, never change the wording or \
paragraph structure. Return only the repaired text.";

/// Maximum relative length deviation between input and output before a
/// response is considered runaway generation.
const MAX_LENGTH_DEVIATION: f64 = 0.5;

/// Opening phrases that indicate the model asked a question instead of
/// doing the work.
const CLARIFICATION_PHRASES: &[&str] = &[
    "I need",
    "I can see",
    "Could you",
    "Please provide",
    "\u{6211}\u{9700}\u{8981}",
    "\u{8bf7}\u{63d0}\u{4f9b}",
];

static THINKING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>\s*").unwrap());

/// What the AI backend is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTask {
    /// Translate the text and normalize math in one pass
    Translate,
    /// Repair math notation only, wording must not change
    FormulaFix,
}

/// Chat message object.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completion request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Chat-completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Normalize a configured base URL into a full chat-completions endpoint.
///
/// Users often configure just the service root; `/v1/chat/completions` is
/// appended unless already present.
pub fn chat_completions_url(base: &str) -> String {
    if base.ends_with("/chat/completions") {
        return base.to_string();
    }
    let mut url = base.trim_end_matches('/').to_string();
    if !url.ends_with("/v1") {
        url.push_str("/v1");
    }
    url.push_str("/chat/completions");
    url
}

/// Remove a paired thinking-delimiter block from a model response.
pub fn strip_thinking(text: &str) -> String {
    if text.contains("<think>") && text.contains("</think>") {
        THINKING_BLOCK.replace_all(text, "").into_owned()
    } else {
        text.to_string()
    }
}

/// True when output length deviates from input length by more than 50%.
pub fn length_deviates(input: &str, output: &str) -> bool {
    let input_len = input.chars().count() as f64;
    let output_len = output.chars().count() as f64;
    (output_len - input_len).abs() > input_len * MAX_LENGTH_DEVIATION
}

/// True when the first 200 characters look like a clarification question
/// rather than translated content.
pub fn looks_like_clarification(text: &str) -> bool {
    let head: String = text.chars().take(200).collect();
    CLARIFICATION_PHRASES.iter().any(|phrase| head.contains(phrase))
}

/// Client for an OpenAI-compatible chat-completion service.
#[derive(Debug)]
pub struct AiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    task: AiTask,
    retry: RetryStrategy,
}

impl AiBackend {
    /// Create a new AI backend client for the given task mode.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout_secs: u64,
        task: AiTask,
        retry: RetryStrategy,
    ) -> Self {
        let temperature = match task {
            AiTask::Translate => 0.3,
            // Zero temperature: the fix pass must be as deterministic as
            // the model allows.
            AiTask::FormulaFix => 0.0,
        };
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: chat_completions_url(endpoint),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
            task,
            retry,
        }
    }

    fn system_prompt(&self, source_lang: &str, target_lang: &str) -> String {
        match self.task {
            AiTask::Translate => TRANSLATE_SYSTEM_PROMPT
                .replace("{source}", source_lang)
                .replace("{target}", target_lang),
            AiTask::FormulaFix => FORMULA_FIX_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[async_trait]
impl TranslationBackend for AiBackend {
    fn name(&self) -> &'static str {
        match self.task {
            AiTask::Translate => "ai-backend",
            AiTask::FormulaFix => "ai-formula-fix",
        }
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
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt(source_lang, target_lang),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| BackendError::MalformedResponse("empty choices".to_string()))?;

        let cleaned = strip_html_markup(&strip_thinking(content));
        let cleaned = cleaned.trim().to_string();

        if length_deviates(text, &cleaned) {
            return Err(BackendError::MalformedResponse(format!(
                "output length {} deviates more than 50% from input {}",
                cleaned.chars().count(),
                text.chars().count()
            )));
        }
        if looks_like_clarification(&cleaned) {
            return Err(BackendError::MalformedResponse(
                "response opens with a clarification question".to_string(),
            ));
        }

        debug!(
            "{} returned {} chars for {} input chars",
            self.name(),
            cleaned.len(),
            text.len()
        );
        Ok(cleaned)
    }
}
