/*!
 * Application configuration.
 *
 * All tunables live in one explicit `Config` value that is passed into the
 * pipeline and backends at construction time; there is no process-wide
 * mutable state. Configuration loads from a JSON file with serde defaults
 * for every field, so a partial file (or none at all) still yields a
 * working setup.
 */

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Translation mode selection.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Fast backend only; math notation is left as-is
    Fast,
    /// AI backend translates and normalizes formulas in one pass
    Ai,
    /// Fast translation followed by an AI formula-fix pass (default)
    #[default]
    Hybrid,
}

impl std::fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fast => "fast",
            Self::Ai => "ai",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for TranslationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "ai" => Ok(Self::Ai),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(anyhow!("invalid translation mode: {}", s)),
        }
    }
}

/// Parsing-service collaborator settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParsingConfig {
    /// Submission endpoint URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Task-status endpoint base; the task id is appended
    #[serde(default = "String::new")]
    pub status_endpoint: String,

    /// Bearer token for the service
    #[serde(default = "String::new")]
    pub api_token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_parsing_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Seconds between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Hard wall-clock limit on polling, in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            status_endpoint: String::new(),
            api_token: String::new(),
            request_timeout_secs: default_parsing_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Fast translation backend settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FastBackendConfig {
    /// Full service endpoint URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_fast_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per chunk
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Exponential backoff cap in seconds
    #[serde(default = "default_fast_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// Chunk size for the fast translation pass, in characters
    #[serde(default = "default_fast_chunk_size")]
    pub chunk_size: usize,

    /// Delay before each request, in milliseconds
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
}

impl Default for FastBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_fast_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_cap_secs: default_fast_backoff_cap_secs(),
            chunk_size: default_fast_chunk_size(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
        }
    }
}

/// AI translation backend settings (OpenAI-compatible chat protocol).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiBackendConfig {
    /// Base URL or full chat-completions endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Bearer API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model identifier
    #[serde(default = "String::new")]
    pub model: String,

    /// Per-request timeout in seconds; generous to accommodate thinking
    /// models
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per chunk
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Exponential backoff cap in seconds
    #[serde(default = "default_ai_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Chunk size for the AI translation pass, in characters
    #[serde(default = "default_ai_chunk_size")]
    pub chunk_size: usize,
}

impl Default for AiBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: default_ai_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_cap_secs: default_ai_backoff_cap_secs(),
            max_tokens: default_max_tokens(),
            chunk_size: default_ai_chunk_size(),
        }
    }
}

/// Job-level resource limits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobConfig {
    /// Maximum concurrent backend calls per job
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall job deadline in seconds, distinct from per-call timeouts
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Chunk size for the hybrid formula-fix pass. Heuristic: it applies to
    /// already-translated text whose length differs from the source, hence
    /// configurable rather than derived from the translation chunk sizes.
    #[serde(default = "default_fix_chunk_size")]
    pub fix_chunk_size: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            deadline_secs: default_deadline_secs(),
            fix_chunk_size: default_fix_chunk_size(),
        }
    }
}

/// Renderer settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Explicit primary font path, tried before the built-in candidates
    #[serde(default)]
    pub font_path: Option<String>,

    /// Directory searched for bundled fonts
    #[serde(default = "default_font_dir")]
    pub font_dir: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_dir: default_font_dir(),
        }
    }
}

/// Represents the application configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation mode
    #[serde(default)]
    pub mode: TranslationMode,

    /// Parsing-service settings
    #[serde(default)]
    pub parsing: ParsingConfig,

    /// Fast backend settings
    #[serde(default)]
    pub fast: FastBackendConfig,

    /// AI backend settings
    #[serde(default)]
    pub ai: AiBackendConfig,

    /// Job resource limits
    #[serde(default)]
    pub job: JobConfig,

    /// Renderer settings
    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            mode: TranslationMode::default(),
            parsing: ParsingConfig::default(),
            fast: FastBackendConfig::default(),
            ai: AiBackendConfig::default(),
            job: JobConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate that the selected mode has the backends it needs.
    ///
    /// Called after CLI overrides are applied, not at load time.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            TranslationMode::Fast => check_endpoint("fast.endpoint", &self.fast.endpoint)?,
            TranslationMode::Ai => check_endpoint("ai.endpoint", &self.ai.endpoint)?,
            TranslationMode::Hybrid => {
                check_endpoint("fast.endpoint", &self.fast.endpoint)?;
                check_endpoint("ai.endpoint", &self.ai.endpoint)?;
            }
        }
        if self.job.concurrency == 0 {
            return Err(anyhow!("job.concurrency must be at least 1"));
        }
        Ok(())
    }
}

fn check_endpoint(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(anyhow!("{name} must be configured for the selected mode"));
    }
    url::Url::parse(value).with_context(|| format!("{name} is not a valid URL"))?;
    Ok(())
}

fn default_source_language() -> String {
    "EN".to_string()
}

fn default_target_language() -> String {
    "ZH".to_string()
}

fn default_parsing_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_fast_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_fast_backoff_cap_secs() -> u64 {
    5
}

fn default_fast_chunk_size() -> usize {
    5000
}

fn default_rate_limit_delay_ms() -> u64 {
    300
}

fn default_ai_timeout_secs() -> u64 {
    300
}

fn default_ai_backoff_cap_secs() -> u64 {
    10
}

fn default_max_tokens() -> u32 {
    16000
}

fn default_ai_chunk_size() -> usize {
    3000
}

fn default_concurrency() -> usize {
    4
}

fn default_deadline_secs() -> u64 {
    1800
}

fn default_fix_chunk_size() -> usize {
    4000
}

fn default_font_dir() -> String {
    "fonts".to_string()
}
