/*!
 * Job orchestration.
 *
 * A translation job moves through a fixed sequence of stages. Chunks are
 * translated concurrently under a job-wide deadline; any chunk still
 * unfinished when the deadline fires keeps its source text, so a slow or
 * dead backend degrades output quality instead of hanging the job.
 * Cancellation behaves the same way: scheduling stops, in-flight calls are
 * dropped, and chunks already translated keep their result. In
 * hybrid mode the fast translation is followed by an AI formula-fix pass
 * over the re-chunked translated text, with a deterministic local
 * conversion as the fallback when the fix call itself fails open.
 */

use anyhow::Result;
use futures::StreamExt;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::app_config::{Config, TranslationMode};
use crate::backends::ai::{AiBackend, AiTask};
use crate::backends::fast::FastBackend;
use crate::backends::{RetryStrategy, TranslationBackend};
use crate::text::chunker::{Chunk, chunk, reassemble};
use crate::text::completeness::{CompletenessReport, check_completeness};
use crate::text::formula::convert_math_spans;
use crate::text::normalize::{normalize, normalize_with_stats};
use crate::text::placeholders::ImageGuard;

/// Stages a translation job passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Source text received
    Ingested,
    /// Unicode normalization applied
    Normalized,
    /// Document cut into ordered chunks
    Chunked,
    /// Primary backend pass finished
    BackendTranslated,
    /// Hybrid formula-fix pass finished
    FormulaFixed,
    /// Chunks joined back into a document
    Reassembled,
    /// Completeness check evaluated
    Checked,
    /// Job finished
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ingested => "ingested",
            Self::Normalized => "normalized",
            Self::Chunked => "chunked",
            Self::BackendTranslated => "backend-translated",
            Self::FormulaFixed => "formula-fixed",
            Self::Reassembled => "reassembled",
            Self::Checked => "checked",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Callback invoked after each translated chunk with (done, total).
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Result of a finished translation job.
#[derive(Debug)]
pub struct TranslationOutcome {
    /// Final translated document
    pub text: String,
    /// Source-versus-output completeness report
    pub completeness: CompletenessReport,
    /// Number of chunks in the translation pass
    pub chunks_total: usize,
    /// Chunks that kept their source text because the job deadline fired
    /// or the job was cancelled before their translation finished
    pub chunks_missed: usize,
    /// Chunks the formula-fix pass was applied to
    pub chunks_fixed: usize,
}

/// Drives a document through the full translation pipeline.
pub struct TranslationPipeline {
    mode: TranslationMode,
    primary: Arc<dyn TranslationBackend>,
    fixer: Option<Arc<dyn TranslationBackend>>,
    source_lang: String,
    target_lang: String,
    chunk_size: usize,
    fix_chunk_size: usize,
    concurrency: usize,
    deadline: Duration,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("mode", &self.mode)
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl TranslationPipeline {
    /// Build a pipeline with the backends the configured mode requires.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let fast_retry = RetryStrategy::new(config.fast.max_retries, config.fast.backoff_cap_secs);
        let ai_retry = RetryStrategy::new(config.ai.max_retries, config.ai.backoff_cap_secs);

        let (primary, chunk_size): (Arc<dyn TranslationBackend>, usize) = match config.mode {
            TranslationMode::Fast | TranslationMode::Hybrid => (
                Arc::new(FastBackend::new(
                    config.fast.endpoint.clone(),
                    config.fast.timeout_secs,
                    fast_retry,
                    config.fast.rate_limit_delay_ms,
                )),
                config.fast.chunk_size,
            ),
            TranslationMode::Ai => (
                Arc::new(AiBackend::new(
                    &config.ai.endpoint,
                    config.ai.api_key.clone(),
                    config.ai.model.clone(),
                    config.ai.max_tokens,
                    config.ai.timeout_secs,
                    AiTask::Translate,
                    ai_retry.clone(),
                )),
                config.ai.chunk_size,
            ),
        };

        let fixer: Option<Arc<dyn TranslationBackend>> = match config.mode {
            TranslationMode::Hybrid => Some(Arc::new(AiBackend::new(
                &config.ai.endpoint,
                config.ai.api_key.clone(),
                config.ai.model.clone(),
                config.ai.max_tokens,
                config.ai.timeout_secs,
                AiTask::FormulaFix,
                ai_retry,
            ))),
            _ => None,
        };

        Ok(Self {
            mode: config.mode,
            primary,
            fixer,
            source_lang: config.source_language.clone(),
            target_lang: config.target_language.clone(),
            chunk_size,
            fix_chunk_size: config.job.fix_chunk_size,
            concurrency: config.job.concurrency,
            deadline: Duration::from_secs(config.job.deadline_secs),
            progress: None,
        })
    }

    /// Build a pipeline around explicit backend instances (used by tests).
    pub fn with_backends(
        mode: TranslationMode,
        primary: Arc<dyn TranslationBackend>,
        fixer: Option<Arc<dyn TranslationBackend>>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            primary,
            fixer,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            chunk_size: 5000,
            fix_chunk_size: 4000,
            concurrency: 4,
            deadline: Duration::from_secs(1800),
            progress: None,
        }
    }

    /// Override the translation chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Override the formula-fix chunk size.
    pub fn fix_chunk_size(mut self, size: usize) -> Self {
        self.fix_chunk_size = size.max(1);
        self
    }

    /// Override the concurrent-call limit.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Override the job deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Install a progress callback.
    pub fn progress(mut self, callback: ProgressFn) -> Self {
        self.progress = Some(callback);
        self
    }

    fn stage(&self, stage: JobStage) {
        info!("job stage: {stage}");
    }

    /// Translate a parsed document end to end.
    pub async fn translate_document(&self, source: &str) -> Result<TranslationOutcome> {
        self.run_job(source, None).await
    }

    /// Translate a document, stopping early when `cancel` flips to true.
    ///
    /// Cancellation stops scheduling and drops in-flight backend calls;
    /// chunks already translated keep their result and the rest keep their
    /// source text, exactly like a deadline expiry.
    pub async fn translate_document_with_cancel(
        &self,
        source: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<TranslationOutcome> {
        self.run_job(source, Some(cancel)).await
    }

    async fn run_job(
        &self,
        source: &str,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<TranslationOutcome> {
        self.stage(JobStage::Ingested);
        info!(
            "translating {} chars, mode {}, {} -> {}",
            source.chars().count(),
            self.mode,
            self.source_lang,
            self.target_lang
        );
        let job_deadline = Instant::now() + self.deadline;

        let (normalized, stats) = normalize_with_stats(source);
        debug!(
            "normalization replaced {} and removed {} characters",
            stats.replaced, stats.removed
        );
        self.stage(JobStage::Normalized);

        let chunks = chunk(&normalized, self.chunk_size);
        info!("document cut into {} chunks", chunks.len());
        self.stage(JobStage::Chunked);

        let chunks_total = chunks.len();
        let (translated, chunks_missed) = self
            .run_pass(&chunks, self.primary.as_ref(), job_deadline, cancel.as_ref(), true)
            .await;
        let cancelled_early = cancel.as_ref().is_some_and(|rx| *rx.borrow());
        if cancelled_early {
            warn!("job cancelled, {chunks_missed} chunks kept their source text");
        } else if chunks_missed > 0 {
            warn!("job deadline reached, {chunks_missed} chunks kept their source text");
        }
        self.stage(JobStage::BackendTranslated);

        let mut text = reassemble(&translated);
        let mut chunks_fixed = 0;
        if self.mode == TranslationMode::Hybrid && !cancelled_early {
            if let Some(fixer) = &self.fixer {
                (text, chunks_fixed) = self
                    .run_fix_pass(&text, fixer.as_ref(), job_deadline, cancel.as_ref())
                    .await;
                self.stage(JobStage::FormulaFixed);
            }
        }
        self.stage(JobStage::Reassembled);

        // Model output gets the same character hygiene as the input.
        let text = normalize(&text);

        let completeness = check_completeness(&normalized, &text);
        if !completeness.complete {
            warn!(
                "completeness check failed: {} of {} source words left untranslated",
                completeness.residual_words, completeness.source_words
            );
        }
        self.stage(JobStage::Checked);
        self.stage(JobStage::Done);

        Ok(TranslationOutcome {
            text,
            completeness,
            chunks_total,
            chunks_missed,
            chunks_fixed,
        })
    }

    /// Run one backend pass over the given chunks under the job deadline.
    ///
    /// Returns the chunks with translated text plus the number of chunks
    /// whose translation was cut short by the deadline or a cancellation;
    /// those keep their source text. Atomic chunks bypass the backend
    /// entirely; image markers inside translatable chunks are
    /// placeholder-protected around the call.
    async fn run_pass(
        &self,
        chunks: &[Chunk],
        backend: &dyn TranslationBackend,
        job_deadline: Instant,
        cancel: Option<&watch::Receiver<bool>>,
        report_progress: bool,
    ) -> (Vec<Chunk>, usize) {
        // Progress is reported over the chunks that actually reach a
        // backend; atomic chunks never do.
        let total = chunks.iter().filter(|chunk| !chunk.atomic).count();
        let results: Mutex<HashMap<usize, String>> = Mutex::new(HashMap::new());
        let done = AtomicUsize::new(0);

        let work = async {
            let mut stream = futures::stream::iter(
                chunks
                    .iter()
                    .filter(|chunk| !chunk.atomic)
                    .map(|chunk| {
                        let results = &results;
                        let done = &done;
                        async move {
                            let (protected, guard) = ImageGuard::protect(&chunk.text);
                            let translated = backend
                                .translate(&protected, &self.source_lang, &self.target_lang)
                                .await;
                            let restored = guard.restore(&translated);
                            results.lock().unwrap().insert(chunk.index, restored);
                            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                            if report_progress {
                                if let Some(callback) = &self.progress {
                                    callback(finished, total);
                                }
                            }
                        }
                    }),
            )
            .buffer_unordered(self.concurrency);
            while stream.next().await.is_some() {}
        };

        let remaining = job_deadline.saturating_duration_since(Instant::now());
        let interrupted = match cancel {
            Some(rx) => tokio::select! {
                timed = tokio::time::timeout(remaining, work) => timed.is_err(),
                _ = cancelled(rx.clone()) => true,
            },
            None => tokio::time::timeout(remaining, work).await.is_err(),
        };
        if interrupted {
            debug!(
                "{} pass stopped early, unfinished chunks keep their text",
                backend.name()
            );
        }

        let mut results = results.into_inner().unwrap_or_default();
        let mut missed = 0;
        let out = chunks
            .iter()
            .map(|chunk| {
                let mut translated = chunk.clone();
                if !chunk.atomic {
                    match results.remove(&chunk.index) {
                        Some(text) => translated.text = text,
                        None => missed += 1,
                    }
                }
                translated
            })
            .collect();
        (out, missed)
    }

    /// Hybrid formula-fix pass: re-chunk the translated text and send only
    /// the chunks that still carry raw notation to the fix backend.
    ///
    /// The fix backend fails open, so a chunk can come back unchanged; any
    /// notation still present afterwards is converted locally. The local
    /// conversion is restricted to math spans and unambiguous notation so
    /// the surrounding wording is never rewritten.
    async fn run_fix_pass(
        &self,
        text: &str,
        fixer: &dyn TranslationBackend,
        job_deadline: Instant,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> (String, usize) {
        let chunks = chunk(text, self.fix_chunk_size);
        let (to_fix, clean): (Vec<Chunk>, Vec<Chunk>) = chunks
            .into_iter()
            .partition(|c| !c.atomic && needs_formula_fix(&c.text));

        if to_fix.is_empty() {
            debug!("no chunks need the formula-fix pass");
            return (text.to_string(), 0);
        }
        info!("formula-fix pass over {} of {} chunks", to_fix.len(), to_fix.len() + clean.len());

        let (mut fixed, _) = self
            .run_pass(&to_fix, fixer, job_deadline, cancel, false)
            .await;
        for chunk in &mut fixed {
            if needs_formula_fix(&chunk.text) {
                chunk.text = convert_math_spans(&chunk.text);
            }
        }
        let count = fixed.len();

        let mut all = fixed;
        all.extend(clean);
        (reassemble(&all), count)
    }
}

/// Heuristic for whether a text fragment still carries raw math notation.
fn needs_formula_fix(text: &str) -> bool {
    if text.contains('$') || text.contains("^{") || text.contains("_{") {
        return true;
    }
    if text.contains('\\')
        && text
            .split('\\')
            .skip(1)
            .any(|rest| rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
    {
        return true;
    }
    let lower = text.to_lowercase();
    lower.contains("<sup") || lower.contains("<sub")
}

/// Resolves when the watch channel reports cancellation; pends forever if
/// the sender goes away without cancelling.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
