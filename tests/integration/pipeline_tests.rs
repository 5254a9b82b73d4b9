/*!
 * End-to-end translation pipeline tests
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use scitrans::app_config::TranslationMode;
use scitrans::backends::mock::MockBackend;
use scitrans::backends::{RetryStrategy, TranslationBackend};
use scitrans::errors::BackendError;
use scitrans::pipeline::TranslationPipeline;

use crate::common::{recording_retry, sample_document};

/// Backend whose calls never complete, for deadline and cancellation tests.
#[derive(Debug)]
struct StallingBackend {
    retry: RetryStrategy,
}

#[async_trait]
impl TranslationBackend for StallingBackend {
    fn name(&self) -> &'static str {
        "stalling-backend"
    }

    fn retry(&self) -> &RetryStrategy {
        &self.retry
    }

    async fn translate_once(
        &self,
        _text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, BackendError> {
        futures::future::pending().await
    }
}

/// Backend that answers chunks starting with "Alpha" immediately and
/// stalls on everything else, for partial-completion tests.
#[derive(Debug)]
struct AlphaOnlyBackend {
    retry: RetryStrategy,
}

#[async_trait]
impl TranslationBackend for AlphaOnlyBackend {
    fn name(&self) -> &'static str {
        "alpha-only-backend"
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
        if text.starts_with("Alpha") {
            Ok(text.to_uppercase())
        } else {
            futures::future::pending().await
        }
    }
}

fn fast_pipeline(backend: MockBackend) -> TranslationPipeline {
    TranslationPipeline::with_backends(
        TranslationMode::Fast,
        Arc::new(backend),
        None,
        "EN",
        "ZH",
    )
}

#[tokio::test]
async fn test_pipeline_withFastMode_shouldTranslateEveryParagraph() {
    let (retry, _) = recording_retry(3, 5);
    let pipeline = fast_pipeline(MockBackend::uppercase(retry));

    let outcome = pipeline
        .translate_document("First paragraph here.\n\nSecond paragraph here.")
        .await
        .unwrap();
    assert_eq!(outcome.text, "FIRST PARAGRAPH HERE.\n\nSECOND PARAGRAPH HERE.");
    assert_eq!(outcome.chunks_missed, 0);
}

#[tokio::test]
async fn test_pipeline_withImageMarker_shouldKeepItByteIdentical() {
    let (retry, _) = recording_retry(3, 5);
    let pipeline = fast_pipeline(MockBackend::uppercase(retry)).chunk_size(80);

    let source = sample_document();
    let marker_line = source
        .lines()
        .find(|l| l.starts_with("!["))
        .unwrap()
        .to_string();
    let outcome = pipeline.translate_document(&source).await.unwrap();

    // The base64 payload passed through untouched even though the backend
    // uppercases everything it sees.
    assert!(outcome.text.contains(&marker_line));
}

#[tokio::test]
async fn test_pipeline_withManyChunks_shouldPreserveDocumentOrder() {
    let (retry, _) = recording_retry(3, 5);
    let pipeline = fast_pipeline(MockBackend::uppercase(retry))
        .chunk_size(30)
        .concurrency(8);

    let paragraphs: Vec<String> = (0..12).map(|i| format!("Paragraph number {i}.")).collect();
    let source = paragraphs.join("\n\n");
    let outcome = pipeline.translate_document(&source).await.unwrap();

    let expected: Vec<String> = paragraphs.iter().map(|p| p.to_uppercase()).collect();
    assert_eq!(outcome.text, expected.join("\n\n"));
}

#[tokio::test]
async fn test_pipeline_withHybridMode_shouldRepairFormulaNotation() {
    let (retry, _) = recording_retry(3, 5);
    let (fix_retry, _) = recording_retry(3, 5);
    // The fast backend leaves notation alone; the identity fixer fails to
    // improve it, so the local conversion takes over.
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Hybrid,
        Arc::new(MockBackend::identity(retry)),
        Some(Arc::new(MockBackend::identity(fix_retry))),
        "EN",
        "ZH",
    );

    let outcome = pipeline
        .translate_document("Uptake of ^{13}C rises while O_{2} falls.")
        .await
        .unwrap();
    assert!(outcome.text.contains("\u{00b9}\u{00b3}C"), "got: {}", outcome.text);
    assert!(outcome.text.contains("O\u{2082}"), "got: {}", outcome.text);
    assert_eq!(outcome.chunks_fixed, 1);
}

#[tokio::test]
async fn test_pipeline_withHybridMode_shouldSkipChunksWithoutNotation() {
    let (retry, _) = recording_retry(3, 5);
    let (fix_retry, _) = recording_retry(3, 5);
    let fixer = MockBackend::with_transform(fix_retry, |_| "FIXED".to_string());
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Hybrid,
        Arc::new(MockBackend::identity(retry)),
        Some(Arc::new(fixer)),
        "EN",
        "ZH",
    );

    let outcome = pipeline
        .translate_document("A plain paragraph with no notation at all.")
        .await
        .unwrap();
    assert_eq!(outcome.text, "A plain paragraph with no notation at all.");
    assert_eq!(outcome.chunks_fixed, 0);
}

#[tokio::test]
async fn test_pipeline_withHybridMode_shouldLeaveProseAroundMathSpansAlone() {
    let (retry, _) = recording_retry(3, 5);
    let (fix_retry, _) = recording_retry(3, 5);
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Hybrid,
        Arc::new(MockBackend::identity(retry)),
        Some(Arc::new(MockBackend::identity(fix_retry))),
        "EN",
        "ZH",
    );

    // Prose braces and snake_case identifiers must survive the local
    // conversion fallback; only the math span changes.
    let source = "The value of $\\alpha$ is set in config {section A} via file_2 options.";
    let outcome = pipeline.translate_document(source).await.unwrap();
    assert_eq!(
        outcome.text,
        "The value of \u{03b1} is set in config {section A} via file_2 options."
    );
}

#[tokio::test]
async fn test_pipeline_withFailingBackend_shouldFailOpenToSourceText() {
    let (retry, _) = recording_retry(2, 1);
    let pipeline = fast_pipeline(MockBackend::always_failing(retry));

    let source = "This text must survive a total backend outage.";
    let outcome = pipeline.translate_document(source).await.unwrap();
    assert_eq!(outcome.text, source);
}

#[tokio::test]
async fn test_pipeline_withExpiredDeadline_shouldKeepSourceForUnfinishedChunks() {
    let (retry, _) = recording_retry(1, 1);
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Fast,
        Arc::new(StallingBackend { retry }),
        None,
        "EN",
        "ZH",
    )
    .deadline(Duration::from_millis(50));

    let source = "Alpha paragraph.\n\nBeta paragraph.";
    let outcome = pipeline.translate_document(source).await.unwrap();
    assert_eq!(outcome.text, source);
    assert_eq!(outcome.chunks_missed, outcome.chunks_total);
}

#[tokio::test]
async fn test_pipeline_withCancellationBeforeStart_shouldKeepSourceText() {
    let (retry, _) = recording_retry(1, 1);
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Fast,
        Arc::new(StallingBackend { retry }),
        None,
        "EN",
        "ZH",
    );

    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true).unwrap();
    let source = "Some text to translate.";
    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        pipeline.translate_document_with_cancel(source, rx),
    )
    .await
    .expect("cancellation should resolve promptly")
    .unwrap();
    assert_eq!(outcome.text, source);
    assert_eq!(outcome.chunks_missed, outcome.chunks_total);
}

#[tokio::test]
async fn test_pipeline_withMidJobCancellation_shouldKeepCompletedChunks() {
    let (retry, _) = recording_retry(1, 1);
    let pipeline = TranslationPipeline::with_backends(
        TranslationMode::Fast,
        Arc::new(AlphaOnlyBackend { retry }),
        None,
        "EN",
        "ZH",
    )
    .chunk_size(20);

    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send(true);
    });
    let outcome = pipeline
        .translate_document_with_cancel("Alpha paragraph.\n\nBeta paragraph.", rx)
        .await
        .unwrap();

    // The chunk that finished before the cancel keeps its translation;
    // the stalled one falls back to its source text.
    assert!(outcome.text.contains("ALPHA PARAGRAPH."), "got: {}", outcome.text);
    assert!(outcome.text.contains("Beta paragraph."), "got: {}", outcome.text);
    assert_eq!(outcome.chunks_missed, 1);
}

#[tokio::test]
async fn test_pipeline_withProgressCallback_shouldReportEveryChunk() {
    let (retry, _) = recording_retry(3, 5);
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_in_callback = seen.clone();
    let pipeline = fast_pipeline(MockBackend::uppercase(retry))
        .chunk_size(25)
        .progress(Arc::new(move |_done, _total| {
            seen_in_callback.fetch_add(1, Ordering::SeqCst);
        }));

    let source = "One paragraph here today.\n\nAnother paragraph here now.\n\nA third paragraph text.";
    let outcome = pipeline.translate_document(source).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), outcome.chunks_total);
}

#[tokio::test]
async fn test_pipeline_withAtomicChunks_shouldReportProgressOverTranslatableOnes() {
    let (retry, _) = recording_retry(3, 5);
    let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
    let calls_in_callback = calls.clone();
    let pipeline = fast_pipeline(MockBackend::uppercase(retry))
        .chunk_size(80)
        .progress(Arc::new(move |done, total| {
            calls_in_callback.lock().unwrap().push((done, total));
        }));

    let outcome = pipeline.translate_document(&sample_document()).await.unwrap();

    let calls = calls.lock().unwrap();
    let (_, total) = calls[0];
    // The image marker is its own chunk but never reaches a backend, so it
    // is excluded from the reported total and the count can hit it.
    assert_eq!(total, outcome.chunks_total - 1);
    assert_eq!(calls.len(), total);
    assert!(calls.iter().any(|(done, t)| done == t));
}

#[tokio::test]
async fn test_pipeline_andRenderer_endToEnd_shouldProducePdfWithImage() {
    let (retry, _) = recording_retry(3, 5);
    let pipeline = fast_pipeline(MockBackend::uppercase(retry)).chunk_size(80);

    let outcome = pipeline.translate_document(&sample_document()).await.unwrap();
    assert!(outcome.text.contains("CARBON ISOTOPE DYNAMICS"));

    let renderer = scitrans::render::DocumentRenderer::new(
        scitrans::app_config::RenderConfig::default(),
    );
    let rendered = renderer.render(&outcome.text, "end to end").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.diagnostics.images_embedded, 1);
}

#[tokio::test]
async fn test_pipeline_withUntranslatedOutput_shouldFlagIncompleteness() {
    let (retry, _) = recording_retry(2, 1);
    // Identity "translation" leaves every source word in place.
    let pipeline = fast_pipeline(MockBackend::identity(retry));

    let source = vec!["several lengthy english words remain untranslated here"; 10].join("\n\n");
    let outcome = pipeline.translate_document(&source).await.unwrap();
    assert!(!outcome.completeness.complete);
}
