/*!
 * Tests for backend retry, backoff, and fail-open behavior
 */

use std::time::Duration;

use scitrans::backends::TranslationBackend;
use scitrans::backends::ai::{
    chat_completions_url, length_deviates, looks_like_clarification, strip_thinking,
};
use scitrans::backends::mock::MockBackend;

use crate::common::recording_retry;

#[tokio::test]
async fn test_translate_withHealthyBackend_shouldCallOnce() {
    let (retry, sleeper) = recording_retry(3, 5);
    let backend = MockBackend::uppercase(retry);
    let result = backend.translate("hello world", "EN", "ZH").await;
    assert_eq!(result, "HELLO WORLD");
    assert_eq!(backend.call_count(), 1);
    assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn test_translate_withEmptyInput_shouldSkipBackendCall() {
    let (retry, _) = recording_retry(3, 5);
    let backend = MockBackend::uppercase(retry);
    let result = backend.translate("   ", "EN", "ZH").await;
    assert_eq!(result, "   ");
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withTransientFailure_shouldRetryAndSucceed() {
    let (retry, sleeper) = recording_retry(3, 5);
    let backend = MockBackend::failing_first(retry, 1);
    let result = backend.translate("stable text", "EN", "ZH").await;
    assert_eq!(result, "stable text");
    assert_eq!(backend.call_count(), 2);
    assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_translate_withPersistentFailure_shouldFailOpenToSource() {
    let (retry, _) = recording_retry(3, 5);
    let backend = MockBackend::always_failing(retry);
    let result = backend.translate("keep me intact", "EN", "ZH").await;
    assert_eq!(result, "keep me intact");
    // Exactly the attempt budget, no more.
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn test_translate_backoff_shouldGrowExponentiallyUnderCap() {
    let (retry, sleeper) = recording_retry(4, 5);
    let backend = MockBackend::always_failing(retry);
    backend.translate("text", "EN", "ZH").await;
    assert_eq!(
        sleeper.recorded(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(5), // capped, 2^3 would be 8
        ]
    );
}

#[test]
fn test_chat_completions_url_withBareHost_shouldAppendFullPath() {
    assert_eq!(
        chat_completions_url("http://localhost:8000"),
        "http://localhost:8000/v1/chat/completions"
    );
    assert_eq!(
        chat_completions_url("http://localhost:8000/v1/"),
        "http://localhost:8000/v1/chat/completions"
    );
    assert_eq!(
        chat_completions_url("https://api.example.com/v1/chat/completions"),
        "https://api.example.com/v1/chat/completions"
    );
}

#[test]
fn test_strip_thinking_withThinkBlock_shouldRemoveIt() {
    let raw = "<think>step by step\nreasoning</think>\nFinal answer.";
    assert_eq!(strip_thinking(raw), "Final answer.");
    assert_eq!(strip_thinking("no blocks here"), "no blocks here");
}

#[test]
fn test_length_deviates_shouldFlagRunawayOutput() {
    let input = "a".repeat(100);
    assert!(!length_deviates(&input, &"b".repeat(120)));
    assert!(length_deviates(&input, &"b".repeat(200)));
    assert!(length_deviates(&input, &"b".repeat(20)));
}

#[test]
fn test_looks_like_clarification_shouldMatchQuestionOpenings() {
    assert!(looks_like_clarification("Could you provide the rest of the document?"));
    assert!(looks_like_clarification("\u{6211}\u{9700}\u{8981}\u{66f4}\u{591a}\u{4e0a}\u{4e0b}\u{6587}"));
    assert!(!looks_like_clarification("\u{8fd9}\u{662f}\u{7ffb}\u{8bd1}\u{540e}\u{7684}\u{6587}\u{672c}"));
}
