/*!
 * Advisory translation-completeness heuristic.
 *
 * Counts source-language word tokens left in the translated output against
 * the word count of the original. A high residual suggests the backend
 * skipped paragraphs. The check never blocks or retries anything; callers
 * surface it as a warning.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static SOURCE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());
static RESIDUAL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").unwrap());

/// Residual-word share above which a translation is flagged incomplete.
const RESIDUAL_THRESHOLD: f64 = 0.3;

/// Result of a completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessReport {
    /// False when the residual exceeds the threshold
    pub complete: bool,
    /// Source-language words (length >= 4) remaining in the translation
    pub residual_words: usize,
    /// Word tokens in the original
    pub source_words: usize,
}

/// Compare the original text with its translation.
pub fn check_completeness(original: &str, translated: &str) -> CompletenessReport {
    let source_words = SOURCE_WORD.find_iter(original).count();
    let residual_words = RESIDUAL_WORD.find_iter(translated).count();

    let complete =
        source_words == 0 || (residual_words as f64) <= (source_words as f64) * RESIDUAL_THRESHOLD;

    CompletenessReport {
        complete,
        residual_words,
        source_words,
    }
}
