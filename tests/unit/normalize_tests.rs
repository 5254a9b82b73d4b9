/*!
 * Tests for Unicode normalization
 */

use scitrans::text::normalize::{normalize, normalize_with_stats};

#[test]
fn test_normalize_withSpaceVariants_shouldFoldToAscii() {
    assert_eq!(normalize("a\u{00A0}b\u{2009}c\u{3000}d"), "a b c d");
}

#[test]
fn test_normalize_withZeroWidthCharacters_shouldDropThem() {
    assert_eq!(normalize("a\u{200B}b\u{FEFF}c\u{200D}d"), "abcd");
}

#[test]
fn test_normalize_withDashes_shouldMapEmDashToDoubleHyphen() {
    assert_eq!(normalize("1\u{2013}2 and a\u{2014}b"), "1-2 and a--b");
    assert_eq!(normalize("\u{2212}5"), "-5");
}

#[test]
fn test_normalize_withSmartQuotes_shouldMapToAsciiQuotes() {
    assert_eq!(
        normalize("\u{201C}quoted\u{201D} and \u{2018}single\u{2019}"),
        "\"quoted\" and 'single'"
    );
}

#[test]
fn test_normalize_withUnrenderableCharacters_shouldRemoveThem() {
    let (out, stats) = normalize_with_stats("ok\u{FFFD}x\u{E000}y\u{0001}z");
    assert_eq!(out, "okxyz");
    assert_eq!(stats.removed, 3);
    assert_eq!(stats.replaced, 0);
}

#[test]
fn test_normalize_withTabNewlineCarriageReturn_shouldKeepThem() {
    let input = "a\tb\nc\rd";
    assert_eq!(normalize(input), input);
}

#[test]
fn test_normalize_shouldBeIdempotent() {
    let input = "A\u{2014}mix of \u{201C}odd\u{201D}\u{00A0}chars\u{2026} with O\u{2082} and \u{223C}";
    let once = normalize(input);
    assert_eq!(normalize(&once), once);
}

#[test]
fn test_normalize_withTildeOperator_shouldKeepIt() {
    // U+223C is formula-converter output; only the typographic tilde
    // variants are folded.
    assert_eq!(normalize("x \u{223C} y"), "x \u{223C} y");
    assert_eq!(normalize("x \u{FF5E} y"), "x ~ y");
}

#[test]
fn test_normalize_withStats_shouldCountReplacements() {
    let (out, stats) = normalize_with_stats("a\u{2026}b\u{2022}c");
    assert_eq!(out, "a...b*c");
    assert_eq!(stats.replaced, 2);
}
