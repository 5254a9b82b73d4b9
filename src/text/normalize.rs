/*!
 * Text normalization.
 *
 * Parsed documents arrive full of legacy and invisible code points that
 * translation backends mangle and PDF fonts cannot draw. `normalize` maps a
 * fixed table of those to canonical ASCII equivalents and strips everything
 * that has no visual representation at all.
 *
 * The function is pure and idempotent: every replacement output is plain
 * ASCII that never appears on the left-hand side of the table, so running it
 * twice is the same as running it once.
 */

use log::debug;

/// Fixed replacement table for problem code points.
///
/// Superscript/subscript digits and the tilde operator (U+223C) are kept
/// canonical on purpose: the formula converter produces them and re-runs the
/// normalizer as its final pass, so flattening them here would undo the
/// conversion. The renderer covers those glyphs through its fallback font.
const REPLACEMENTS: &[(char, &str)] = &[
    // Space variants
    ('\u{00A0}', " "),  // NO-BREAK SPACE
    ('\u{2002}', " "),  // EN SPACE
    ('\u{2003}', " "),  // EM SPACE
    ('\u{2008}', " "),  // PUNCTUATION SPACE
    ('\u{2009}', " "),  // THIN SPACE
    ('\u{200A}', " "),  // HAIR SPACE
    ('\u{200B}', ""),   // ZERO WIDTH SPACE
    ('\u{200C}', ""),   // ZERO WIDTH NON-JOINER
    ('\u{200D}', ""),   // ZERO WIDTH JOINER
    ('\u{202F}', " "),  // NARROW NO-BREAK SPACE
    ('\u{3000}', " "),  // IDEOGRAPHIC SPACE
    ('\u{FEFF}', ""),   // ZERO WIDTH NO-BREAK SPACE / BOM
    // Hyphens and dashes
    ('\u{2010}', "-"),  // HYPHEN
    ('\u{2011}', "-"),  // NON-BREAKING HYPHEN
    ('\u{2012}', "-"),  // FIGURE DASH
    ('\u{2013}', "-"),  // EN DASH
    ('\u{2014}', "--"), // EM DASH
    ('\u{2043}', "-"),  // HYPHEN BULLET
    ('\u{2212}', "-"),  // MINUS SIGN
    // Tilde variants (not U+223C, see above)
    ('\u{02DC}', "~"),  // SMALL TILDE
    ('\u{2053}', "~"),  // SWUNG DASH
    ('\u{301C}', "~"),  // WAVE DASH
    ('\u{FF5E}', "~"),  // FULLWIDTH TILDE
    // Low lines
    ('\u{FE4D}', "_"),  // DASHED LOW LINE
    ('\u{FE4E}', "_"),  // CENTRELINE LOW LINE
    ('\u{FE4F}', "_"),  // WAVY LOW LINE
    // Quotes
    ('\u{2018}', "'"),  // LEFT SINGLE QUOTATION MARK
    ('\u{2019}', "'"),  // RIGHT SINGLE QUOTATION MARK
    ('\u{201A}', ","),  // SINGLE LOW-9 QUOTATION MARK
    ('\u{201B}', "'"),  // SINGLE HIGH-REVERSED-9 QUOTATION MARK
    ('\u{201C}', "\""), // LEFT DOUBLE QUOTATION MARK
    ('\u{201D}', "\""), // RIGHT DOUBLE QUOTATION MARK
    ('\u{201E}', "\""), // DOUBLE LOW-9 QUOTATION MARK
    ('\u{201F}', "\""), // DOUBLE HIGH-REVERSED-9 QUOTATION MARK
    ('\u{2032}', "'"),  // PRIME
    ('\u{2033}', "\""), // DOUBLE PRIME
    // Bullets and leaders
    ('\u{00AD}', ""),    // SOFT HYPHEN
    ('\u{2022}', "*"),   // BULLET
    ('\u{2023}', ">"),   // TRIANGULAR BULLET
    ('\u{2024}', "."),   // ONE DOT LEADER
    ('\u{2025}', ".."),  // TWO DOT LEADER
    ('\u{2026}', "..."), // HORIZONTAL ELLIPSIS
    // Whitespace controls folded to plain spaces
    ('\u{000B}', " "), // VERTICAL TAB
    ('\u{000C}', " "), // FORM FEED
];

/// Statistics about what a normalization pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Characters rewritten through the replacement table
    pub replaced: usize,
    /// Characters dropped entirely (replacement char, private use, controls)
    pub removed: usize,
}

fn replacement_for(c: char) -> Option<&'static str> {
    REPLACEMENTS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

/// True for code points that cannot be displayed and carry no meaning:
/// the replacement character, private-use areas, non-characters, and
/// control characters other than tab/newline/carriage-return.
fn is_unrenderable(c: char) -> bool {
    let cp = c as u32;
    matches!(cp, 0xFFFD | 0xFFFE | 0xFFFF)
        || (0xE000..=0xF8FF).contains(&cp)
        || (0xF0000..=0xFFFFD).contains(&cp)
        || (0x10_0000..=0x10_FFFD).contains(&cp)
        || (cp <= 0x1F && !matches!(cp, 0x09 | 0x0A | 0x0D))
}

/// Normalize a text fragment, returning the cleaned string and what changed.
pub fn normalize_with_stats(text: &str) -> (String, NormalizeStats) {
    let mut out = String::with_capacity(text.len());
    let mut stats = NormalizeStats::default();

    for c in text.chars() {
        if let Some(replacement) = replacement_for(c) {
            out.push_str(replacement);
            stats.replaced += 1;
        } else if is_unrenderable(c) {
            stats.removed += 1;
        } else {
            out.push(c);
        }
    }

    (out, stats)
}

/// Normalize a text fragment.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(text: &str) -> String {
    let (out, stats) = normalize_with_stats(text);
    if stats.replaced > 0 || stats.removed > 0 {
        debug!(
            "normalized text: {} replaced, {} removed",
            stats.replaced, stats.removed
        );
    }
    out
}
