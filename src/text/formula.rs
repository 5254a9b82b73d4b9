/*!
 * LaTeX-fragment to Unicode conversion.
 *
 * Parsed academic markdown carries inline (`$...$`) and block (`$$...$$`)
 * math written as a small LaTeX subset. The PDF output has no math layout
 * engine, so formulas are flattened to plain Unicode: Greek letters and
 * operators become their single code point, superscript/subscript groups map
 * through the dedicated digit tables, and anything unknown degrades
 * gracefully by dropping the command marker and braces.
 *
 * The conversion is pure, deterministic and total: it never fails.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize::normalize;

/// Superscript digit and symbol table.
pub const SUPERSCRIPTS: &[(char, char)] = &[
    ('0', '⁰'),
    ('1', '¹'),
    ('2', '²'),
    ('3', '³'),
    ('4', '⁴'),
    ('5', '⁵'),
    ('6', '⁶'),
    ('7', '⁷'),
    ('8', '⁸'),
    ('9', '⁹'),
    ('+', '⁺'),
    ('-', '⁻'),
    ('=', '⁼'),
    ('(', '⁽'),
    (')', '⁾'),
];

/// Subscript digit and symbol table.
pub const SUBSCRIPTS: &[(char, char)] = &[
    ('0', '₀'),
    ('1', '₁'),
    ('2', '₂'),
    ('3', '₃'),
    ('4', '₄'),
    ('5', '₅'),
    ('6', '₆'),
    ('7', '₇'),
    ('8', '₈'),
    ('9', '₉'),
    ('+', '₊'),
    ('-', '₋'),
    ('=', '₌'),
    ('(', '₍'),
    (')', '₎'),
];

/// Greek-letter command table.
const GREEK: &[(&str, &str)] = &[
    (r"\alpha", "α"),
    (r"\beta", "β"),
    (r"\gamma", "γ"),
    (r"\delta", "δ"),
    (r"\Delta", "Δ"),
    (r"\epsilon", "ε"),
    (r"\zeta", "ζ"),
    (r"\eta", "η"),
    (r"\theta", "θ"),
    (r"\Theta", "Θ"),
    (r"\lambda", "λ"),
    (r"\Lambda", "Λ"),
    (r"\mu", "μ"),
    (r"\nu", "ν"),
    (r"\xi", "ξ"),
    (r"\pi", "π"),
    (r"\Pi", "Π"),
    (r"\rho", "ρ"),
    (r"\sigma", "σ"),
    (r"\Sigma", "Σ"),
    (r"\tau", "τ"),
    (r"\phi", "φ"),
    (r"\Phi", "Φ"),
    (r"\chi", "χ"),
    (r"\psi", "ψ"),
    (r"\Psi", "Ψ"),
    (r"\omega", "ω"),
    (r"\Omega", "Ω"),
];

/// Math-operator command table.
const OPERATORS: &[(&str, &str)] = &[
    (r"\sim", "∼"),
    (r"\approx", "≈"),
    (r"\pm", "±"),
    (r"\times", "×"),
    (r"\div", "÷"),
    (r"\leq", "≤"),
    (r"\geq", "≥"),
    (r"\neq", "≠"),
    (r"\infty", "∞"),
    (r"\sum", "∑"),
    (r"\prod", "∏"),
    (r"\int", "∫"),
    (r"\partial", "∂"),
    (r"\nabla", "∇"),
    (r"\cdot", "·"),
];

static MATH_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$?([^$]+)\$\$?").unwrap());
static SUPERSCRIPT_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\{([^}]*)\}").unwrap());
static SUBSCRIPT_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"_\{([^}]*)\}").unwrap());
static SUPERSCRIPT_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^([0-9+-])").unwrap());
static SUBSCRIPT_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([0-9+-])").unwrap());
static MATHRM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\mathrm\{([^}]*)\}").unwrap());
static RESIDUAL_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+").unwrap());

/// Map a single character through a script table, passing unmapped
/// characters through unchanged.
fn map_char(table: &[(char, char)], c: char) -> char {
    table
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

fn map_group(table: &'static [(char, char)], content: &str) -> String {
    content.chars().map(|c| map_char(table, c)).collect()
}

/// Greek and operator commands sorted longest first so e.g. `\sigma` is
/// never clipped by a shorter entry sharing its prefix.
static COMMANDS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    let mut commands: Vec<(&str, &str)> = GREEK.iter().chain(OPERATORS.iter()).copied().collect();
    commands.sort_by_key(|(cmd, _)| std::cmp::Reverse(cmd.len()));
    commands
});

/// Convert a LaTeX fragment to its Unicode rendition.
///
/// Rules are applied in fixed order: command tables, brace groups, bare
/// single-character scripts, `\mathrm` unwrapping, residual command and brace
/// stripping, and a final normalization pass.
pub fn convert_formula(fragment: &str) -> String {
    let mut text = fragment.to_string();

    for (command, unicode) in COMMANDS.iter() {
        if text.contains(command) {
            text = text.replace(command, unicode);
        }
    }

    text = SUPERSCRIPT_GROUP
        .replace_all(&text, |caps: &regex::Captures| {
            map_group(SUPERSCRIPTS, &caps[1])
        })
        .into_owned();
    text = SUBSCRIPT_GROUP
        .replace_all(&text, |caps: &regex::Captures| {
            map_group(SUBSCRIPTS, &caps[1])
        })
        .into_owned();

    text = SUPERSCRIPT_SINGLE
        .replace_all(&text, |caps: &regex::Captures| {
            map_group(SUPERSCRIPTS, &caps[1])
        })
        .into_owned();
    text = SUBSCRIPT_SINGLE
        .replace_all(&text, |caps: &regex::Captures| {
            map_group(SUBSCRIPTS, &caps[1])
        })
        .into_owned();

    text = MATHRM.replace_all(&text, "$1").into_owned();

    // Unknown commands degrade to nothing rather than failing.
    text = RESIDUAL_COMMAND.replace_all(&text, "").into_owned();
    text = text.replace(['{', '}'], "");

    normalize(&text)
}

/// Convert the math notation embedded in mixed prose.
///
/// `$...$` and `$$...$$` spans go through the full conversion; outside the
/// spans only unambiguous notation is touched: known `\command` tokens and
/// `^{...}`/`_{...}` groups. Prose braces and identifiers such as `file_2`
/// pass through unchanged, which the residual-stripping rules of
/// [`convert_formula`] do not guarantee.
pub fn convert_math_spans(text: &str) -> String {
    let mut out = MATH_SPAN
        .replace_all(text, |caps: &regex::Captures| convert_formula(&caps[1]))
        .into_owned();

    for (command, unicode) in COMMANDS.iter() {
        if out.contains(command) {
            out = out.replace(command, unicode);
        }
    }
    out = SUPERSCRIPT_GROUP
        .replace_all(&out, |caps: &regex::Captures| {
            map_group(SUPERSCRIPTS, &caps[1])
        })
        .into_owned();
    out = SUBSCRIPT_GROUP
        .replace_all(&out, |caps: &regex::Captures| {
            map_group(SUBSCRIPTS, &caps[1])
        })
        .into_owned();
    out
}
