/*!
 * HTML markup cleanup for backend responses.
 *
 * AI backends are instructed to emit plain Unicode, but models still slip
 * `<sup>`/`<sub>` and emphasis tags into their output. This pass rewrites
 * script tags through the Unicode digit tables and drops bare emphasis tags
 * while keeping their content.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::formula::{SUBSCRIPTS, SUPERSCRIPTS};

static SUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sup>([^<]+)</sup>").unwrap());
static SUB_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sub>([^<]+)</sub>").unwrap());
static EMPHASIS_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:b|i|strong|em)>").unwrap());

fn map_through(table: &[(char, char)], content: &str) -> String {
    content
        .chars()
        .map(|c| {
            table
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Replace `<sup>`/`<sub>` tags with Unicode script characters and strip
/// emphasis tags, keeping all textual content.
pub fn strip_html_markup(text: &str) -> String {
    let text = SUP_TAG.replace_all(text, |caps: &regex::Captures| {
        map_through(SUPERSCRIPTS, &caps[1])
    });
    let text = SUB_TAG.replace_all(&text, |caps: &regex::Captures| {
        map_through(SUBSCRIPTS, &caps[1])
    });
    EMPHASIS_TAG.replace_all(&text, "").into_owned()
}
