/*!
 * Reversible image-marker protection.
 *
 * Backends must never see base64 image payloads: a model rewriting even one
 * byte corrupts the image. Before any backend call, markdown image markers
 * are swapped for numbered placeholders; after the call the original marker
 * text is restored byte-identically.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^\)]+\)").unwrap());

fn placeholder(index: usize) -> String {
    format!("<<<IMAGE_PLACEHOLDER_{index}>>>")
}

/// Image markers extracted from a text fragment, in order of appearance.
#[derive(Debug, Default)]
pub struct ImageGuard {
    markers: Vec<String>,
}

impl ImageGuard {
    /// Replace every image marker in `text` with a numbered placeholder,
    /// recording the original marker text.
    pub fn protect(text: &str) -> (String, Self) {
        let mut markers = Vec::new();
        let protected = IMAGE_MARKER
            .replace_all(text, |caps: &regex::Captures| {
                let token = placeholder(markers.len());
                markers.push(caps[0].to_string());
                token
            })
            .into_owned();
        (protected, Self { markers })
    }

    /// Restore the recorded markers. Placeholders the backend dropped stay
    /// dropped; everything restored is byte-identical to the original.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (i, marker) in self.markers.iter().enumerate() {
            out = out.replace(&placeholder(i), marker);
        }
        out
    }

    /// Number of markers under protection.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// True when no markers were found.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
