/*!
 * Font discovery for the PDF renderer.
 *
 * The translated output is usually CJK, which the PDF built-in fonts
 * cannot encode, so an external TrueType font is located from a candidate
 * list (explicit config path first, then a bundled fonts directory, then
 * well-known system locations). When nothing loads, rendering degrades to
 * the built-in Helvetica and the degradation is reported rather than
 * failing the job.
 *
 * A second, symbol-oriented font covers the scientific notation ranges
 * (superscripts, Greek, math operators) that text-first CJK fonts often
 * lack.
 */

use log::{info, warn};
use printpdf::{BuiltinFont, IndirectFontRef, PdfDocumentReference};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::app_config::RenderConfig;
use crate::errors::RenderError;

/// Candidate file names tried inside the configured fonts directory.
const BUNDLED_CANDIDATES: &[&str] = &[
    "NotoSansSC-Regular.ttf",
    "SourceHanSansSC-Regular.ttf",
    "DejaVuSans.ttf",
];

/// Well-known system font paths, CJK-capable fonts first.
const SYSTEM_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf",
    "/usr/share/fonts/opentype/source-han-sans/SourceHanSansSC-Regular.otf",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Symbol-coverage fallback candidates.
const SYMBOL_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansMath-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansSymbols2-Regular.ttf",
];

/// Fonts registered in a PDF document, plus how they were obtained.
pub struct FontSet {
    /// Body and heading font; headings reuse it at a larger size because
    /// the built-in bold cannot encode CJK output
    pub primary: IndirectFontRef,
    /// Code font
    pub mono: IndirectFontRef,
    /// Symbol-coverage fallback, when one was found
    pub fallback: Option<IndirectFontRef>,
    /// Name or path of the primary font, for diagnostics
    pub primary_name: String,
    /// Name or path of the fallback font, for diagnostics
    pub fallback_name: Option<String>,
    /// True when no external font loaded and output is built-in-only
    pub degraded: bool,
}

impl FontSet {
    /// Register fonts in `doc` according to the render configuration.
    pub fn load(doc: &PdfDocumentReference, config: &RenderConfig) -> Result<Self, RenderError> {
        let mono = doc
            .add_builtin_font(BuiltinFont::Courier)
            .map_err(|e| RenderError::Font(e.to_string()))?;

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = &config.font_path {
            candidates.push(PathBuf::from(path));
        }
        for name in BUNDLED_CANDIDATES {
            candidates.push(Path::new(&config.font_dir).join(name));
        }
        candidates.extend(SYSTEM_CANDIDATES.iter().map(PathBuf::from));

        let primary_external = candidates
            .iter()
            .find_map(|path| try_load_external(doc, path));

        let (primary, primary_name, degraded) = match primary_external {
            Some((font, name)) => {
                info!("primary font: {name}");
                (font, name, false)
            }
            None => {
                warn!("no external font found, falling back to built-in Helvetica; non-Latin output will not render");
                let font = doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|e| RenderError::Font(e.to_string()))?;
                (font, "Helvetica".to_string(), true)
            }
        };

        // The fallback is only worth registering when it differs from the
        // primary.
        let fallback_pair = SYMBOL_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .filter(|path| path.to_string_lossy() != primary_name)
            .find_map(|path| try_load_external(doc, &path));
        let (fallback, fallback_name) = match fallback_pair {
            Some((font, name)) => {
                info!("symbol fallback font: {name}");
                (Some(font), Some(name))
            }
            None => (None, None),
        };

        Ok(Self {
            primary,
            mono,
            fallback,
            primary_name,
            fallback_name,
            degraded,
        })
    }

    /// Font to use for a single character: the symbol fallback for math
    /// and notation ranges the primary often lacks, the primary otherwise.
    pub fn font_for(&self, c: char) -> &IndirectFontRef {
        if needs_symbol_fallback(c) {
            if let Some(fallback) = &self.fallback {
                return fallback;
            }
        }
        &self.primary
    }
}

fn try_load_external(
    doc: &PdfDocumentReference,
    path: &Path,
) -> Option<(IndirectFontRef, String)> {
    if !path.is_file() {
        return None;
    }
    let file = File::open(path).ok()?;
    match doc.add_external_font(file) {
        Ok(font) => Some((font, path.to_string_lossy().into_owned())),
        Err(e) => {
            warn!("failed to load font {}: {e}", path.display());
            None
        }
    }
}

/// Character ranges routed to the symbol fallback font.
pub fn needs_symbol_fallback(c: char) -> bool {
    matches!(u32::from(c),
        0x00B2 | 0x00B3 | 0x00B9            // Latin-1 superscripts
        | 0x2070..=0x209F                   // superscripts and subscripts
        | 0x0370..=0x03FF                   // Greek
        | 0x2100..=0x214F                   // letterlike symbols
        | 0x2190..=0x21FF                   // arrows
        | 0x2200..=0x22FF                   // mathematical operators
        | 0x2500..=0x257F                   // box drawing
        | 0x25A0..=0x25FF                   // geometric shapes
    )
}
