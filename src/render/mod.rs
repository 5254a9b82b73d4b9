/*!
 * PDF rendering of the translated Markdown.
 *
 * The renderer walks the document line by line: headings get larger type,
 * fenced code blocks switch to a monospace font, base64 image markers are
 * decoded and embedded scaled to a fixed bounding box, and everything else
 * flows as wrapped body text with automatic page breaks.
 *
 * Rendering never fails the whole job over one bad element. A broken image
 * degrades to a bracketed alt-text line, characters the degraded built-in
 * font cannot encode are dropped, and each degradation is counted in the
 * diagnostics that accompany the finished bytes.
 */

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info};
use once_cell::sync::Lazy;
use printpdf::{
    Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use regex::Regex;

use crate::app_config::RenderConfig;
use crate::errors::RenderError;
use crate::text::formula::convert_math_spans;

pub mod fonts;

use fonts::{FontSet, needs_symbol_fallback};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

/// Bounding box for embedded images: 6 by 8 inches.
const IMAGE_BOX_WIDTH_MM: f32 = 152.4;
const IMAGE_BOX_HEIGHT_MM: f32 = 203.2;
const IMAGE_DPI: f32 = 300.0;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.5;
const HEADING_SIZES: [f32; 3] = [20.0, 16.0, 14.0];

const PT_TO_MM: f32 = 0.352_778;

static IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]*)\)$").unwrap());

/// Counters describing how faithfully the document rendered.
#[derive(Debug, Default, Clone)]
pub struct RenderDiagnostics {
    /// Name or path of the body font
    pub primary_font: String,
    /// Name or path of the symbol fallback font, when one loaded
    pub fallback_font: Option<String>,
    /// True when only built-in fonts were available
    pub degraded: bool,
    /// Images decoded and embedded
    pub images_embedded: usize,
    /// Images replaced by their alt text
    pub images_skipped: usize,
    /// Lines dropped because the degraded font could not encode them
    pub lines_dropped: usize,
    /// Text runs drawn with the symbol fallback font
    pub fallback_runs: usize,
}

/// A finished PDF plus its render diagnostics.
pub struct RenderedDocument {
    /// Serialized PDF
    pub bytes: Vec<u8>,
    /// What happened on the way there
    pub diagnostics: RenderDiagnostics,
}

/// Renders translated Markdown into a paginated PDF.
#[derive(Debug, Default)]
pub struct DocumentRenderer {
    config: RenderConfig,
}

/// Page-flow state threaded through the render.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    /// Baseline position of the next line, in mm from the page bottom
    y: f32,
}

impl PageWriter<'_> {
    /// Break the page unless `needed` mm of vertical space remain.
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }
}

impl DocumentRenderer {
    /// Create a renderer with the given configuration.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render `markdown` to PDF bytes.
    pub fn render(&self, markdown: &str, title: &str) -> Result<RenderedDocument, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let fonts = FontSet::load(&doc, &self.config)?;
        let mut diagnostics = RenderDiagnostics {
            primary_font: fonts.primary_name.clone(),
            fallback_font: fonts.fallback_name.clone(),
            degraded: fonts.degraded,
            ..Default::default()
        };

        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        };

        let mut in_fence = false;
        for line in markdown.lines() {
            let trimmed = line.trim_end();

            if trimmed.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                self.draw_wrapped(&mut writer, &fonts, trimmed, CODE_SIZE, true, &mut diagnostics);
                continue;
            }
            if trimmed.trim().is_empty() {
                writer.y -= BODY_SIZE * PT_TO_MM * 0.8;
                continue;
            }
            if let Some(caps) = IMAGE_LINE.captures(trimmed.trim()) {
                let alt = caps[1].to_string();
                let target = caps[2].to_string();
                if let Err(e) = self.draw_image(&mut writer, &target) {
                    debug!("image not embedded: {e}");
                    diagnostics.images_skipped += 1;
                    let placeholder = format!("[image: {}]", if alt.is_empty() { "figure" } else { &alt });
                    self.draw_wrapped(&mut writer, &fonts, &placeholder, BODY_SIZE, false, &mut diagnostics);
                } else {
                    diagnostics.images_embedded += 1;
                }
                continue;
            }
            if let Some(rest) = heading_text(trimmed) {
                let level = trimmed.chars().take_while(|c| *c == '#').count();
                let size = HEADING_SIZES[level.saturating_sub(1).min(HEADING_SIZES.len() - 1)];
                writer.y -= size * PT_TO_MM * 0.5;
                let text = prepare_inline(rest);
                self.draw_wrapped(&mut writer, &fonts, &text, size, false, &mut diagnostics);
                writer.y -= size * PT_TO_MM * 0.3;
                continue;
            }

            let text = prepare_inline(trimmed);
            self.draw_wrapped(&mut writer, &fonts, &text, BODY_SIZE, false, &mut diagnostics);
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        info!(
            "rendered {} bytes, {} images embedded, {} skipped, {} fallback runs",
            bytes.len(),
            diagnostics.images_embedded,
            diagnostics.images_skipped,
            diagnostics.fallback_runs
        );
        Ok(RenderedDocument { bytes, diagnostics })
    }

    /// Draw a logical line, wrapping at the content width.
    fn draw_wrapped(
        &self,
        writer: &mut PageWriter<'_>,
        fonts: &FontSet,
        text: &str,
        size: f32,
        mono: bool,
        diagnostics: &mut RenderDiagnostics,
    ) {
        let text = if fonts.degraded {
            // Built-in fonts are WinAnsi-only; drop what they cannot encode.
            let kept: String = text.chars().filter(char::is_ascii).collect();
            if kept.trim().is_empty() && !text.trim().is_empty() {
                diagnostics.lines_dropped += 1;
                return;
            }
            kept
        } else {
            text.to_string()
        };

        let line_height = size * PT_TO_MM * 1.5;
        for physical in wrap_line(&text, size) {
            writer.ensure_space(line_height);
            writer.y -= line_height;
            self.draw_runs(writer, fonts, &physical, size, mono, diagnostics);
        }
    }

    /// Draw one physical line as runs of primary/fallback font.
    fn draw_runs(
        &self,
        writer: &mut PageWriter<'_>,
        fonts: &FontSet,
        line: &str,
        size: f32,
        mono: bool,
        diagnostics: &mut RenderDiagnostics,
    ) {
        let mut x = MARGIN_MM;
        for (uses_fallback, run) in split_runs(line, fonts) {
            let font: &IndirectFontRef = if mono {
                &fonts.mono
            } else if uses_fallback {
                diagnostics.fallback_runs += 1;
                run.chars().next().map_or(&fonts.primary, |c| fonts.font_for(c))
            } else {
                &fonts.primary
            };
            writer
                .layer
                .use_text(run.clone(), size, Mm(x), Mm(writer.y), font);
            x += text_width_mm(&run, size);
        }
    }

    /// Decode and embed a base64 image marker, scaled into the image box.
    fn draw_image(&self, writer: &mut PageWriter<'_>, target: &str) -> Result<(), RenderError> {
        let payload = target
            .split_once(";base64,")
            .map(|(_, data)| data)
            .filter(|_| target.starts_with("data:image/"))
            .ok_or_else(|| RenderError::Pdf("image marker is not inline base64".to_string()))?;
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| RenderError::Pdf(format!("base64 decode failed: {e}")))?;

        let decoded = printpdf::image_crate::load_from_memory(&bytes)
            .map_err(|e| RenderError::Pdf(format!("image decode failed: {e}")))?;
        let width_px = decoded.width() as f32;
        let height_px = decoded.height() as f32;
        let image = Image::from_dynamic_image(&decoded);

        let width_mm = width_px * 25.4 / IMAGE_DPI;
        let height_mm = height_px * 25.4 / IMAGE_DPI;
        let scale = (IMAGE_BOX_WIDTH_MM / width_mm)
            .min(IMAGE_BOX_HEIGHT_MM / height_mm)
            .min(1.0);
        let drawn_height = height_mm * scale;

        writer.ensure_space(drawn_height + 4.0);
        writer.y -= drawn_height;
        image.add_to_layer(
            writer.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(writer.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        writer.y -= 4.0;
        Ok(())
    }
}

/// Heading body when the line is an ATX heading.
fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let rest = trimmed.trim_start_matches('#');
    rest.strip_prefix(' ').or(Some(rest)).map(str::trim)
}

/// Inline cleanup before drawing: math spans become Unicode, emphasis and
/// code markers disappear.
fn prepare_inline(line: &str) -> String {
    convert_math_spans(line)
        .replace("**", "")
        .replace("__", "")
        .replace('`', "")
}

/// Approximate advance width of `text` at `size` points, in mm.
///
/// Good enough for wrapping: CJK and other wide glyphs count as one em,
/// ASCII as half.
fn text_width_mm(text: &str, size: f32) -> f32 {
    let em = size * PT_TO_MM;
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                em * 0.5
            } else if needs_symbol_fallback(c) {
                em * 0.6
            } else {
                em
            }
        })
        .sum()
}

/// Wrap a logical line into physical lines that fit the content width.
fn wrap_line(text: &str, size: f32) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0f32;
    for c in text.chars() {
        let advance = text_width_mm(&c.to_string(), size);
        if width + advance > CONTENT_WIDTH_MM && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(c);
        width += advance;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a line into maximal runs sharing one font choice.
fn split_runs(line: &str, fonts: &FontSet) -> Vec<(bool, String)> {
    if fonts.fallback.is_none() {
        return vec![(false, line.to_string())];
    }
    let mut runs: Vec<(bool, String)> = Vec::new();
    for c in line.chars() {
        let fallback = needs_symbol_fallback(c);
        match runs.last_mut() {
            Some((f, run)) if *f == fallback => run.push(c),
            _ => runs.push((fallback, c.to_string())),
        }
    }
    runs
}
