/*!
 * Tests for PDF rendering
 */

use scitrans::app_config::RenderConfig;
use scitrans::render::DocumentRenderer;

use crate::common::TEST_PNG_BASE64;

fn renderer() -> DocumentRenderer {
    DocumentRenderer::new(RenderConfig::default())
}

#[test]
fn test_render_withSimpleMarkdown_shouldProducePdfBytes() {
    let markdown = "# Title\n\nA body paragraph with some text.\n\n## Section\n\nMore text.";
    let rendered = renderer().render(markdown, "test").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.diagnostics.images_embedded, 0);
    assert_eq!(rendered.diagnostics.images_skipped, 0);
}

#[test]
fn test_render_withInlineBase64Image_shouldEmbedIt() {
    let markdown = format!(
        "Before the figure.\n\n![figure 1](data:image/png;base64,{TEST_PNG_BASE64})\n\nAfter the figure."
    );
    let rendered = renderer().render(&markdown, "test").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.diagnostics.images_embedded, 1);
    assert_eq!(rendered.diagnostics.images_skipped, 0);
}

#[test]
fn test_render_withCorruptImage_shouldDegradeToAltText() {
    let markdown = "text\n\n![broken figure](data:image/png;base64,not-base64!!!)\n\nmore text";
    let rendered = renderer().render(markdown, "test").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.diagnostics.images_embedded, 0);
    assert_eq!(rendered.diagnostics.images_skipped, 1);
}

#[test]
fn test_render_withExternalImageReference_shouldSkipNotFail() {
    let markdown = "![chart](figures/chart.png)";
    let rendered = renderer().render(markdown, "test").unwrap();
    assert_eq!(rendered.diagnostics.images_skipped, 1);
}

#[test]
fn test_render_withMathSpans_shouldNotFail() {
    let markdown = "Uptake of $^{13}C$ scaled with $O_{2}$ as $\\alpha \\pm 0.3$.";
    let rendered = renderer().render(markdown, "test").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
}

#[test]
fn test_render_withLongDocument_shouldPaginate() {
    let paragraph = "A reasonably long paragraph of body text that wraps. ".repeat(5);
    let markdown = vec![paragraph; 60].join("\n\n");
    let rendered = renderer().render(&markdown, "test").unwrap();
    // More pages means more bytes; mostly this asserts no panic on page
    // breaks.
    assert!(rendered.bytes.len() > 2000);
}

#[test]
fn test_render_withCodeFence_shouldNotFail() {
    let markdown = "intro\n\n```\nlet x: u32 = 1;\nlet y = x + 1;\n```\n\noutro";
    let rendered = renderer().render(markdown, "test").unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
}
