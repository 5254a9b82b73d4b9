/*!
 * Tests for structure-preserving chunking
 */

use scitrans::text::chunker::{ChunkKind, chunk, reassemble};
use scitrans::text::placeholders::ImageGuard;

use crate::common::sample_document;

#[test]
fn test_chunk_withSmallDocument_shouldPackIntoOneChunk() {
    let text = "First paragraph.\n\nSecond paragraph.";
    let chunks = chunk(text, 5000);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn test_chunk_withImageMarker_shouldEmitAtomicChunk() {
    let chunks = chunk(&sample_document(), 5000);
    let image: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::ImageMarker).collect();
    assert_eq!(image.len(), 1);
    assert!(image[0].atomic);
    assert!(image[0].text.contains("base64"));
}

#[test]
fn test_chunk_withSizeLimit_shouldRespectIt() {
    let paragraphs: Vec<String> = (0..20).map(|i| format!("Paragraph number {i} text.")).collect();
    let text = paragraphs.join("\n\n");
    let chunks = chunk(&text, 60);
    assert!(chunks.len() > 1);
    for c in &chunks {
        assert!(c.text.len() <= 60, "chunk too large: {}", c.text.len());
    }
}

#[test]
fn test_chunk_withOversizedParagraph_shouldSplitAtSentences() {
    let text = "Sentence one is here. Sentence two is here. Sentence three is here.";
    let chunks = chunk(text, 30);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().skip(1).all(|c| c.continuation));
    assert_eq!(reassemble(&chunks), text);
}

#[test]
fn test_chunk_withFencedCode_shouldKeepBlockAtomic() {
    let text = "intro\n\n```\nlet x = 1;\n\nlet y = 2;\n```\n\noutro";
    let chunks = chunk(text, 10);
    let code: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::CodeBlock).collect();
    assert_eq!(code.len(), 1);
    assert!(code[0].atomic);
    assert!(code[0].text.contains("let y = 2;"));
}

#[test]
fn test_reassemble_withShuffledChunks_shouldRestoreDocumentOrder() {
    let text = "Alpha paragraph.\n\nBeta paragraph.\n\nGamma paragraph.";
    let mut chunks = chunk(text, 20);
    chunks.reverse();
    assert_eq!(reassemble(&chunks), text);
}

#[test]
fn test_chunk_andReassemble_shouldRoundTripSampleDocument() {
    let text = sample_document();
    let chunks = chunk(&text, 80);
    assert_eq!(reassemble(&chunks), text);
}

#[test]
fn test_image_guard_onChunkText_shouldRoundTrip() {
    let text = sample_document();
    let (protected, guard) = ImageGuard::protect(&text);
    assert_eq!(guard.len(), 1);
    assert!(!protected.contains("base64"));
    assert_eq!(guard.restore(&protected), text);
}
