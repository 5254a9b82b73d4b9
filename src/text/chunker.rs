/*!
 * Structure-preserving chunking.
 *
 * Translation backends have request-size limits, so the document is cut into
 * ordered chunks at paragraph boundaries. Image markers and fenced code
 * blocks become atomic chunks that are never merged with surrounding text or
 * split internally. Oversized paragraphs fall back to sentence-boundary
 * splitting.
 *
 * Invariant: `reassemble(&chunk(text, n))` reconstructs the input up to the
 * blank-line separator convention already applied by normalization.
 */

/// Structural category of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// One or more body paragraphs packed together
    Paragraph,
    /// A single heading line
    Heading,
    /// An image marker line, passed through backends untouched
    ImageMarker,
    /// A fenced code block, passed through backends untouched
    CodeBlock,
}

/// Ordered unit of the document.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the document; uniquely determines reassembly order
    pub index: usize,
    /// Structural category
    pub kind: ChunkKind,
    /// Chunk text
    pub text: String,
    /// Atomic chunks are never split, merged, or sent to a backend
    pub atomic: bool,
    /// Set on sentence-level splits of an oversized paragraph: the chunk
    /// re-joins its predecessor directly instead of after a blank line
    pub continuation: bool,
}

impl Chunk {
    fn new(index: usize, kind: ChunkKind, text: String) -> Self {
        let atomic = matches!(kind, ChunkKind::ImageMarker | ChunkKind::CodeBlock);
        Self {
            index,
            kind,
            text,
            atomic,
            continuation: false,
        }
    }
}

/// A paragraph-level block produced by the fence-aware pre-pass.
struct Block {
    text: String,
    kind: ChunkKind,
}

fn classify_block(text: &str) -> ChunkKind {
    let trimmed = text.trim_start();
    if trimmed.starts_with("![") || trimmed.starts_with("<img") {
        ChunkKind::ImageMarker
    } else if trimmed.starts_with("```") {
        ChunkKind::CodeBlock
    } else if trimmed.starts_with('#') {
        ChunkKind::Heading
    } else {
        ChunkKind::Paragraph
    }
}

/// Split text into blank-line separated blocks, keeping each fenced code
/// block together as a single block even when it contains blank lines.
fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |lines: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !lines.is_empty() {
            let text = lines.join("\n");
            let kind = classify_block(&text);
            blocks.push(Block { text, kind });
            lines.clear();
        }
    };

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_fence {
                current.push(line);
                flush(&mut current, &mut blocks);
                in_fence = false;
            } else {
                flush(&mut current, &mut blocks);
                current.push(line);
                in_fence = true;
            }
            continue;
        }
        if in_fence {
            current.push(line);
        } else if line.trim().is_empty() {
            flush(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

/// Split an oversized paragraph into sentence groups whose concatenation is
/// exactly the input. A single sentence longer than `max_size` is emitted
/// alone; sentence granularity is the floor.
fn split_sentences(paragraph: &str, max_size: usize) -> Vec<String> {
    let parts: Vec<&str> = paragraph.split(". ").collect();
    let mut groups = Vec::new();
    let mut current = String::new();

    for (i, part) in parts.iter().enumerate() {
        let piece = if i + 1 < parts.len() {
            format!("{part}. ")
        } else {
            (*part).to_string()
        };
        if !current.is_empty() && current.len() + piece.len() > max_size {
            groups.push(std::mem::take(&mut current));
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Cut `text` into ordered chunks of at most `max_size` characters each
/// (atomic chunks excepted: they are emitted whole regardless of size).
pub fn chunk(text: &str, max_size: usize) -> Vec<Chunk> {
    let max_size = max_size.max(1);
    let blocks = split_blocks(text);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut acc = String::new();
    let mut acc_kind = ChunkKind::Paragraph;
    let mut acc_blocks = 0usize;

    let flush_acc =
        |acc: &mut String, acc_kind: &mut ChunkKind, acc_blocks: &mut usize, chunks: &mut Vec<Chunk>| {
            if !acc.is_empty() {
                let kind = if *acc_blocks == 1 { *acc_kind } else { ChunkKind::Paragraph };
                chunks.push(Chunk::new(chunks.len(), kind, std::mem::take(acc)));
                *acc_blocks = 0;
                *acc_kind = ChunkKind::Paragraph;
            }
        };

    for block in blocks {
        if matches!(block.kind, ChunkKind::ImageMarker | ChunkKind::CodeBlock) {
            flush_acc(&mut acc, &mut acc_kind, &mut acc_blocks, &mut chunks);
            chunks.push(Chunk::new(chunks.len(), block.kind, block.text));
            continue;
        }

        if block.text.len() > max_size {
            flush_acc(&mut acc, &mut acc_kind, &mut acc_blocks, &mut chunks);
            for (i, group) in split_sentences(&block.text, max_size).into_iter().enumerate() {
                let mut piece = Chunk::new(chunks.len(), ChunkKind::Paragraph, group);
                piece.continuation = i > 0;
                chunks.push(piece);
            }
            continue;
        }

        if acc.is_empty() {
            acc = block.text;
            acc_kind = block.kind;
            acc_blocks = 1;
        } else if acc.len() + block.text.len() + 2 <= max_size {
            acc.push_str("\n\n");
            acc.push_str(&block.text);
            acc_blocks += 1;
        } else {
            flush_acc(&mut acc, &mut acc_kind, &mut acc_blocks, &mut chunks);
            acc = block.text;
            acc_kind = block.kind;
            acc_blocks = 1;
        }
    }
    flush_acc(&mut acc, &mut acc_kind, &mut acc_blocks, &mut chunks);

    chunks
}

/// Join chunk texts back into a document, in ascending index order.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);

    let mut out = String::new();
    for chunk in ordered {
        if !out.is_empty() && !chunk.continuation {
            out.push_str("\n\n");
        }
        out.push_str(&chunk.text);
    }
    out
}
