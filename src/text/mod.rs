/*!
 * Deterministic text transforms.
 *
 * Everything in this module is pure: normalization, LaTeX-to-Unicode formula
 * conversion, markup cleanup, chunking, image-marker protection, and the
 * completeness heuristic. No I/O, no shared state.
 */

pub mod chunker;
pub mod completeness;
pub mod formula;
pub mod markup;
pub mod normalize;
pub mod placeholders;
