/*!
 * # scitrans - Scientific Document Translation
 *
 * A Rust library for translating parsed academic documents while keeping
 * their mathematical notation and structure intact.
 *
 * ## Features
 *
 * - Parse PDFs into Markdown through an external parsing service
 * - Translate with a fast machine-translation backend, an AI backend, or
 *   both (hybrid mode: fast translation plus an AI formula-fix pass)
 * - Convert LaTeX math to plain Unicode notation
 * - Protect embedded images from backend corruption with reversible
 *   placeholders
 * - Fail open: a backend outage degrades quality, never availability
 * - Render the translated document back to PDF with CJK-capable fonts and
 *   a symbol fallback for scientific notation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `parsing`: Client for the asynchronous document-parsing service
 * - `text`: Pure text stages:
 *   - `text::normalize`: Unicode character hygiene
 *   - `text::formula`: LaTeX-to-Unicode conversion
 *   - `text::chunker`: Structure-preserving chunking and reassembly
 *   - `text::placeholders`: Reversible image-marker protection
 *   - `text::completeness`: Source-versus-output completeness check
 * - `backends`: Translation backend trait, retry policy, and the fast,
 *   AI, and mock implementations
 * - `pipeline`: The job orchestrator
 * - `render`: PDF output with font discovery and fallback
 * - `storage`: Per-job artifact persistence
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod backends;
pub mod errors;
pub mod parsing;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod text;

// Re-export main types for easier usage
pub use app_config::{Config, TranslationMode};
pub use backends::{RetryStrategy, TranslationBackend};
pub use errors::{AppError, BackendError, ParsingServiceError, RenderError};
pub use parsing::{ParseOptions, ParsingClient};
pub use pipeline::{TranslationOutcome, TranslationPipeline};
pub use render::{DocumentRenderer, RenderedDocument};
pub use storage::JobStore;
