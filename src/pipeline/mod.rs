/*!
 * Translation pipeline.
 *
 * The orchestrator drives a parsed document through normalization,
 * chunking, concurrent backend translation, the hybrid formula-fix pass,
 * reassembly and the completeness check.
 */

pub mod orchestrator;

pub use orchestrator::{JobStage, ProgressFn, TranslationOutcome, TranslationPipeline};
