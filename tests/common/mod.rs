/*!
 * Common test utilities for the scitrans test suite
 */

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use scitrans::backends::RetryStrategy;
use scitrans::backends::mock::RecordingSleeper;

/// A valid 1x1 PNG, base64-encoded, for image-embedding tests.
pub const TEST_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A retry strategy whose sleeps are recorded instead of waited out,
/// returned together with the sleeper for inspection.
pub fn recording_retry(max_attempts: u32, backoff_cap_secs: u64) -> (RetryStrategy, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let retry = RetryStrategy::with_sleeper(max_attempts, backoff_cap_secs, sleeper.clone());
    (retry, sleeper)
}

/// A small parsed academic document exercising every structural element.
pub fn sample_document() -> String {
    format!(
        "# Carbon Isotope Dynamics\n\n\
         The enrichment of $^{{13}}C$ tracks photosynthetic uptake. Oxygen $O_{{2}}$ \
         saturation stays near the surface value.\n\n\
         ![figure 1](data:image/png;base64,{TEST_PNG_BASE64})\n\n\
         Rates vary between sites. Deviations of $\\pm 0.3$ per mil were observed."
    )
}
