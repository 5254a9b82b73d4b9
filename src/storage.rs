/*!
 * Per-job artifact storage.
 *
 * Every job gets its own directory under the system temp dir, keyed by a
 * random job id. Intermediate artifacts (parsed markdown, translated
 * markdown) are persisted alongside the final PDF so a failed or
 * unsatisfying run can be inspected and re-rendered without repeating the
 * parse and translation work.
 */

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Artifact directory for one translation job.
#[derive(Debug)]
pub struct JobStore {
    job_id: Uuid,
    dir: PathBuf,
}

impl JobStore {
    /// Create a fresh job directory.
    pub fn create() -> Result<Self> {
        let job_id = Uuid::new_v4();
        let dir = std::env::temp_dir().join("scitrans").join(job_id.to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create job directory {}", dir.display()))?;
        info!("job {} artifacts in {}", job_id, dir.display());
        Ok(Self { job_id, dir })
    }

    /// Identifier of this job.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Directory holding this job's artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the parsed source markdown.
    pub fn save_source(&self, markdown: &str) -> Result<PathBuf> {
        self.write("source.md", markdown.as_bytes())
    }

    /// Persist the translated markdown.
    pub fn save_translation(&self, markdown: &str) -> Result<PathBuf> {
        self.write("translated.md", markdown.as_bytes())
    }

    /// Persist the rendered PDF.
    pub fn save_pdf(&self, bytes: &[u8]) -> Result<PathBuf> {
        self.write("output.pdf", bytes)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;
        Ok(path)
    }
}
