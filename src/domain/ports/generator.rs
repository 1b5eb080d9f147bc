//! Port for the external test-generation tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::ArtifactSet;

/// Generator tool failed outright. Always fatal: the run aborts before
/// any remediation round starts.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generator jar not found at {0}")]
    ToolMissing(PathBuf),

    #[error("target project build failed: {0}")]
    ProjectBuildFailed(String),

    #[error("no target classes could be determined under {0}")]
    NoTargets(PathBuf),

    #[error("generator exited with status {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generates test artifacts for production targets.
#[async_trait]
pub trait TestGenerator: Send + Sync {
    /// Generate tests for `targets` into `output_dir` and return the
    /// resulting artifact set. An empty target list means "all
    /// discoverable targets".
    async fn generate(
        &self,
        targets: &[String],
        output_dir: &Path,
    ) -> Result<ArtifactSet, GenerationError>;
}
