//! Port for the external smell-detection tool.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{SmellReport, TestArtifact};

/// Detector failure.
///
/// `ToolMissing` is an infrastructure failure and fatal to the run; the
/// remaining variants are scoped to a single artifact, whose defect
/// contribution is skipped while the pass continues.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector jar not found at {0}")]
    ToolMissing(PathBuf),

    #[error("detector exited with status {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    #[error("malformed detector report at {path}: {reason}")]
    MalformedReport { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectionError {
    /// Whether the failure poisons the whole pass rather than one artifact.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolMissing(_))
    }
}

/// One detection result: the parsed report plus the location of the raw
/// detector output, recorded in the per-pass summary.
#[derive(Debug, Clone)]
pub struct DetectorOutput {
    pub report: SmellReport,
    pub report_path: PathBuf,
}

/// Detects smells in a single test artifact.
///
/// Implementations infer the production counterpart from the artifact's
/// file name (test-naming suffix stripped, mirrored path); a missing
/// counterpart is not fatal and detection proceeds without it.
#[async_trait]
pub trait SmellDetector: Send + Sync {
    async fn detect(&self, artifact: &TestArtifact) -> Result<DetectorOutput, DetectionError>;
}
