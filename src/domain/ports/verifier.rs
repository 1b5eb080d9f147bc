//! Port for build/test verification.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{ArtifactSet, VerificationResult};

/// Infrastructure failure while trying to verify. Fatal to the run, as
/// opposed to a failing build, which is reported through
/// [`VerificationResult`] and handled by the escalation sub-loop.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("build tool `{0}` not found on PATH")]
    ToolMissing(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs a full clean build and test execution over the artifact set.
///
/// A build/compile failure yields `passed = false` with the diagnostic
/// output when available. Runtime-only test failures (compilation and
/// execution completed, some tests red) are reported as passed: the
/// gate is buildability, not the target's own test outcomes.
#[async_trait]
pub trait BuildVerifier: Send + Sync {
    async fn verify(&self, artifacts: &ArtifactSet)
        -> Result<VerificationResult, VerificationError>;
}
