//! Port for the rewrite service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{ArtifactSet, TestArtifact};

/// Rewrite service failed or returned unusable output for an artifact.
///
/// Never fatal to a round: the affected artifact is left unrewritten and
/// its defects persist into the next detection pass.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("rewrite service failed: {0}")]
    Service(String),

    #[error("rewrite produced unusable output for {0}")]
    UnusableOutput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rewrites test artifacts, in two modes.
///
/// Both modes must preserve the artifact identifier and its declared
/// structure (class names, runner annotations) unless a smell itself
/// requires renaming, and must return bare source text with no
/// explanatory wrapper content.
#[async_trait]
pub trait TestRewriter: Send + Sync {
    /// Rewrite one artifact to remove the given smell kinds (each kind
    /// appears once regardless of its occurrence count). Returns the
    /// replacement source text.
    async fn rewrite(
        &self,
        artifact: &TestArtifact,
        smells: &[String],
    ) -> Result<String, RewriteError>;

    /// Fix build errors: rewrite the artifacts implicated by the
    /// diagnostic (or the whole set when attribution is ambiguous).
    /// Returns replacement source text keyed by target identifier.
    async fn fix_errors(
        &self,
        artifacts: &ArtifactSet,
        diagnostic: &str,
    ) -> Result<BTreeMap<String, String>, RewriteError>;
}
