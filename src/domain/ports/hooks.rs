//! Pre/post verification hooks.
//!
//! Some generators emit annotations the build environment cannot always
//! execute; working around that requires patching generated sources
//! before verification and restoring them afterwards. The pipeline calls
//! this narrow interface without inspecting what the hook does.

use async_trait::async_trait;

use crate::domain::models::ArtifactSet;

/// Invoked around every verification attempt.
#[async_trait]
pub trait VerificationHook: Send + Sync {
    async fn before_verify(&self, artifacts: &ArtifactSet) -> std::io::Result<()>;

    async fn after_verify(&self, artifacts: &ArtifactSet) -> std::io::Result<()>;
}

/// Default hook: does nothing.
pub struct NoopHook;

#[async_trait]
impl VerificationHook for NoopHook {
    async fn before_verify(&self, _artifacts: &ArtifactSet) -> std::io::Result<()> {
        Ok(())
    }

    async fn after_verify(&self, _artifacts: &ArtifactSet) -> std::io::Result<()> {
        Ok(())
    }
}
