//! The remediation pipeline: drives generate → detect → rewrite →
//! verify → re-detect to convergence or a terminal stop condition.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::models::{
    ArtifactSet, CompileAttempt, PipelineState, TerminalStatus, TestArtifact,
};
use crate::domain::ports::{
    BuildVerifier, SmellDetector, TestGenerator, TestRewriter, VerificationHook,
};
use crate::services::{ArchiveSink, DetectionService};

/// Loop budgets, fixed at construction.
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    /// Remediation rounds before the run is declared stagnant.
    pub max_rounds: u32,

    /// Verification attempts per round. Must be at least 1.
    pub max_compile_attempts: u32,

    /// Fixed delay between escalation attempts.
    pub backoff: Duration,
}

impl PipelineLimits {
    pub fn new(max_rounds: u32, max_compile_attempts: u32, backoff: Duration) -> Self {
        assert!(
            max_compile_attempts >= 1,
            "max_compile_attempts must be at least 1"
        );
        Self {
            max_rounds,
            max_compile_attempts,
            backoff,
        }
    }
}

/// The convergence loop controller.
///
/// Owns the [`PipelineState`] for one run and is its only writer; every
/// stage is awaited to completion before the next begins, so detection
/// always observes a settled artifact set.
pub struct RemediationPipeline {
    generator: Arc<dyn TestGenerator>,
    rewriter: Arc<dyn TestRewriter>,
    verifier: Arc<dyn BuildVerifier>,
    hook: Arc<dyn VerificationHook>,
    detection: DetectionService,
    archive: ArchiveSink,
    generated_dir: PathBuf,
    limits: PipelineLimits,
    state: PipelineState,
}

impl RemediationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: Arc<dyn TestGenerator>,
        detector: Arc<dyn SmellDetector>,
        rewriter: Arc<dyn TestRewriter>,
        verifier: Arc<dyn BuildVerifier>,
        hook: Arc<dyn VerificationHook>,
        archive: ArchiveSink,
        generated_dir: PathBuf,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            generator,
            rewriter,
            verifier,
            hook,
            detection: DetectionService::new(detector),
            archive,
            generated_dir,
            limits,
            state: PipelineState::new(),
        }
    }

    /// Control state, read-only. Exposed for observability and tests.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Run the remediation loop for the given targets (empty = all
    /// discoverable targets).
    ///
    /// Returns the terminal status. Fatal adapter failures (generation
    /// errors, a missing detector or build tool) propagate as errors;
    /// everything else degrades to "this artifact did not improve this
    /// round" and is visible only in the logs.
    pub async fn run(&mut self, targets: &[String]) -> Result<TerminalStatus> {
        info!(run_id = %self.state.run_id, "starting remediation run");

        let mut artifacts = self
            .generator
            .generate(targets, &self.generated_dir)
            .await
            .context("test generation failed")?;
        info!(artifacts = artifacts.len(), "test generation complete");

        self.archive
            .snapshot_baseline(&self.generated_dir)
            .context("failed to snapshot baseline tests")?;

        self.detect(&artifacts, "detected").await?;

        loop {
            if !self.state.round_state().has_defects() {
                self.state.settle(TerminalStatus::Converged);
                break;
            }
            if self.state.round() >= self.limits.max_rounds {
                self.state.settle(TerminalStatus::Stagnant);
                break;
            }

            let round = self.state.advance_round();
            info!(round, "starting refactor round");

            self.rewrite_smelly(&mut artifacts, round).await?;

            if !self.verify_with_escalation(&mut artifacts, round).await? {
                self.state.settle(TerminalStatus::EscalationExhausted);
                break;
            }

            self.detect(&artifacts, "remaining").await?;
        }

        let status = self
            .state
            .status()
            .context("pipeline ended without a terminal status")?;
        match status {
            TerminalStatus::Converged => info!(%status, "all smells removed"),
            TerminalStatus::Stagnant => info!(%status, "round budget reached, smells remain"),
            TerminalStatus::EscalationExhausted => {
                info!(%status, round = self.state.round(), "verification attempts exhausted");
            }
        }
        Ok(status)
    }

    /// One detection pass: aggregate, log the phase summary, persist the
    /// report index, and install the new round state.
    async fn detect(&mut self, artifacts: &ArtifactSet, phase: &str) -> Result<()> {
        let pass = self
            .detection
            .detect_all(artifacts)
            .await
            .context("smell detection failed")?;
        DetectionService::log_summary(&pass.state, phase);
        self.archive
            .write_report_index(&pass.report_paths)
            .context("failed to write smell report index")?;
        self.state.observe(pass.state);
        Ok(())
    }

    /// Rewrite every artifact carrying at least one smell. A failed
    /// rewrite leaves that artifact unchanged for the round.
    async fn rewrite_smelly(&mut self, artifacts: &mut ArtifactSet, round: u32) -> Result<()> {
        let smelly: Vec<(String, Vec<String>)> = self
            .state
            .round_state()
            .smelly()
            .map(|(target, report)| (target.to_string(), report.kinds()))
            .collect();

        for (target, kinds) in smelly {
            let Some(artifact) = artifacts.get(&target).cloned() else {
                warn!(target_class = %target, "smelly artifact missing from the active set");
                continue;
            };

            debug!(target_class = %target, smells = ?kinds, "requesting rewrite");
            match self.rewriter.rewrite(&artifact, &kinds).await {
                Ok(source) => {
                    let updated = artifact.superseded(source, round);
                    self.persist(artifacts, &updated).await?;
                    self.archive
                        .archive_round_artifact(round, &updated)
                        .context("failed to archive rewritten artifact")?;
                    artifacts.supersede(updated);
                }
                Err(err) => {
                    warn!(
                        target_class = %target,
                        error = %err,
                        "rewrite failed, artifact left unchanged this round"
                    );
                }
            }
        }
        Ok(())
    }

    /// The escalation sub-loop: verify up to the attempt budget, asking
    /// the rewriter to fix build errors between failed attempts.
    ///
    /// Returns false when every attempt failed; the caller stops the run
    /// without consuming further rounds.
    async fn verify_with_escalation(
        &mut self,
        artifacts: &mut ArtifactSet,
        round: u32,
    ) -> Result<bool> {
        for attempt in 1..=self.limits.max_compile_attempts {
            info!(attempt, "verification attempt");

            self.hook
                .before_verify(artifacts)
                .await
                .context("pre-verification hook failed")?;
            let result = self
                .verifier
                .verify(artifacts)
                .await
                .context("build verification could not run")?;
            self.hook
                .after_verify(artifacts)
                .await
                .context("post-verification hook failed")?;

            self.state.record_attempt(CompileAttempt::new(attempt, &result));

            if result.passed {
                info!(attempt, "build verified");
                return Ok(true);
            }

            if attempt == self.limits.max_compile_attempts {
                break;
            }

            // A failure without diagnostic output still consumes the
            // attempt and backs off, but cannot drive an error-fix
            // rewrite.
            match &result.diagnostic {
                Some(diagnostic) => {
                    warn!(attempt, "build failed, requesting error fixes");
                    match self.rewriter.fix_errors(artifacts, diagnostic).await {
                        Ok(fixes) => {
                            self.apply_fixes(artifacts, fixes, round, attempt).await?;
                        }
                        Err(err) => {
                            warn!(
                                error = %err,
                                "error-fix rewrite failed, retrying verification unchanged"
                            );
                        }
                    }
                }
                None => {
                    warn!(attempt, "build failed with no diagnostic output, skipping error fixes");
                }
            }

            sleep(self.limits.backoff).await;
        }
        Ok(false)
    }

    async fn apply_fixes(
        &self,
        artifacts: &mut ArtifactSet,
        fixes: BTreeMap<String, String>,
        round: u32,
        attempt: u32,
    ) -> Result<()> {
        for (target, source) in fixes {
            let Some(artifact) = artifacts.get(&target).cloned() else {
                warn!(target_class = %target, "rewriter returned a fix for an unknown artifact");
                continue;
            };
            let updated = artifact.superseded(source, round);
            self.persist(artifacts, &updated).await?;
            self.archive
                .archive_attempt_artifact(round, attempt, &updated)
                .context("failed to archive error-fix artifact")?;
            artifacts.supersede(updated);
        }
        Ok(())
    }

    /// Replace the on-disk version of an artifact. The pipeline is the
    /// only writer of the generated tree during a run.
    async fn persist(&self, artifacts: &ArtifactSet, updated: &TestArtifact) -> Result<()> {
        let path = artifacts.abs_path(updated);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, updated.source())
            .await
            .with_context(|| format!("failed to persist {}", path.display()))?;
        Ok(())
    }
}
