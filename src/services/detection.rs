//! Detection pass orchestration and phase summaries.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use comfy_table::Table;
use tracing::{info, warn};

use crate::domain::models::{ArtifactSet, RoundState};
use crate::domain::ports::{DetectionError, SmellDetector};

/// Result of one detection pass: the aggregated round state plus the
/// location of each artifact's raw detector output.
#[derive(Debug, Clone, Default)]
pub struct DetectionPass {
    pub state: RoundState,
    pub report_paths: BTreeMap<String, PathBuf>,
}

/// Runs the smell detector over an artifact set and aggregates the
/// per-artifact reports into a [`RoundState`].
pub struct DetectionService {
    detector: Arc<dyn SmellDetector>,
}

impl DetectionService {
    pub fn new(detector: Arc<dyn SmellDetector>) -> Self {
        Self { detector }
    }

    /// Detect smells in every artifact of the set.
    ///
    /// A per-artifact detector failure skips that artifact's contribution
    /// and continues; an infrastructure failure (detector missing) aborts
    /// the pass.
    pub async fn detect_all(&self, artifacts: &ArtifactSet) -> Result<DetectionPass, DetectionError> {
        let mut pass = DetectionPass::default();

        for artifact in artifacts.iter() {
            match self.detector.detect(artifact).await {
                Ok(output) => {
                    pass.state.insert(artifact.target(), output.report);
                    pass.report_paths
                        .insert(artifact.target().to_string(), output.report_path);
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(
                        target_class = artifact.target(),
                        error = %err,
                        "smell detection failed for artifact, skipping its contribution"
                    );
                }
            }
        }

        Ok(pass)
    }

    /// Emit the phase summary: aggregate counts, per-class method counts,
    /// and the outstanding smell list. Observability only; nothing reads
    /// this back.
    pub fn log_summary(state: &RoundState, phase: &str) {
        info!(
            phase,
            classes = state.class_count(),
            methods = state.total_methods(),
            smells = state.total_defects(),
            "smell detection summary"
        );

        if state.class_count() > 0 {
            let mut table = Table::new();
            table.set_header(vec!["test class", "methods"]);
            for (target, methods) in state.method_counts() {
                table.add_row(vec![target.clone(), methods.to_string()]);
            }
            info!("method count by class:\n{table}");
        }

        if state.has_defects() {
            for (target, report) in state.smelly() {
                for (kind, count) in report.counts() {
                    info!(target_class = target, smell = kind.as_str(), count, "outstanding smell");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;

    use crate::domain::models::{SmellReport, TestArtifact};
    use crate::domain::ports::DetectorOutput;

    struct ScriptedDetector {
        fail_for: Vec<String>,
        fatal: bool,
    }

    #[async_trait]
    impl SmellDetector for ScriptedDetector {
        async fn detect(
            &self,
            artifact: &TestArtifact,
        ) -> Result<DetectorOutput, DetectionError> {
            if self.fail_for.iter().any(|t| t == artifact.target()) {
                if self.fatal {
                    return Err(DetectionError::ToolMissing(PathBuf::from("missing.jar")));
                }
                return Err(DetectionError::ToolFailed {
                    status: 1,
                    stderr: "parse error".into(),
                });
            }
            Ok(DetectorOutput {
                report: SmellReport::new([("EagerTest".to_string(), 1)], 3),
                report_path: PathBuf::from(format!("{}.csv", artifact.target())),
            })
        }
    }

    fn artifact_set(targets: &[&str]) -> ArtifactSet {
        let mut set = ArtifactSet::new(PathBuf::from("/tmp/generated"));
        for t in targets {
            let rel = format!("{}_ESTest.java", t.replace('.', "/"));
            set.insert(TestArtifact::new(Path::new(&rel).to_path_buf(), String::new(), 0));
        }
        set
    }

    #[tokio::test]
    async fn per_artifact_failure_does_not_block_others() {
        let service = DetectionService::new(Arc::new(ScriptedDetector {
            fail_for: vec!["com.foo.Bad".into()],
            fatal: false,
        }));
        let set = artifact_set(&["com.foo.Bad", "com.foo.Good", "com.foo.Other"]);

        let pass = service.detect_all(&set).await.unwrap();
        assert_eq!(pass.state.class_count(), 2);
        assert!(pass.state.report("com.foo.Bad").is_none());
        assert!(pass.state.report("com.foo.Good").is_some());
        assert_eq!(pass.report_paths.len(), 2);
    }

    #[tokio::test]
    async fn missing_tool_aborts_the_pass() {
        let service = DetectionService::new(Arc::new(ScriptedDetector {
            fail_for: vec!["com.foo.Bad".into()],
            fatal: true,
        }));
        let set = artifact_set(&["com.foo.Bad", "com.foo.Good"]);

        let err = service.detect_all(&set).await.unwrap_err();
        assert!(matches!(err, DetectionError::ToolMissing(_)));
    }

    #[tokio::test]
    async fn detection_is_idempotent_on_unchanged_set() {
        let service = DetectionService::new(Arc::new(ScriptedDetector {
            fail_for: vec![],
            fatal: false,
        }));
        let set = artifact_set(&["com.foo.A", "com.foo.B"]);

        let first = service.detect_all(&set).await.unwrap();
        let second = service.detect_all(&set).await.unwrap();
        assert_eq!(first.state, second.state);
    }
}
