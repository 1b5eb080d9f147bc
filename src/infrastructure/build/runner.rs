//! Build-tool detection and the build/test verifier.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::models::{ArtifactSet, VerificationResult};
use crate::domain::ports::{BuildVerifier, VerificationError};

/// Supported build tools for the target project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTool {
    Ant,
    Maven,
    Gradle,
}

impl BuildTool {
    /// Detect the build tool from the project's build files. Maven is the
    /// default when nothing is recognized.
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("build.xml").is_file() {
            return Self::Ant;
        }
        if project_dir.join("pom.xml").is_file() {
            return Self::Maven;
        }
        if project_dir.join("build.gradle").is_file()
            || project_dir.join("build.gradle.kts").is_file()
        {
            return Self::Gradle;
        }
        Self::Maven
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Ant => "ant",
            Self::Maven => "mvn",
            Self::Gradle => "gradle",
        }
    }

    fn test_args(self) -> &'static [&'static str] {
        match self {
            Self::Ant => &["-q", "clean", "test"],
            Self::Maven => &["-q", "clean", "test"],
            Self::Gradle => &["-q", "clean", "test"],
        }
    }

    pub fn compile_args(self) -> &'static [&'static str] {
        match self {
            Self::Ant => &["-q", "clean", "compile"],
            Self::Maven => &["-q", "clean", "compile"],
            Self::Gradle => &["-q", "clean", "classes"],
        }
    }

    /// Where each tool leaves compiled production classes.
    pub fn candidate_class_dirs(self, project_dir: &Path) -> Vec<PathBuf> {
        match self {
            Self::Ant => vec![
                project_dir.join("build").join("classes"),
                project_dir.join("build"),
                project_dir.join("temp").join("staging"),
            ],
            Self::Maven => vec![project_dir.join("target").join("classes")],
            Self::Gradle => vec![project_dir
                .join("build")
                .join("classes")
                .join("java")
                .join("main")],
        }
    }
}

/// What kind of failure a non-zero build exit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// Compilation (or the build itself) broke.
    Build,

    /// Compilation and execution completed but some tests were red.
    TestsOnly,
}

/// Classify build output. Compiler markers win over test-failure markers
/// so a broken test class that also aborts the test phase counts as a
/// build failure; an unrecognizable failure is treated as a build
/// failure.
fn classify_failure(output: &str) -> FailureKind {
    const BUILD_MARKERS: &[&str] = &[
        "COMPILATION ERROR",
        "Compilation failed",
        "compileJava FAILED",
        "compileTestJava FAILED",
        "error:",
        "cannot find symbol",
    ];
    const TEST_MARKERS: &[&str] = &[
        "There are test failures",
        "There were failing tests",
        "Tests run:",
    ];

    if BUILD_MARKERS.iter().any(|m| output.contains(m)) {
        return FailureKind::Build;
    }
    if TEST_MARKERS.iter().any(|m| output.contains(m)) {
        return FailureKind::TestsOnly;
    }
    FailureKind::Build
}

/// Verifies the artifact set with a full clean build and test run of the
/// target project.
pub struct BuildRunner {
    project_dir: PathBuf,
}

impl BuildRunner {
    pub fn new(project_dir: PathBuf) -> Self {
        Self { project_dir }
    }
}

#[async_trait]
impl BuildVerifier for BuildRunner {
    async fn verify(
        &self,
        _artifacts: &ArtifactSet,
    ) -> Result<VerificationResult, VerificationError> {
        let tool = BuildTool::detect(&self.project_dir);
        debug!(tool = tool.program(), "running clean build and tests");

        let output = Command::new(tool.program())
            .args(tool.test_args())
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VerificationError::ToolMissing(tool.program().to_string())
                } else {
                    VerificationError::Io(e)
                }
            })?;

        if output.status.success() {
            info!(tool = tool.program(), "build OK");
            return Ok(VerificationResult::pass());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if combined.is_empty() {
            warn!(tool = tool.program(), "build failed with no diagnostic output");
            return Ok(VerificationResult::fail(None));
        }

        match classify_failure(&combined) {
            FailureKind::TestsOnly => {
                warn!(
                    tool = tool.program(),
                    "tests reported failures but the build is sound, gating as pass"
                );
                Ok(VerificationResult::pass())
            }
            FailureKind::Build => {
                warn!(tool = tool.program(), "build FAILED");
                Ok(VerificationResult::fail(Some(combined)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_ant_then_maven_then_gradle() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BuildTool::detect(dir.path()), BuildTool::Maven);

        std::fs::write(dir.path().join("build.gradle"), "").unwrap();
        assert_eq!(BuildTool::detect(dir.path()), BuildTool::Gradle);

        std::fs::write(dir.path().join("pom.xml"), "").unwrap();
        assert_eq!(BuildTool::detect(dir.path()), BuildTool::Maven);

        std::fs::write(dir.path().join("build.xml"), "").unwrap();
        assert_eq!(BuildTool::detect(dir.path()), BuildTool::Ant);
    }

    #[test]
    fn maven_compile_error_is_a_build_failure() {
        let output = "\
[INFO] Compiling 12 source files
[ERROR] COMPILATION ERROR :
[ERROR] /src/Bar_ESTest.java:[12,8] cannot find symbol
[INFO] BUILD FAILURE";
        assert_eq!(classify_failure(output), FailureKind::Build);
    }

    #[test]
    fn maven_red_tests_are_runtime_only() {
        let output = "\
[INFO] Tests run: 14, Failures: 2, Errors: 0, Skipped: 0
[ERROR] There are test failures.
[INFO] BUILD FAILURE";
        assert_eq!(classify_failure(output), FailureKind::TestsOnly);
    }

    #[test]
    fn gradle_failing_tests_are_runtime_only() {
        let output = "There were failing tests. See the report at: file:///build/reports";
        assert_eq!(classify_failure(output), FailureKind::TestsOnly);
    }

    #[test]
    fn javac_error_wins_over_test_markers() {
        let output = "\
/src/Bar_ESTest.java:30: error: ';' expected
Tests run: 3, Failures: 1";
        assert_eq!(classify_failure(output), FailureKind::Build);
    }

    #[test]
    fn unrecognized_failure_counts_as_build_failure() {
        assert_eq!(classify_failure("Segmentation fault"), FailureKind::Build);
    }
}
