//! Generated-runner annotation toggling.
//!
//! Generated tests carry runner annotations some build environments
//! cannot execute. This hook comments those lines out before
//! verification and restores them afterwards; the pipeline only sees the
//! [`VerificationHook`] interface.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::models::ArtifactSet;
use crate::domain::ports::VerificationHook;

const RUNNER_PREFIXES: &[&str] = &["@RunWith(EvoRunner", "@EvoRunnerParameters("];

fn is_runner_annotation(line: &str) -> bool {
    let trimmed = line.trim_start();
    RUNNER_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Comment out runner annotation lines; returns the patched text.
fn disable_annotations(source: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in source.lines() {
        if is_runner_annotation(line) {
            lines.push(format!("// {line}"));
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// Undo [`disable_annotations`]: strip the comment marker from lines
/// whose remainder is a runner annotation. Other comments are untouched.
fn enable_annotations(source: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("// ") {
            if is_runner_annotation(rest) {
                lines.push(rest.to_string());
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines.join("\n")
}

/// Hook that toggles runner annotations in every artifact file around a
/// verification attempt.
pub struct AnnotationToggleHook;

impl AnnotationToggleHook {
    async fn patch_all(
        artifacts: &ArtifactSet,
        patch: fn(&str) -> String,
    ) -> std::io::Result<()> {
        for artifact in artifacts.iter() {
            let path = artifacts.abs_path(artifact);
            patch_file(&path, patch).await?;
        }
        Ok(())
    }
}

async fn patch_file(path: &Path, patch: fn(&str) -> String) -> std::io::Result<()> {
    let source = tokio::fs::read_to_string(path).await?;
    let patched = patch(&source);
    if patched != source {
        debug!(path = %path.display(), "toggled runner annotations");
        tokio::fs::write(path, patched).await?;
    }
    Ok(())
}

#[async_trait]
impl VerificationHook for AnnotationToggleHook {
    async fn before_verify(&self, artifacts: &ArtifactSet) -> std::io::Result<()> {
        Self::patch_all(artifacts, disable_annotations).await
    }

    async fn after_verify(&self, artifacts: &ArtifactSet) -> std::io::Result<()> {
        Self::patch_all(artifacts, enable_annotations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
import org.junit.runner.RunWith;

@RunWith(EvoRunner.class)
@EvoRunnerParameters(mockJVMNonDeterminism = true)
public class Bar_ESTest {
    // a regular comment
}";

    #[test]
    fn disable_comments_out_runner_lines_only() {
        let patched = disable_annotations(SOURCE);
        assert!(patched.contains("// @RunWith(EvoRunner.class)"));
        assert!(patched.contains("// @EvoRunnerParameters(mockJVMNonDeterminism = true)"));
        assert!(patched.contains("import org.junit.runner.RunWith;"));
        assert!(patched.contains("    // a regular comment"));
    }

    #[test]
    fn enable_round_trips_disable() {
        let patched = enable_annotations(&disable_annotations(SOURCE));
        assert_eq!(patched, SOURCE);
    }

    #[test]
    fn enable_leaves_unrelated_comments_alone() {
        let source = "// not an annotation\nclass A {}";
        assert_eq!(enable_annotations(source), source);
    }
}
