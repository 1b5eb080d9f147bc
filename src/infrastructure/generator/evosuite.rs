//! EvoSuite adapter: compiles the target project, discovers target
//! classes, and drives the generator jar.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use walkdir::WalkDir;

use crate::domain::models::ArtifactSet;
use crate::domain::ports::{GenerationError, TestGenerator};
use crate::infrastructure::build::BuildTool;

/// Root packages the generator must never target.
const SKIP_ROOTS: &[&str] = &["java", "javax", "jakarta", "sun"];

/// Command lines longer than this are split into per-class runs.
const MAX_CMD_LEN: usize = 8000;

/// JDK and framework classes that leak into the compiled output.
fn is_framework_class(fqn: &str) -> bool {
    let root = fqn.split('.').next().unwrap_or(fqn);
    SKIP_ROOTS.contains(&root) || fqn.starts_with("com.sun.") || fqn.starts_with("org.junit.")
}

/// Discover target FQNs from compiled classes, excluding inner and
/// framework classes.
fn discover_targets(classes_dir: &Path) -> Vec<String> {
    let mut fqns = Vec::new();
    for entry in WalkDir::new(classes_dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("class") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.contains('$') {
            continue;
        }
        let Ok(rel) = path.strip_prefix(classes_dir) else {
            continue;
        };
        let fqn = rel
            .with_extension("")
            .iter()
            .filter_map(|p| p.to_str())
            .collect::<Vec<_>>()
            .join(".");
        if !is_framework_class(&fqn) {
            fqns.push(fqn);
        }
    }
    fqns.sort();
    fqns
}

/// Build the generator command line for one batch of targets.
fn evosuite_args(
    jar: &Path,
    targets: &[String],
    classes_dir: &Path,
    test_dir: &Path,
) -> Vec<String> {
    vec![
        "-jar".to_string(),
        jar.display().to_string(),
        "-class".to_string(),
        targets.join(","),
        "-projectCP".to_string(),
        classes_dir.display().to_string(),
        "-Dtest_dir".to_string(),
        test_dir.display().to_string(),
        "-seed".to_string(),
        "42".to_string(),
        "-Djunit_check=true".to_string(),
    ]
}

pub struct EvoSuiteGenerator {
    jar: PathBuf,
    project_dir: PathBuf,
}

impl EvoSuiteGenerator {
    pub fn new(jar: PathBuf, project_dir: PathBuf) -> Self {
        Self { jar, project_dir }
    }

    /// Compile the target project and locate its class output directory.
    async fn ensure_compiled(&self) -> Result<PathBuf, GenerationError> {
        let tool = BuildTool::detect(&self.project_dir);
        debug!(tool = tool.program(), "compiling target project");

        let output = Command::new(tool.program())
            .args(tool.compile_args())
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(GenerationError::ProjectBuildFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        if let Some(dir) = tool
            .candidate_class_dirs(&self.project_dir)
            .into_iter()
            .find(|d| d.is_dir())
        {
            return Ok(dir);
        }

        // Fallback: first compiled class anywhere in the project.
        for entry in WalkDir::new(&self.project_dir)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("class") {
                let parent = entry.path().parent().unwrap_or(&self.project_dir);
                info!(dir = %parent.display(), "fallback classes dir");
                return Ok(parent.to_path_buf());
            }
        }

        Err(GenerationError::NoTargets(self.project_dir.clone()))
    }

    async fn run_batch(
        &self,
        targets: &[String],
        classes_dir: &Path,
        output_dir: &Path,
    ) -> Result<(), GenerationError> {
        let args = evosuite_args(&self.jar, targets, classes_dir, output_dir);
        let output = Command::new("java")
            .args(&args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(GenerationError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TestGenerator for EvoSuiteGenerator {
    async fn generate(
        &self,
        targets: &[String],
        output_dir: &Path,
    ) -> Result<ArtifactSet, GenerationError> {
        if !self.jar.is_file() {
            return Err(GenerationError::ToolMissing(self.jar.clone()));
        }

        info!("starting test generation");
        let classes_dir = self.ensure_compiled().await?;
        debug!(classpath = %classes_dir.display(), "using project classpath");

        let targets: Vec<String> = if targets.is_empty() {
            discover_targets(&classes_dir)
        } else {
            targets
                .iter()
                .filter(|t| !is_framework_class(t))
                .cloned()
                .collect()
        };
        if targets.is_empty() {
            return Err(GenerationError::NoTargets(classes_dir));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        if targets.join(",").len() > MAX_CMD_LEN {
            let total = targets.len();
            info!(total, "target list too long for one invocation, running one-by-one");
            for (idx, class) in targets.iter().enumerate() {
                info!("[{}/{}] {}", idx + 1, total, class);
                if let Err(err) = self
                    .run_batch(std::slice::from_ref(class), &classes_dir, output_dir)
                    .await
                {
                    warn!(target_class = %class, error = %err, "generation skipped for class");
                }
            }
        } else {
            info!(classes = targets.len(), "batch generating");
            self.run_batch(&targets, &classes_dir, output_dir).await?;
        }
        info!("test generation done");

        Ok(ArtifactSet::load(output_dir, 0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_classes_are_skipped() {
        assert!(is_framework_class("java.util.List"));
        assert!(is_framework_class("javax.swing.JFrame"));
        assert!(is_framework_class("com.sun.tools.Attach"));
        assert!(is_framework_class("org.junit.Assert"));
        assert!(!is_framework_class("com.foo.Bar"));
        assert!(!is_framework_class("org.example.Thing"));
    }

    #[test]
    fn discovery_filters_inner_and_framework_classes() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path();
        std::fs::create_dir_all(classes.join("com/foo")).unwrap();
        std::fs::create_dir_all(classes.join("java/util")).unwrap();
        std::fs::write(classes.join("com/foo/Bar.class"), []).unwrap();
        std::fs::write(classes.join("com/foo/Bar$Inner.class"), []).unwrap();
        std::fs::write(classes.join("java/util/Shadow.class"), []).unwrap();

        let targets = discover_targets(classes);
        assert_eq!(targets, vec!["com.foo.Bar".to_string()]);
    }

    #[test]
    fn command_line_carries_batch_and_paths() {
        let args = evosuite_args(
            Path::new("tools/evosuite.jar"),
            &["com.foo.Bar".to_string(), "com.foo.Baz".to_string()],
            Path::new("target/classes"),
            Path::new("src/test/java"),
        );
        assert!(args.contains(&"com.foo.Bar,com.foo.Baz".to_string()));
        assert!(args.contains(&"-projectCP".to_string()));
        assert!(args.contains(&"-Djunit_check=true".to_string()));
    }

    #[tokio::test]
    async fn missing_jar_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let generator = EvoSuiteGenerator::new(
            dir.path().join("no-such.jar"),
            dir.path().to_path_buf(),
        );
        let err = generator
            .generate(&[], &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ToolMissing(_)));
    }
}
