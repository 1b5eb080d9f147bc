//! JaCoCo coverage measurement for generated test classes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::models::TEST_SUFFIX;
use crate::infrastructure::build::BuildTool;

/// Agent option string: record execution data for the target's package.
fn agent_opts(agent_jar: &Path, exec_file: &Path, class_fqcn: &str) -> String {
    let package_pattern = match class_fqcn.rsplit_once('.') {
        Some((pkg, _)) => format!("{pkg}.*"),
        None => "*".to_string(),
    };
    format!(
        "-javaagent:{}=destfile={},includes={}",
        agent_jar.display(),
        exec_file.display(),
        package_pattern
    )
}

/// Classpath for the JUnit run: project libraries, compiled test classes
/// and compiled production classes.
fn runtime_classpath(project_dir: &Path, tool: BuildTool) -> String {
    let (test_classes, prod_classes) = match tool {
        BuildTool::Ant => (
            project_dir.join("temp").join("test-classes"),
            project_dir.join("temp").join("staging"),
        ),
        BuildTool::Maven => (
            project_dir.join("target").join("test-classes"),
            project_dir.join("target").join("classes"),
        ),
        BuildTool::Gradle => (
            project_dir.join("build/classes/java/test"),
            project_dir.join("build/classes/java/main"),
        ),
    };
    format!(
        "{}/*:{}:{}",
        project_dir.join("lib").display(),
        test_classes.display(),
        prod_classes.display()
    )
}

fn prod_classes_dir(project_dir: &Path, tool: BuildTool) -> PathBuf {
    match tool {
        BuildTool::Ant => project_dir.join("temp").join("staging"),
        BuildTool::Maven => project_dir.join("target").join("classes"),
        BuildTool::Gradle => project_dir.join("build/classes/java/main"),
    }
}

/// Runs one coverage measurement per target class.
pub struct JacocoRunner {
    agent_jar: PathBuf,
    cli_jar: PathBuf,
    project_dir: PathBuf,
}

impl JacocoRunner {
    pub fn new(agent_jar: PathBuf, cli_jar: PathBuf, project_dir: PathBuf) -> Self {
        Self {
            agent_jar,
            cli_jar,
            project_dir,
        }
    }

    /// Measure coverage for one production class via its generated test,
    /// writing `jacoco.exec`, an XML report and an HTML report tree into
    /// `work_dir`. Returns the XML report path.
    pub async fn measure(&self, class_fqcn: &str, work_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .context("failed to create coverage work dir")?;
        let exec_file = work_dir.join("jacoco.exec");
        let tool = BuildTool::detect(&self.project_dir);

        self.compile_all(tool).await?;

        let test_class = match class_fqcn.rsplit_once('.') {
            Some((pkg, name)) => format!("{pkg}.{name}{TEST_SUFFIX}"),
            None => format!("{class_fqcn}{TEST_SUFFIX}"),
        };
        info!(class = class_fqcn, "running tests under the coverage agent");
        let status = Command::new("java")
            .arg(agent_opts(&self.agent_jar, &exec_file, class_fqcn))
            .arg("-cp")
            .arg(runtime_classpath(&self.project_dir, tool))
            .arg("org.junit.runner.JUnitCore")
            .arg(&test_class)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .context("failed to launch the JUnit runner")?;
        if !status.success() {
            // Red tests still leave usable execution data.
            warn!(class = class_fqcn, "tests reported failures, collecting coverage anyway");
        }

        let xml_path = work_dir.join("coverage.xml");
        let html_dir = work_dir.join("coverage_html");
        let report_status = Command::new("java")
            .arg("-jar")
            .arg(&self.cli_jar)
            .arg("report")
            .arg(&exec_file)
            .arg("--classfiles")
            .arg(prod_classes_dir(&self.project_dir, tool))
            .arg("--sourcefiles")
            .arg(self.project_dir.join("src"))
            .arg("--xml")
            .arg(&xml_path)
            .arg("--html")
            .arg(&html_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .context("failed to launch the coverage report CLI")?;
        if !report_status.success() {
            anyhow::bail!("coverage report generation failed for {class_fqcn}");
        }

        Ok(xml_path)
    }

    async fn compile_all(&self, tool: BuildTool) -> Result<()> {
        debug!(tool = tool.program(), "compiling classes and test classes");
        let arg_sets: &[&[&str]] = match tool {
            BuildTool::Ant => &[&["-q", "clean", "compile"], &["-q", "clean", "compile-tests"]],
            BuildTool::Maven => &[&["-q", "clean", "test-compile"]],
            BuildTool::Gradle => &[&["-q", "clean", "testClasses"]],
        };
        for args in arg_sets {
            let status = Command::new(tool.program())
                .args(*args)
                .current_dir(&self.project_dir)
                .stdin(Stdio::null())
                .status()
                .await
                .with_context(|| format!("failed to launch {}", tool.program()))?;
            if !status.success() {
                anyhow::bail!("{} {:?} failed", tool.program(), args);
            }
        }
        Ok(())
    }
}
