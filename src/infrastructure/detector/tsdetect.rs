//! tsDetect adapter: runs the detector jar per artifact and parses its
//! numerical CSV report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::models::{SmellReport, TestArtifact, TEST_SUFFIX};
use crate::domain::ports::{DetectionError, DetectorOutput, SmellDetector};

/// Metadata columns in the detector's report; every other column is a
/// smell-kind count.
const META_COLUMNS: &[&str] = &[
    "App",
    "TestClass",
    "TestFilePath",
    "ProductionFilePath",
    "RelativeTestFilePath",
    "RelativeProductionFilePath",
    "NumberOfMethods",
];

/// Infer the production source for a generated test.
///
/// `src/test/java/com/foo/Bar_ESTest.java` maps to
/// `src/com/foo/Bar.java`; returns `None` when the file name does not
/// carry the test suffix or the counterpart does not exist.
fn infer_production_file(project_dir: &Path, rel_test_path: &Path) -> Option<PathBuf> {
    let name = rel_test_path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".java")?;
    let class = stem.strip_suffix(TEST_SUFFIX)?;

    let mut prod = project_dir.join("src");
    if let Some(parent) = rel_test_path.parent() {
        prod = prod.join(parent);
    }
    prod = prod.join(format!("{class}.java"));
    prod.is_file().then_some(prod)
}

/// Parse a numerical-mode report: a header row and a single data row.
fn parse_report(content: &str, path: &Path) -> Result<SmellReport, DetectionError> {
    let malformed = |reason: &str| DetectionError::MalformedReport {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| malformed("missing header row"))?;
    let values = lines.next().ok_or_else(|| malformed("missing data row"))?;

    let header: Vec<&str> = header.split(',').map(str::trim).collect();
    let values: Vec<&str> = values.split(',').map(str::trim).collect();
    if header.len() != values.len() {
        return Err(malformed("header and data row differ in length"));
    }

    let mut counts = Vec::new();
    let mut methods = 0u32;
    for (column, value) in header.iter().zip(&values) {
        if *column == "NumberOfMethods" {
            methods = value
                .parse()
                .map_err(|_| malformed("NumberOfMethods is not a number"))?;
        } else if !META_COLUMNS.contains(column) {
            let count: u32 = value
                .parse()
                .map_err(|_| malformed("smell count is not a number"))?;
            counts.push(((*column).to_string(), count));
        }
    }

    Ok(SmellReport::new(counts, methods))
}

/// Runs the detector jar on a single artifact.
pub struct TsDetectRunner {
    jar: PathBuf,
    project_name: String,
    project_dir: PathBuf,
    generated_root: PathBuf,
    reports_dir: PathBuf,
}

impl TsDetectRunner {
    pub fn new(
        jar: PathBuf,
        project_name: String,
        project_dir: PathBuf,
        generated_root: PathBuf,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            jar,
            project_name,
            project_dir,
            generated_root,
            reports_dir,
        }
    }
}

#[async_trait]
impl SmellDetector for TsDetectRunner {
    async fn detect(&self, artifact: &TestArtifact) -> Result<DetectorOutput, DetectionError> {
        if !self.jar.is_file() {
            return Err(DetectionError::ToolMissing(self.jar.clone()));
        }

        let test_path = self.generated_root.join(artifact.rel_path());
        let production = infer_production_file(&self.project_dir, artifact.rel_path());

        // The detector takes its work list as a CSV file:
        // app,test-file,production-file
        let mut list_file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()?;
        writeln!(
            list_file,
            "{},{},{}",
            self.project_name,
            test_path.display(),
            production.map(|p| p.display().to_string()).unwrap_or_default()
        )?;
        list_file.flush()?;

        std::fs::create_dir_all(&self.reports_dir)?;
        let stem = artifact
            .file_name()
            .strip_suffix(".java")
            .unwrap_or_else(|| artifact.file_name());
        let out_csv = self.reports_dir.join(format!("{stem}_smells.csv"));

        debug!(target_class = artifact.target(), "running smell detector");
        let output = Command::new("java")
            .arg("-jar")
            .arg(&self.jar)
            .arg("-f")
            .arg(list_file.path())
            .arg("-g")
            .arg("numerical")
            .arg("-o")
            .arg(&out_csv)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(DetectionError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let content = std::fs::read_to_string(&out_csv)?;
        let report = parse_report(&content, &out_csv)?;
        Ok(DetectorOutput {
            report,
            report_path: out_csv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_meta_from_counts() {
        let csv = "App,TestClass,TestFilePath,ProductionFilePath,RelativeTestFilePath,RelativeProductionFilePath,NumberOfMethods,Assertion Roulette,Eager Test\n\
                   demo,Bar_ESTest,/t/Bar_ESTest.java,/s/Bar.java,t,s,4,2,0\n";
        let report = parse_report(csv, Path::new("r.csv")).unwrap();

        assert_eq!(report.methods(), 4);
        assert_eq!(report.total(), 2);
        assert_eq!(report.kinds(), vec!["Assertion Roulette".to_string()]);
    }

    #[test]
    fn parse_rejects_missing_data_row() {
        let err = parse_report("App,NumberOfMethods\n", Path::new("r.csv")).unwrap_err();
        assert!(matches!(err, DetectionError::MalformedReport { .. }));
    }

    #[test]
    fn parse_rejects_non_numeric_count() {
        let csv = "App,NumberOfMethods,Eager Test\ndemo,3,many\n";
        let err = parse_report(csv, Path::new("r.csv")).unwrap_err();
        assert!(matches!(err, DetectionError::MalformedReport { .. }));
    }

    #[test]
    fn counterpart_inference_mirrors_package_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        std::fs::create_dir_all(project.join("src/com/foo")).unwrap();
        std::fs::write(project.join("src/com/foo/Bar.java"), "class Bar {}").unwrap();

        let found =
            infer_production_file(project, Path::new("com/foo/Bar_ESTest.java")).unwrap();
        assert!(found.ends_with("src/com/foo/Bar.java"));
    }

    #[test]
    fn counterpart_inference_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        assert!(infer_production_file(dir.path(), Path::new("com/foo/Bar_ESTest.java")).is_none());
        assert!(infer_production_file(dir.path(), Path::new("com/foo/Plain.java")).is_none());
    }
}
