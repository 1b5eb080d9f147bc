//! Archival sink: write-only persistence of per-round artifacts.
//!
//! Every location is scoped by round (and attempt, for escalation
//! fixes), so paths never alias across rounds and no locking is needed.
//! Nothing in the control flow reads these back.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::domain::models::TestArtifact;

pub struct ArchiveSink {
    result_dir: PathBuf,
}

impl ArchiveSink {
    pub fn new(result_dir: PathBuf) -> Self {
        Self { result_dir }
    }

    /// Snapshot the freshly generated tests as the read-only baseline.
    /// Replaces any snapshot left by a previous run in the same location.
    pub fn snapshot_baseline(&self, generated_dir: &Path) -> io::Result<PathBuf> {
        let baseline = self.result_dir.join("baseline_tests");
        if baseline.exists() {
            std::fs::remove_dir_all(&baseline)?;
        }
        copy_tree(generated_dir, &baseline)?;
        debug!(path = %baseline.display(), "baseline snapshot written");
        Ok(baseline)
    }

    /// Archive directory for a remediation round.
    pub fn round_dir(&self, round: u32) -> PathBuf {
        self.result_dir.join(format!("refactor_round_{round}"))
    }

    /// Archive directory for one escalation attempt inside a round.
    pub fn attempt_dir(&self, round: u32, attempt: u32) -> PathBuf {
        self.result_dir
            .join(format!("error_fix_round_{round}_attempt_{attempt}"))
    }

    /// Archive a rewritten artifact under its round directory.
    pub fn archive_round_artifact(
        &self,
        round: u32,
        artifact: &TestArtifact,
    ) -> io::Result<PathBuf> {
        self.write_artifact(&self.round_dir(round), artifact)
    }

    /// Archive an error-fix artifact under its attempt directory.
    pub fn archive_attempt_artifact(
        &self,
        round: u32,
        attempt: u32,
        artifact: &TestArtifact,
    ) -> io::Result<PathBuf> {
        self.write_artifact(&self.attempt_dir(round, attempt), artifact)
    }

    /// Write the per-pass summary record mapping each artifact identifier
    /// to its raw detector output. Overwritten on every pass, so the file
    /// left at run end reflects the final detection.
    pub fn write_report_index(&self, paths: &BTreeMap<String, PathBuf>) -> io::Result<PathBuf> {
        let reports_dir = self.result_dir.join("reports");
        std::fs::create_dir_all(&reports_dir)?;
        let index_path = reports_dir.join("smell_reports.json");

        let index: BTreeMap<&String, String> = paths
            .iter()
            .map(|(target, path)| (target, path.display().to_string()))
            .collect();
        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&index_path, json)?;
        Ok(index_path)
    }

    fn write_artifact(&self, dir: &Path, artifact: &TestArtifact) -> io::Result<PathBuf> {
        let dest = dir.join(artifact.rel_path());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, artifact.source())?;
        Ok(dest)
    }
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> TestArtifact {
        TestArtifact::new(
            PathBuf::from("com/foo/Bar_ESTest.java"),
            "class Bar_ESTest {}".to_string(),
            1,
        )
    }

    #[test]
    fn round_and_attempt_dirs_never_alias() {
        let sink = ArchiveSink::new(PathBuf::from("results/p"));
        assert_ne!(sink.round_dir(1), sink.round_dir(2));
        assert_ne!(sink.attempt_dir(1, 1), sink.attempt_dir(1, 2));
        assert_ne!(sink.round_dir(1), sink.attempt_dir(1, 1));
    }

    #[test]
    fn archives_preserve_sub_package_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArchiveSink::new(dir.path().to_path_buf());

        let dest = sink.archive_round_artifact(2, &artifact()).unwrap();
        assert!(dest.ends_with("refactor_round_2/com/foo/Bar_ESTest.java"));
        assert_eq!(
            std::fs::read_to_string(dest).unwrap(),
            "class Bar_ESTest {}"
        );
    }

    #[test]
    fn baseline_snapshot_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("generated");
        std::fs::create_dir_all(generated.join("com")).unwrap();
        std::fs::write(generated.join("com/A_ESTest.java"), "v1").unwrap();

        let sink = ArchiveSink::new(dir.path().join("results"));
        sink.snapshot_baseline(&generated).unwrap();

        std::fs::write(generated.join("com/A_ESTest.java"), "v2").unwrap();
        let baseline = sink.snapshot_baseline(&generated).unwrap();

        assert_eq!(
            std::fs::read_to_string(baseline.join("com/A_ESTest.java")).unwrap(),
            "v2"
        );
    }

    #[test]
    fn report_index_is_json_keyed_by_target() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArchiveSink::new(dir.path().to_path_buf());

        let mut paths = BTreeMap::new();
        paths.insert("com.foo.Bar".to_string(), PathBuf::from("reports/bar.csv"));
        let index_path = sink.write_report_index(&paths).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(index_path).unwrap()).unwrap();
        assert_eq!(json["com.foo.Bar"], "reports/bar.csv");
    }
}
