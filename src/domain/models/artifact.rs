//! Generated test artifacts and the per-run artifact set.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File-name suffix the generator appends to every semantic test class.
pub const TEST_SUFFIX: &str = "_ESTest";

/// A generated test source unit bound to one production target.
///
/// Artifacts are superseded, never mutated: a rewrite produces a new
/// `TestArtifact` with the same target identifier and path, a new source
/// body, and the round that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArtifact {
    /// Fully-qualified name of the production class this test targets.
    target: String,

    /// Location of the source file relative to the generated-test root,
    /// preserving the sub-package directory structure.
    rel_path: PathBuf,

    /// Current source content.
    source: String,

    /// Round that produced this version (0 = generator baseline).
    round: u32,
}

impl TestArtifact {
    /// Build an artifact from its location under the generated-test root.
    ///
    /// The target identifier is derived from the relative path:
    /// `com/foo/Bar_ESTest.java` targets `com.foo.Bar`.
    pub fn new(rel_path: PathBuf, source: String, round: u32) -> Self {
        let target = target_from_rel_path(&rel_path);
        Self {
            target,
            rel_path,
            source,
            round,
        }
    }

    /// Fully-qualified production target name (the artifact identifier).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path relative to the generated-test root.
    pub fn rel_path(&self) -> &Path {
        &self.rel_path
    }

    /// Bare file name, e.g. `Bar_ESTest.java`.
    pub fn file_name(&self) -> &str {
        self.rel_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.target)
    }

    /// Current source content.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Round that produced this version.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Produce the superseding version of this artifact: same identifier
    /// and location, new source, stamped with the producing round.
    pub fn superseded(&self, source: String, round: u32) -> Self {
        Self {
            target: self.target.clone(),
            rel_path: self.rel_path.clone(),
            source,
            round,
        }
    }
}

/// Derive the production target FQN from a relative test path.
fn target_from_rel_path(rel_path: &Path) -> String {
    let mut parts: Vec<String> = rel_path
        .iter()
        .filter_map(|p| p.to_str())
        .map(String::from)
        .collect();

    if let Some(file) = parts.pop() {
        let stem = file.strip_suffix(".java").unwrap_or(&file);
        let class = stem.strip_suffix(TEST_SUFFIX).unwrap_or(stem);
        parts.push(class.to_string());
    }

    parts.join(".")
}

/// The artifact set for the active round, keyed by target identifier.
///
/// Exclusively owned by the pipeline within a run; rewrites replace
/// entries wholesale via [`ArtifactSet::supersede`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    root: PathBuf,
    artifacts: BTreeMap<String, TestArtifact>,
}

impl ArtifactSet {
    /// Create an empty set rooted at the generated-test directory.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            artifacts: BTreeMap::new(),
        }
    }

    /// Load the set from disk, walking `root` for `.java` sources.
    ///
    /// Generator scaffolding helpers (file name contains `scaffolding`,
    /// case-insensitive) are not semantic artifacts and are left out; they
    /// remain on disk for the build.
    pub fn load(root: &Path, round: u32) -> io::Result<Self> {
        let mut set = Self::new(root.to_path_buf());

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("java") {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_scaffolding(&name) {
                continue;
            }

            let rel = path
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                .to_path_buf();
            let source = std::fs::read_to_string(path)?;
            set.insert(TestArtifact::new(rel, source, round));
        }

        Ok(set)
    }

    /// Generated-test root this set was loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute on-disk location of an artifact.
    pub fn abs_path(&self, artifact: &TestArtifact) -> PathBuf {
        self.root.join(artifact.rel_path())
    }

    pub fn insert(&mut self, artifact: TestArtifact) {
        self.artifacts.insert(artifact.target().to_string(), artifact);
    }

    /// Replace the prior version for the artifact's identifier.
    pub fn supersede(&mut self, artifact: TestArtifact) {
        self.insert(artifact);
    }

    pub fn get(&self, target: &str) -> Option<&TestArtifact> {
        self.artifacts.get(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestArtifact> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Whether a generated file is a scaffolding/helper class rather than a
/// semantic test artifact.
pub fn is_scaffolding(file_name: &str) -> bool {
    file_name.to_lowercase().contains("scaffolding")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_derived_from_sub_package_path() {
        let artifact = TestArtifact::new(
            PathBuf::from("com/foo/Bar_ESTest.java"),
            String::new(),
            0,
        );
        assert_eq!(artifact.target(), "com.foo.Bar");
        assert_eq!(artifact.file_name(), "Bar_ESTest.java");
    }

    #[test]
    fn target_without_suffix_uses_stem() {
        let artifact = TestArtifact::new(PathBuf::from("Baz.java"), String::new(), 0);
        assert_eq!(artifact.target(), "Baz");
    }

    #[test]
    fn superseded_preserves_identifier_and_path() {
        let artifact = TestArtifact::new(
            PathBuf::from("com/foo/Bar_ESTest.java"),
            "old".to_string(),
            0,
        );
        let next = artifact.superseded("new".to_string(), 2);

        assert_eq!(next.target(), artifact.target());
        assert_eq!(next.rel_path(), artifact.rel_path());
        assert_eq!(next.source(), "new");
        assert_eq!(next.round(), 2);
    }

    #[test]
    fn scaffolding_detection_is_case_insensitive() {
        assert!(is_scaffolding("Bar_ESTest_scaffolding.java"));
        assert!(is_scaffolding("Bar_Scaffolding.java"));
        assert!(!is_scaffolding("Bar_ESTest.java"));
    }

    #[test]
    fn load_skips_scaffolding_and_non_java() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("com/foo");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("Bar_ESTest.java"), "class Bar_ESTest {}").unwrap();
        std::fs::write(pkg.join("Bar_ESTest_scaffolding.java"), "class S {}").unwrap();
        std::fs::write(pkg.join("notes.txt"), "ignore").unwrap();

        let set = ArtifactSet::load(dir.path(), 0).unwrap();
        assert_eq!(set.len(), 1);
        let artifact = set.get("com.foo.Bar").expect("artifact present");
        assert_eq!(artifact.source(), "class Bar_ESTest {}");
    }

    #[test]
    fn supersede_replaces_prior_version() {
        let mut set = ArtifactSet::new(PathBuf::from("/tmp/tests"));
        let v0 = TestArtifact::new(PathBuf::from("A_ESTest.java"), "v0".into(), 0);
        set.insert(v0.clone());
        set.supersede(v0.superseded("v1".into(), 1));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A").unwrap().source(), "v1");
        assert_eq!(set.get("A").unwrap().round(), 1);
    }
}
