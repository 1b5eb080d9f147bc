//! Implementation of the `smelter detect` command: one detection pass
//! over the already-generated tests, summary only.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::models::{ArtifactSet, Config, ProjectLayout};
use crate::infrastructure::detector::TsDetectRunner;
use crate::services::{ArchiveSink, DetectionService};

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Project directory name under the experiment root
    pub project: String,

    /// Label appended to the result directory name
    #[arg(long)]
    pub round_tag: Option<String>,
}

pub async fn execute(args: DetectArgs, config: &Config) -> Result<()> {
    let layout = ProjectLayout::new(config, &args.project, args.round_tag.as_deref());
    layout
        .ensure_dirs()
        .context("failed to create project directories")?;

    let generated = layout.generated_test_dir();
    let artifacts = ArtifactSet::load(&generated, 0).with_context(|| {
        format!("failed to load generated tests from {}", generated.display())
    })?;
    anyhow::ensure!(
        !artifacts.is_empty(),
        "no generated tests found under {}",
        generated.display()
    );

    let detector = Arc::new(TsDetectRunner::new(
        config.tools.tsdetect_jar.clone(),
        layout.project_name().to_string(),
        layout.project_dir().to_path_buf(),
        generated,
        layout.reports_dir(),
    ));

    let pass = DetectionService::new(detector)
        .detect_all(&artifacts)
        .await
        .context("smell detection failed")?;
    DetectionService::log_summary(&pass.state, "detected");

    ArchiveSink::new(layout.result_dir().to_path_buf())
        .write_report_index(&pass.report_paths)
        .context("failed to write smell report index")?;
    Ok(())
}
