//! Implementation of the `smelter coverage` command: JaCoCo measurement
//! per target class plus a summary record.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use tracing::info;

use crate::domain::models::{Config, ProjectLayout};
use crate::infrastructure::coverage::JacocoRunner;

#[derive(Args, Debug)]
pub struct CoverageArgs {
    /// Project directory name under the experiment root
    pub project: String,

    /// Fully-qualified class to measure (repeatable, required)
    #[arg(short = 'c', long = "class", required = true)]
    pub classes: Vec<String>,

    /// Label appended to the coverage directory name (e.g. "refactored")
    #[arg(long)]
    pub round_tag: Option<String>,
}

pub async fn execute(args: CoverageArgs, config: &Config) -> Result<()> {
    let layout = ProjectLayout::new(config, &args.project, None);
    layout
        .ensure_dirs()
        .context("failed to create project directories")?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let tag = args
        .round_tag
        .as_deref()
        .map(|t| format!("_{t}"))
        .unwrap_or_default();
    let out_dir = layout.coverage_dir().join(format!("{stamp}{tag}"));
    tokio::fs::create_dir_all(&out_dir)
        .await
        .context("failed to create coverage output dir")?;

    info!(
        classes = args.classes.len(),
        out_dir = %out_dir.display(),
        "measuring coverage"
    );

    let runner = JacocoRunner::new(
        config.tools.jacoco_agent.clone(),
        config.tools.jacoco_cli.clone(),
        layout.project_dir().to_path_buf(),
    );

    let mut summary: BTreeMap<String, String> = BTreeMap::new();
    for fqcn in &args.classes {
        let class_dir = out_dir.join(fqcn.replace('.', "_"));
        let xml = runner.measure(fqcn, &class_dir).await?;
        let recorded = xml
            .strip_prefix(layout.result_dir())
            .map_or_else(|_| xml.display().to_string(), |p| p.display().to_string());
        summary.insert(fqcn.clone(), recorded);
    }

    let summary_path = out_dir.join("summary.json");
    let json = serde_json::to_string_pretty(&summary)?;
    tokio::fs::write(&summary_path, json)
        .await
        .context("failed to write coverage summary")?;

    info!(path = %summary_path.display(), "coverage summary written");
    Ok(())
}
