//! Implementation of the `smelter run` command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing::info;

use crate::application::{PipelineLimits, RemediationPipeline};
use crate::domain::models::{Config, ProjectLayout};
use crate::domain::ports::{NoopHook, VerificationHook};
use crate::infrastructure::build::{AnnotationToggleHook, BuildRunner};
use crate::infrastructure::detector::TsDetectRunner;
use crate::infrastructure::generator::EvoSuiteGenerator;
use crate::infrastructure::llm::{
    ApiRewriter, MessagesClient, MessagesClientConfig, PromptMode, RetryPolicy,
};
use crate::services::ArchiveSink;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project directory name under the experiment root
    pub project: String,

    /// Fully-qualified target class (repeatable). If omitted, all
    /// discoverable classes are targeted.
    #[arg(short = 'c', long = "class")]
    pub classes: Vec<String>,

    /// Label appended to the result directory name
    #[arg(long)]
    pub round_tag: Option<String>,
}

pub async fn execute(args: RunArgs, config: &Config) -> Result<()> {
    let layout = ProjectLayout::new(config, &args.project, args.round_tag.as_deref());
    layout
        .ensure_dirs()
        .context("failed to create project directories")?;

    let mut pipeline = build_pipeline(config, &layout)?;
    let status = pipeline.run(&args.classes).await?;

    // Terminal status is reported through the logs; the exit code only
    // distinguishes fatal errors.
    info!(%status, "run finished");
    Ok(())
}

fn build_pipeline(config: &Config, layout: &ProjectLayout) -> Result<RemediationPipeline> {
    let generator = Arc::new(EvoSuiteGenerator::new(
        config.tools.evosuite_jar.clone(),
        layout.project_dir().to_path_buf(),
    ));

    let detector = Arc::new(TsDetectRunner::new(
        config.tools.tsdetect_jar.clone(),
        layout.project_name().to_string(),
        layout.project_dir().to_path_buf(),
        layout.generated_test_dir(),
        layout.reports_dir(),
    ));

    let prompt_mode: PromptMode = config
        .rewriter
        .prompt_mode
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let client_config = MessagesClientConfig::from_rewriter_config(&config.rewriter)
        .context("rewrite service is not configured")?;
    let client = MessagesClient::new(
        client_config,
        RetryPolicy::from_config(&config.rewriter.retry),
    )
    .context("failed to build the rewrite-service client")?;
    let rewriter = Arc::new(ApiRewriter::new(
        client,
        prompt_mode,
        config.rewriter.guides_dir.clone(),
    ));

    let verifier = Arc::new(BuildRunner::new(layout.project_dir().to_path_buf()));

    let hook: Arc<dyn VerificationHook> = if config.pipeline.toggle_runner_annotations {
        Arc::new(AnnotationToggleHook)
    } else {
        Arc::new(NoopHook)
    };

    let archive = ArchiveSink::new(layout.result_dir().to_path_buf());
    let limits = PipelineLimits::new(
        config.pipeline.max_rounds,
        config.pipeline.max_compile_attempts,
        Duration::from_secs(config.pipeline.backoff_secs),
    );

    Ok(RemediationPipeline::new(
        generator,
        detector,
        rewriter,
        verifier,
        hook,
        archive,
        layout.generated_test_dir(),
        limits,
    ))
}
