//! Pipeline configuration.
//!
//! The configuration is an immutable value constructed once at startup
//! (see `infrastructure::config::ConfigLoader`) and passed into the
//! pipeline; nothing reads configuration ambiently.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Main configuration structure for Smelter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Root directory holding target projects.
    #[serde(default = "default_experiment_root")]
    pub experiment_root: PathBuf,

    /// Root directory for per-project run results.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,

    /// External tool locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Loop budgets and backoff
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Rewrite service configuration
    #[serde(default)]
    pub rewriter: RewriterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_experiment_root() -> PathBuf {
    PathBuf::from("experiment")
}

fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            experiment_root: default_experiment_root(),
            results_root: default_results_root(),
            tools: ToolsConfig::default(),
            pipeline: PipelineConfig::default(),
            rewriter: RewriterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Locations of the external tool jars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolsConfig {
    /// Test generator jar
    #[serde(default = "default_evosuite_jar")]
    pub evosuite_jar: PathBuf,

    /// Smell detector jar
    #[serde(default = "default_tsdetect_jar")]
    pub tsdetect_jar: PathBuf,

    /// Coverage agent jar
    #[serde(default = "default_jacoco_agent")]
    pub jacoco_agent: PathBuf,

    /// Coverage report CLI jar
    #[serde(default = "default_jacoco_cli")]
    pub jacoco_cli: PathBuf,
}

fn default_evosuite_jar() -> PathBuf {
    PathBuf::from("tools/evosuite-1.2.0.jar")
}

fn default_tsdetect_jar() -> PathBuf {
    PathBuf::from("tools/TestSmellDetector.jar")
}

fn default_jacoco_agent() -> PathBuf {
    PathBuf::from("tools/lib/jacocoagent.jar")
}

fn default_jacoco_cli() -> PathBuf {
    PathBuf::from("tools/lib/jacococli.jar")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            evosuite_jar: default_evosuite_jar(),
            tsdetect_jar: default_tsdetect_jar(),
            jacoco_agent: default_jacoco_agent(),
            jacoco_cli: default_jacoco_cli(),
        }
    }
}

/// Loop budgets and the escalation backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Maximum remediation rounds before the run is declared stagnant.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Verification attempts per round before the run aborts.
    #[serde(default = "default_max_compile_attempts")]
    pub max_compile_attempts: u32,

    /// Fixed delay between escalation attempts, in seconds.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Comment out generated-runner annotations around verification.
    #[serde(default)]
    pub toggle_runner_annotations: bool,
}

const fn default_max_rounds() -> u32 {
    3
}

const fn default_max_compile_attempts() -> u32 {
    3
}

const fn default_backoff_secs() -> u64 {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_compile_attempts: default_max_compile_attempts(),
            backoff_secs: default_backoff_secs(),
            toggle_runner_annotations: false,
        }
    }
}

/// Rewrite-service configuration. Only the adapter interprets these; the
/// pipeline treats the rewriter as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RewriterConfig {
    /// Model identifier for the messages API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0 to 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_rewriter_timeout")]
    pub timeout_secs: u64,

    /// Base URL override (for testing/proxies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Directory of per-smell fix checklists; ignored in zero-shot mode.
    #[serde(default = "default_guides_dir")]
    pub guides_dir: PathBuf,

    /// Prompt style: `guided` or `zeroshot`.
    #[serde(default = "default_prompt_mode")]
    pub prompt_mode: String,

    /// Retry policy for transient API failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_temperature() -> f64 {
    0.2
}

const fn default_max_tokens() -> usize {
    8192
}

const fn default_rewriter_timeout() -> u64 {
    300
}

fn default_guides_dir() -> PathBuf {
    PathBuf::from("smell-guides")
}

fn default_prompt_mode() -> String {
    "guided".to_string()
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_rewriter_timeout(),
            base_url: None,
            guides_dir: default_guides_dir(),
            prompt_mode: default_prompt_mode(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy configuration for the rewrite-service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    10_000
}

const fn default_max_backoff_ms() -> u64 {
    300_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Per-project path layout derived from the configuration roots.
///
/// An optional round tag suffixes the result directory name so separate
/// runs over the same project do not collide.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    project_name: String,
    project_dir: PathBuf,
    result_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(config: &Config, project_name: &str, round_tag: Option<&str>) -> Self {
        let result_name = match round_tag {
            Some(tag) => format!("{project_name}_{tag}"),
            None => project_name.to_string(),
        };
        Self {
            project_name: project_name.to_string(),
            project_dir: config.experiment_root.join(project_name),
            result_dir: config.results_root.join(result_name),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Target project checkout.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Per-run result root.
    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Where the generator writes test sources.
    pub fn generated_test_dir(&self) -> PathBuf {
        self.project_dir.join("src").join("test").join("java")
    }

    /// Detector output files.
    pub fn reports_dir(&self) -> PathBuf {
        self.result_dir.join("reports")
    }

    /// Coverage result trees.
    pub fn coverage_dir(&self) -> PathBuf {
        self.result_dir.join("coverage")
    }

    /// Production sources root, mirrored by the generated-test tree.
    pub fn production_src_dir(&self) -> PathBuf {
        self.project_dir.join("src")
    }

    /// Create every directory a run writes into.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.project_dir.clone(),
            self.result_dir.clone(),
            self.generated_test_dir(),
            self.reports_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
