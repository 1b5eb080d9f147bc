//! Domain models: pure data, no IO beyond loading artifact sets.

pub mod artifact;
pub mod config;
pub mod defect;
pub mod pipeline;
pub mod verification;

pub use artifact::{is_scaffolding, ArtifactSet, TestArtifact, TEST_SUFFIX};
pub use config::{
    Config, LoggingConfig, PipelineConfig, ProjectLayout, RetryConfig, RewriterConfig, ToolsConfig,
};
pub use defect::{RoundState, SmellReport};
pub use pipeline::{PipelineState, TerminalStatus};
pub use verification::{CompileAttempt, VerificationResult};
