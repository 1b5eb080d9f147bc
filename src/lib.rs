//! Smelter - closed-loop smell remediation for generated unit tests.
//!
//! Smelter drives an external test generator, a static smell detector, a
//! text-rewrite service and the target project's build tool through a
//! bounded remediation loop: generate, detect, rewrite, verify, repeat
//! until the tests come back clean or the round budget runs out.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models and port contracts
//! - **Application Layer** (`application`): the convergence loop
//! - **Service Layer** (`services`): detection aggregation, archival
//! - **Infrastructure Layer** (`infrastructure`): tool adapters
//! - **CLI Layer** (`cli`): command-line interface

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{PipelineLimits, RemediationPipeline};
pub use domain::models::{
    ArtifactSet, CompileAttempt, Config, PipelineState, ProjectLayout, RoundState, SmellReport,
    TerminalStatus, TestArtifact, VerificationResult,
};
pub use domain::ports::{
    BuildVerifier, DetectionError, GenerationError, RewriteError, SmellDetector, TestGenerator,
    TestRewriter, VerificationError, VerificationHook,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ArchiveSink, DetectionService};
