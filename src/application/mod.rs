//! Application layer: the convergence loop controller.

pub mod pipeline;

pub use pipeline::{PipelineLimits, RemediationPipeline};
