//! Build-tool integration: verification, compilation, annotation hooks.

pub mod annotations;
pub mod runner;

pub use annotations::AnnotationToggleHook;
pub use runner::{BuildRunner, BuildTool};
