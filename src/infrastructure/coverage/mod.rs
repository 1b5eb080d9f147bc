//! Coverage measurement adapters.

pub mod jacoco;

pub use jacoco::JacocoRunner;
