//! Test-generation adapters.

pub mod evosuite;

pub use evosuite::EvoSuiteGenerator;
