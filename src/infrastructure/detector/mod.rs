//! Smell-detection adapters.

pub mod tsdetect;

pub use tsdetect::TsDetectRunner;
