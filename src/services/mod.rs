//! Service layer: detection aggregation and archival.

pub mod archive;
pub mod detection;

pub use archive::ArchiveSink;
pub use detection::{DetectionPass, DetectionService};
