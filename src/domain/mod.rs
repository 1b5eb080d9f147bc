//! Domain layer: models and port contracts.

pub mod models;
pub mod ports;
