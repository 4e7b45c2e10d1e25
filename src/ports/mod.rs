//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (model formats, artifact
//! storage).

mod artifacts;
mod estimator;

pub use artifacts::ArtifactStore;
pub use estimator::{check_width, Estimator, EstimatorKind, ModelError, SeverityModel};
