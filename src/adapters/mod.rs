//! Adapters layer: Concrete implementations of ports.
//!
//! - `estimators`: JSON-exported tree ensembles and linear models
//! - `fs`: model directory artifact store with manifest hash binding
//! - `sanitize`: identifier redaction for logs

pub mod estimators;
pub mod fs;
pub mod sanitize;

pub use fs::{ArtifactError, FsArtifactStore};
