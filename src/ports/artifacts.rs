//! Artifact store port: Trait for loading persisted model artifacts.
//!
//! This trait abstracts where the frozen artifacts live (a model directory
//! today) from the service that assembles them.

use crate::domain::{ModelMetadata, PreprocessingArtifacts};

use super::estimator::SeverityModel;

/// Trait for loading the artifacts of one trained deployment.
///
/// Loading happens once at startup; implementations do not need to cache.
pub trait ArtifactStore: Send + Sync {
    /// Error type for load failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the severity classifier.
    ///
    /// # Errors
    /// Returns an error if the model artifact is missing, tampered or malformed.
    fn load_model(&self) -> Result<SeverityModel, Self::Error>;

    /// Load the fitted preprocessing bundle.
    ///
    /// # Errors
    /// Returns an error if the bundle is missing, tampered or malformed.
    fn load_preprocessing(&self) -> Result<PreprocessingArtifacts, Self::Error>;

    /// Load the model metadata.
    ///
    /// # Errors
    /// Returns an error if the metadata is missing or malformed.
    fn load_metadata(&self) -> Result<ModelMetadata, Self::Error>;

    /// Where the artifacts come from, for logs.
    fn describe(&self) -> String;
}
