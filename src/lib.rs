//! # heartrisk
//!
//! Heart-disease severity assessment served over a JSON HTTP API.
//!
//! This crate provides:
//! - A frozen preprocessing pipeline (derived features, label encoding
//!   with fallback, KNN imputation, standard scaling)
//! - Direct and hierarchical (gate + severity) decision policies
//! - An axum service exposing predictions, health and model info
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient record, features, encoders, risk)
//! - `ports`: Trait definitions for estimators and artifact storage
//! - `adapters`: Concrete implementations (JSON estimators, model directory)
//! - `application`: The assessment use case
//! - `api`: HTTP surface

pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::AssessmentService;
pub use domain::{Assessment, PatientRecord, RiskLevel};

/// Result type for heartrisk operations
pub type Result<T> = std::result::Result<T, HeartRiskError>;

/// Main error type for heartrisk
#[derive(Debug, thiserror::Error)]
pub enum HeartRiskError {
    #[error("Invalid patient data: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(domain::PreprocessError),

    #[error("Model inference failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Artifact loading failed: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Incompatible artifacts: {0}")]
    Incompatible(String),
}

impl From<domain::PreprocessError> for HeartRiskError {
    fn from(err: domain::PreprocessError) -> Self {
        match err {
            domain::PreprocessError::Validation(e) => Self::Validation(e),
            other => Self::Preprocess(other),
        }
    }
}
