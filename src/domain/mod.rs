//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O. Everything fitted at training time is
//! serializable so serving reproduces it exactly.

mod assessment;
pub mod encoding;
pub mod features;
mod imputer;
mod metadata;
mod patient;
pub mod policy;
mod preprocess;
mod risk;
mod scaler;

pub use assessment::{group_severity, Assessment, PredictionResult, SeverityScheme};
pub use encoding::{CategoryEncoder, EncoderTable, FallbackCategory};
pub use features::{FeatureFrame, FeatureVersion};
pub use imputer::KnnImputer;
pub use metadata::{ModelApproach, ModelMetadata, PerformanceMetrics};
pub use patient::{FieldIssue, PatientRecord, ValidationError, CLINICAL_FIELDS, REQUIRED_FIELDS};
pub use preprocess::{PreprocessError, PreprocessingArtifacts};
pub use risk::{ConfidenceBand, RiskDisplay, RiskLevel};
pub use scaler::StandardScaler;

#[cfg(test)]
pub(crate) use metadata::sample_metadata;
#[cfg(test)]
pub(crate) use patient::sample_record;
#[cfg(test)]
pub(crate) use preprocess::training_records;
