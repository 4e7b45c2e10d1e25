//! Assessment service: runs one patient record through the frozen
//! pipeline.
//!
//! `record -> preprocessing -> severity model -> label + risk level`
//!
//! The service is built once at startup and is read-only afterwards, so it
//! can be shared between request handlers behind an `Arc`.

use crate::domain::{Assessment, ModelMetadata, PatientRecord, PreprocessingArtifacts, SeverityScheme};
use crate::ports::{ArtifactStore, SeverityModel};
use crate::HeartRiskError;

use super::classifier;

#[derive(Debug)]
pub struct AssessmentService {
    preprocessing: PreprocessingArtifacts,
    model: SeverityModel,
    metadata: ModelMetadata,
    scheme: SeverityScheme,
}

impl AssessmentService {
    /// Assemble a service from loaded artifacts, checking they agree.
    ///
    /// # Errors
    /// Returns `HeartRiskError::Incompatible` when the class count is not 3
    /// or 5, or when the model and preprocessing disagree on the feature
    /// width or class count.
    pub fn new(
        preprocessing: PreprocessingArtifacts,
        model: SeverityModel,
        metadata: ModelMetadata,
    ) -> Result<Self, HeartRiskError> {
        let scheme = metadata.scheme().ok_or_else(|| {
            HeartRiskError::Incompatible(format!(
                "metadata declares {} classes, expected 3 or 5",
                metadata.num_classes
            ))
        })?;
        if model.n_features() != preprocessing.n_features() {
            return Err(HeartRiskError::Incompatible(format!(
                "model expects {} features, preprocessing produces {}",
                model.n_features(),
                preprocessing.n_features()
            )));
        }
        model.check(scheme.n_classes())?;

        Ok(Self {
            preprocessing,
            model,
            metadata,
            scheme,
        })
    }

    /// Load every artifact from a store.
    ///
    /// # Errors
    /// Returns the store's error for a missing or tampered artifact, or
    /// `HeartRiskError::Incompatible` (see [`AssessmentService::new`]).
    pub fn load<S>(store: &S) -> Result<Self, HeartRiskError>
    where
        S: ArtifactStore,
        S::Error: Into<HeartRiskError>,
    {
        tracing::info!("Loading model artifacts from {}", store.describe());
        let preprocessing = store.load_preprocessing().map_err(Into::into)?;
        let model = store.load_model().map_err(Into::into)?;
        let metadata = store.load_metadata().map_err(Into::into)?;

        let service = Self::new(preprocessing, model, metadata)?;
        tracing::info!(
            "Model ready: {} v{} ({}, {} classes)",
            service.metadata.model_name,
            service.metadata.version,
            service.model.describe(),
            service.scheme.n_classes()
        );
        Ok(service)
    }

    /// Assess one raw patient record.
    ///
    /// # Errors
    /// Returns `HeartRiskError::Validation` for a rejected record and
    /// `HeartRiskError::Model` if inference fails.
    pub fn assess(&self, record: &PatientRecord) -> Result<Assessment, HeartRiskError> {
        let features = self.preprocessing.transform(record)?;
        let result = classifier::predict(&self.model, &features, self.scheme.n_classes())?;

        let label = self.metadata.label_for(result.class);
        let risk_level = self.scheme.risk_level(result.class);
        tracing::info!(
            "Assessed record: class={} confidence={:.2} risk={}",
            result.class,
            result.confidence,
            risk_level
        );

        Ok(Assessment::new(result, label, risk_level))
    }

    #[must_use]
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn scheme(&self) -> SeverityScheme {
        self.scheme
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.preprocessing.feature_names
    }

    #[must_use]
    pub fn model_description(&self) -> String {
        self.model.describe()
    }
}

/// Service over the test model directory fixture.
#[cfg(test)]
pub(crate) fn fixture_service() -> AssessmentService {
    use crate::adapters::fs::{sample_document, write_model_dir};
    use crate::adapters::FsArtifactStore;

    let temp = tempfile::tempdir().expect("tempdir");
    write_model_dir(temp.path(), &sample_document(18));
    let store = FsArtifactStore::open(temp.path(), false).expect("open store");
    AssessmentService::load(&store).expect("load service")
}
