//! Estimator port: Trait for fitted model inference.
//!
//! This trait abstracts the concrete model format (tree ensembles, linear
//! models) from the severity decision logic.

use std::fmt;

/// Error type for model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Dimension mismatch: model expects {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Class count mismatch: expected {expected} classes, model has {got}")]
    ClassCount { expected: usize, got: usize },

    #[error("Estimator '{0}' cannot act as a binary gate")]
    InvalidGate(String),

    #[error("Estimator produced an invalid output: {0}")]
    InvalidOutput(String),

    #[error("Malformed model: {0}")]
    Malformed(String),
}

/// What an estimator predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorKind {
    /// Discrete labels `0..n_classes`.
    Classifier { n_classes: usize },
    /// A single continuous value.
    Regressor,
}

/// A fitted model that maps a scaled feature vector to an output.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Short model family name for logs and `/api/info`.
    fn name(&self) -> &str;

    fn kind(&self) -> EstimatorKind;

    /// Width of the input vector the model was fitted on.
    fn n_features(&self) -> usize;

    /// Point prediction: a class index for classifiers, the raw value for
    /// regressors.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a wrong input width.
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Per-class probabilities, or `None` when the model does not expose
    /// them.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a wrong input width.
    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ModelError>;
}

/// Check an input vector against an estimator's fitted width.
///
/// # Errors
/// Returns `ModelError::DimensionMismatch` on a mismatch.
pub fn check_width(estimator: &dyn Estimator, features: &[f64]) -> Result<(), ModelError> {
    if features.len() != estimator.n_features() {
        return Err(ModelError::DimensionMismatch {
            expected: estimator.n_features(),
            got: features.len(),
        });
    }
    Ok(())
}

/// The loaded severity classifier.
#[derive(Debug)]
pub enum SeverityModel {
    /// One multi-class model over all severity classes.
    Direct(Box<dyn Estimator>),
    /// Binary disease gate, then a severity model for positive cases.
    Hierarchical {
        gate: Box<dyn Estimator>,
        severity: Box<dyn Estimator>,
    },
}

impl SeverityModel {
    /// Input width shared by every stage.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::Direct(model) => model.n_features(),
            Self::Hierarchical { gate, .. } => gate.n_features(),
        }
    }

    /// Human-readable summary, e.g. `hierarchical(gradient_boosting -> linear_regression)`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Direct(model) => format!("direct({})", model.name()),
            Self::Hierarchical { gate, severity } => {
                format!("hierarchical({} -> {})", gate.name(), severity.name())
            }
        }
    }

    /// Check stage shapes against the deployment's class count.
    ///
    /// # Errors
    /// Returns the first shape inconsistency between stages.
    pub fn check(&self, n_classes: usize) -> Result<(), ModelError> {
        match self {
            Self::Direct(model) => check_classes(model.as_ref(), n_classes),
            Self::Hierarchical { gate, severity } => {
                match gate.kind() {
                    EstimatorKind::Classifier { n_classes: 2 } => {}
                    _ => return Err(ModelError::InvalidGate(gate.name().to_string())),
                }
                if gate.n_features() != severity.n_features() {
                    return Err(ModelError::DimensionMismatch {
                        expected: gate.n_features(),
                        got: severity.n_features(),
                    });
                }
                check_classes(severity.as_ref(), n_classes)
            }
        }
    }
}

fn check_classes(model: &dyn Estimator, n_classes: usize) -> Result<(), ModelError> {
    match model.kind() {
        EstimatorKind::Classifier { n_classes: got } if got != n_classes => {
            Err(ModelError::ClassCount {
                expected: n_classes,
                got,
            })
        }
        _ => Ok(()),
    }
}
