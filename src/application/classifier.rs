//! Severity decision: dispatch over direct and hierarchical models.

use crate::domain::policy::{argmax, clamp_probability, ClampOrdinalOutput, NO_PROBABILITY_CONFIDENCE};
use crate::domain::PredictionResult;
use crate::ports::{Estimator, EstimatorKind, ModelError, SeverityModel};

/// Predict the severity class of one scaled feature vector.
///
/// # Errors
/// Returns `ModelError` when an estimator rejects the input or produces an
/// output of the wrong shape.
pub fn predict(
    model: &SeverityModel,
    features: &[f64],
    n_classes: usize,
) -> Result<PredictionResult, ModelError> {
    match model {
        SeverityModel::Direct(estimator) => predict_direct(estimator.as_ref(), features, n_classes),
        SeverityModel::Hierarchical { gate, severity } => {
            predict_hierarchical(gate.as_ref(), severity.as_ref(), features, n_classes)
        }
    }
}

fn predict_direct(
    estimator: &dyn Estimator,
    features: &[f64],
    n_classes: usize,
) -> Result<PredictionResult, ModelError> {
    if let Some(probabilities) = distribution(estimator, features, n_classes)? {
        let class = top_class(&probabilities)?;
        return Ok(PredictionResult::from_distribution(class, probabilities));
    }
    let class = point_class(estimator, features, n_classes)?;
    Ok(placeholder(class, n_classes))
}

fn predict_hierarchical(
    gate: &dyn Estimator,
    severity: &dyn Estimator,
    features: &[f64],
    n_classes: usize,
) -> Result<PredictionResult, ModelError> {
    let gate_proba = distribution(gate, features, 2)?;
    let has_disease = match &gate_proba {
        Some(p) => top_class(p)? == 1,
        None => {
            let raw = gate.predict(features)?;
            if !raw.is_finite() {
                return Err(ModelError::InvalidOutput(format!("gate predicted {raw}")));
            }
            raw >= 0.5
        }
    };
    let p_healthy = gate_proba.as_ref().map(|p| p[0]);

    if !has_disease {
        tracing::debug!("Disease gate negative");
        return Ok(match p_healthy {
            Some(p0) => {
                // Best effort: stage 2 only shapes the disease mass.
                let stage2 = distribution(severity, features, n_classes).ok().flatten();
                PredictionResult {
                    class: 0,
                    probabilities: compose(p0, stage2.as_deref(), n_classes),
                    confidence: p0,
                }
            }
            None => placeholder(0, n_classes),
        });
    }

    if let Some(stage2) = distribution(severity, features, n_classes)? {
        let class = top_class(&stage2)?;
        let probabilities = match p_healthy {
            Some(p0) => compose(p0, Some(stage2.as_slice()), n_classes),
            None => stage2,
        };
        return Ok(PredictionResult::from_distribution(class, probabilities));
    }

    let class = point_class(severity, features, n_classes)?;
    Ok(match p_healthy {
        Some(p0) => {
            let mut probabilities = vec![0.0; n_classes];
            probabilities[0] = p0;
            probabilities[usize::from(class)] += 1.0 - p0;
            PredictionResult::from_distribution(class, probabilities)
        }
        None => placeholder(class, n_classes),
    })
}

/// Probabilities of an estimator, checked against the expected class count.
fn distribution(
    estimator: &dyn Estimator,
    features: &[f64],
    n_classes: usize,
) -> Result<Option<Vec<f64>>, ModelError> {
    let Some(raw) = estimator.predict_proba(features)? else {
        return Ok(None);
    };
    if raw.len() != n_classes {
        return Err(ModelError::ClassCount {
            expected: n_classes,
            got: raw.len(),
        });
    }
    Ok(Some(raw.into_iter().map(clamp_probability).collect()))
}

fn top_class(probabilities: &[f64]) -> Result<u8, ModelError> {
    argmax(probabilities)
        .and_then(|i| u8::try_from(i).ok())
        .ok_or_else(|| ModelError::InvalidOutput("empty probability vector".into()))
}

/// Class from a point prediction: ordinal regressors are rounded and
/// clamped, classifiers must name a valid class.
fn point_class(estimator: &dyn Estimator, features: &[f64], n_classes: usize) -> Result<u8, ModelError> {
    let raw = estimator.predict(features)?;
    match estimator.kind() {
        EstimatorKind::Regressor => Ok(ClampOrdinalOutput::new(n_classes).apply(raw)),
        EstimatorKind::Classifier { .. } => {
            let in_range = raw.is_finite() && raw >= 0.0 && raw < n_classes as f64 && raw.fract() == 0.0;
            if !in_range {
                return Err(ModelError::InvalidOutput(format!(
                    "{} predicted class {raw} outside 0..{n_classes}",
                    estimator.name()
                )));
            }
            Ok(raw as u8)
        }
    }
}

/// Gate probability for class 0, remaining mass spread over the disease
/// classes by the stage-2 distribution (uniformly when there is none).
fn compose(p_healthy: f64, stage2: Option<&[f64]>, n_classes: usize) -> Vec<f64> {
    let mut out = vec![0.0; n_classes];
    out[0] = p_healthy;
    if n_classes < 2 {
        return out;
    }
    let weights: Vec<f64> = match stage2 {
        Some(s) if s[1..].iter().sum::<f64>() > 0.0 => s[1..].to_vec(),
        _ => vec![1.0; n_classes - 1],
    };
    let total: f64 = weights.iter().sum();
    for (slot, w) in out[1..].iter_mut().zip(weights) {
        *slot = (1.0 - p_healthy) * w / total;
    }
    out
}

/// Distribution for a decision made without probabilities.
fn placeholder(class: u8, n_classes: usize) -> PredictionResult {
    let rest = if n_classes > 1 {
        (1.0 - NO_PROBABILITY_CONFIDENCE) / (n_classes - 1) as f64
    } else {
        0.0
    };
    let mut probabilities = vec![rest; n_classes];
    if let Some(slot) = probabilities.get_mut(usize::from(class)) {
        *slot = NO_PROBABILITY_CONFIDENCE;
    }
    PredictionResult {
        class,
        probabilities,
        confidence: NO_PROBABILITY_CONFIDENCE,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Estimator returning fixed outputs.
    #[derive(Debug, Clone)]
    pub(crate) struct FixedEstimator {
        pub kind: EstimatorKind,
        pub value: f64,
        pub proba: Option<Vec<f64>>,
        pub n_features: usize,
    }

    impl FixedEstimator {
        pub(crate) fn classifier(proba: Vec<f64>) -> Self {
            Self {
                kind: EstimatorKind::Classifier { n_classes: proba.len() },
                value: argmax(&proba).unwrap_or(0) as f64,
                proba: Some(proba),
                n_features: 2,
            }
        }

        pub(crate) fn regressor(value: f64) -> Self {
            Self {
                kind: EstimatorKind::Regressor,
                value,
                proba: None,
                n_features: 2,
            }
        }

        fn gate_without_proba(value: f64) -> Self {
            Self {
                kind: EstimatorKind::Classifier { n_classes: 2 },
                value,
                proba: None,
                n_features: 2,
            }
        }
    }

    impl Estimator for FixedEstimator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn kind(&self) -> EstimatorKind {
            self.kind
        }

        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict(&self, _features: &[f64]) -> Result<f64, ModelError> {
            Ok(self.value)
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Option<Vec<f64>>, ModelError> {
            Ok(self.proba.clone())
        }
    }

    fn hierarchical(gate: FixedEstimator, severity: FixedEstimator) -> SeverityModel {
        SeverityModel::Hierarchical {
            gate: Box::new(gate),
            severity: Box::new(severity),
        }
    }

    const X: [f64; 2] = [0.0, 0.0];

    #[test]
    fn test_gate_negative_always_yields_class_zero() {
        let model = hierarchical(
            FixedEstimator::classifier(vec![0.8, 0.2]),
            FixedEstimator::classifier(vec![0.0, 0.1, 0.9]),
        );
        let result = predict(&model, &X, 3).expect("predict");
        assert_eq!(result.class, 0);
        assert!((result.confidence - 0.8).abs() < 1e-12);
        assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    /// Estimator whose every call fails.
    #[derive(Debug)]
    struct FailingEstimator;

    impl Estimator for FailingEstimator {
        fn name(&self) -> &str {
            "failing"
        }

        fn kind(&self) -> EstimatorKind {
            EstimatorKind::Classifier { n_classes: 3 }
        }

        fn n_features(&self) -> usize {
            2
        }

        fn predict(&self, _features: &[f64]) -> Result<f64, ModelError> {
            Err(ModelError::Malformed("corrupt severity model".into()))
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Option<Vec<f64>>, ModelError> {
            Err(ModelError::Malformed("corrupt severity model".into()))
        }
    }

    #[test]
    fn test_gate_negative_ignores_failing_stage_two() {
        let model = SeverityModel::Hierarchical {
            gate: Box::new(FixedEstimator::classifier(vec![0.9, 0.1])),
            severity: Box::new(FailingEstimator),
        };
        let result = predict(&model, &X, 3).expect("negative gate decides alone");
        assert_eq!(result.class, 0);
        assert!((result.confidence - 0.9).abs() < 1e-12);
        assert!((result.probabilities[1] - 0.05).abs() < 1e-12);
        assert!((result.probabilities[2] - 0.05).abs() < 1e-12);

        let positive = SeverityModel::Hierarchical {
            gate: Box::new(FixedEstimator::classifier(vec![0.2, 0.8])),
            severity: Box::new(FailingEstimator),
        };
        assert!(matches!(predict(&positive, &X, 3), Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_gate_without_probabilities_uses_placeholder_confidence() {
        let model = hierarchical(
            FixedEstimator::gate_without_proba(0.0),
            FixedEstimator::regressor(2.0),
        );
        let result = predict(&model, &X, 3).expect("predict");
        assert_eq!(result.class, 0);
        assert_eq!(result.confidence, NO_PROBABILITY_CONFIDENCE);
    }

    #[test]
    fn test_ordinal_stage_two_is_clamped() {
        for (raw, expected) in [(-5.0, 0), (1.6, 2), (f64::NAN, 1)] {
            let model = hierarchical(
                FixedEstimator::classifier(vec![0.1, 0.9]),
                FixedEstimator::regressor(raw),
            );
            let result = predict(&model, &X, 3).expect("predict");
            assert_eq!(result.class, expected, "raw output {raw}");
        }
    }

    #[test]
    fn test_ordinal_probabilities_compose_with_gate() {
        let model = hierarchical(
            FixedEstimator::classifier(vec![0.3, 0.7]),
            FixedEstimator::regressor(1.2),
        );
        let result = predict(&model, &X, 3).expect("predict");
        assert_eq!(result.class, 1);
        assert!((result.probabilities[0] - 0.3).abs() < 1e-12);
        assert!((result.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_stage_two_classifier_uses_full_range() {
        let model = hierarchical(
            FixedEstimator::classifier(vec![0.2, 0.8]),
            FixedEstimator::classifier(vec![0.1, 0.2, 0.7]),
        );
        let result = predict(&model, &X, 3).expect("predict");
        assert_eq!(result.class, 2);
        assert!((result.probabilities[0] - 0.2).abs() < 1e-12);
        let disease_mass: f64 = result.probabilities[1..].iter().sum();
        assert!((disease_mass - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_direct_argmax() {
        let model = SeverityModel::Direct(Box::new(FixedEstimator::classifier(vec![0.2, 0.5, 0.3])));
        let result = predict(&model, &X, 3).expect("predict");
        assert_eq!(result.class, 1);
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_direct_class_count_mismatch() {
        let model = SeverityModel::Direct(Box::new(FixedEstimator::classifier(vec![0.5, 0.5])));
        assert!(matches!(
            predict(&model, &X, 3),
            Err(ModelError::ClassCount { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_direct_classifier_without_probabilities() {
        let mut estimator = FixedEstimator::classifier(vec![0.0, 0.0, 1.0]);
        estimator.proba = None;
        let result = predict(&SeverityModel::Direct(Box::new(estimator)), &X, 3).expect("predict");
        assert_eq!(result.class, 2);
        assert_eq!(result.confidence, NO_PROBABILITY_CONFIDENCE);

        let mut bad = FixedEstimator::classifier(vec![0.0, 0.0, 1.0]);
        bad.proba = None;
        bad.value = 7.0;
        assert!(matches!(
            predict(&SeverityModel::Direct(Box::new(bad)), &X, 3),
            Err(ModelError::InvalidOutput(_))
        ));
    }
}
