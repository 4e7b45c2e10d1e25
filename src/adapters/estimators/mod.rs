//! JSON-exported estimators.
//!
//! `model.json` holds either one estimator (`"approach": "direct"`) or a
//! gate and a severity estimator (`"approach": "hierarchical"`). Each
//! estimator is tagged by `"type"`.

mod linear;
mod tree;

use serde::{Deserialize, Serialize};

use crate::ports::{Estimator, ModelError, SeverityModel};

pub use linear::{LinearModel, LinearTask};
pub use tree::{Objective, TreeEnsemble};

/// One exported estimator.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorSpec {
    TreeEnsemble(TreeEnsemble),
    Linear(LinearModel),
}

impl EstimatorSpec {
    /// Validate and box the estimator.
    ///
    /// # Errors
    /// Returns `ModelError::Malformed` if the exported parameters are
    /// inconsistent.
    pub fn build(self) -> Result<Box<dyn Estimator>, ModelError> {
        Ok(match self {
            Self::TreeEnsemble(model) => Box::new(model.validated()?),
            Self::Linear(model) => {
                model.validate()?;
                Box::new(model)
            }
        })
    }
}

/// Contents of `model.json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "approach", rename_all = "snake_case")]
pub enum ModelDocument {
    Direct {
        model: EstimatorSpec,
    },
    Hierarchical {
        gate: EstimatorSpec,
        severity: EstimatorSpec,
    },
}

impl ModelDocument {
    /// Build the severity classifier described by the document.
    ///
    /// # Errors
    /// Returns `ModelError` if any estimator is malformed.
    pub fn into_model(self) -> Result<SeverityModel, ModelError> {
        Ok(match self {
            Self::Direct { model } => SeverityModel::Direct(model.build()?),
            Self::Hierarchical { gate, severity } => SeverityModel::Hierarchical {
                gate: gate.build()?,
                severity: severity.build()?,
            },
        })
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax.
fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn argmax_index(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::EstimatorKind;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
        let big = softmax(&[1000.0, 1000.0]);
        assert!((big[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_hierarchical_document() {
        let json = r#"{
            "approach": "hierarchical",
            "gate": {
                "type": "linear", "task": "logistic", "n_features": 2,
                "coefficients": [[1.0, 0.0]], "intercepts": [0.0]
            },
            "severity": {
                "type": "linear", "task": "regression", "n_features": 2,
                "coefficients": [[0.0, 1.0]], "intercepts": [1.0]
            }
        }"#;
        let doc: ModelDocument = serde_json::from_str(json).expect("parse");
        let model = doc.into_model().expect("build");
        assert_eq!(model.n_features(), 2);
        model.check(3).expect("shapes agree");
        let SeverityModel::Hierarchical { gate, severity } = model else {
            panic!("expected hierarchical model");
        };
        assert_eq!(gate.kind(), EstimatorKind::Classifier { n_classes: 2 });
        assert_eq!(severity.kind(), EstimatorKind::Regressor);
    }

    #[test]
    fn test_tree_ensemble_gate_in_document() {
        let gate = tree::tests::fitted_booster(&[(-2.0, -3.0), (-1.0, -3.0), (1.0, 3.0), (2.0, 3.0)]);
        let doc = serde_json::json!({
            "approach": "hierarchical",
            "gate": {
                "type": "tree_ensemble", "objective": "binary:logistic",
                "n_features": 1, "boosters": [gate]
            },
            "severity": {
                "type": "linear", "task": "regression", "n_features": 1,
                "coefficients": [[1.0]], "intercepts": [1.0]
            }
        });
        let doc: ModelDocument = serde_json::from_value(doc).expect("parse");
        let model = doc.into_model().expect("build");
        model.check(3).expect("shapes agree");
    }

    #[test]
    fn test_build_rejects_malformed_estimator() {
        let json = r#"{
            "approach": "direct",
            "model": {
                "type": "linear", "task": "multinomial", "n_features": 2,
                "coefficients": [[1.0], [0.0, 1.0]], "intercepts": [0.0, 0.0]
            }
        }"#;
        let doc: ModelDocument = serde_json::from_str(json).expect("parse");
        assert!(matches!(doc.into_model(), Err(ModelError::Malformed(_))));
    }
}
