//! Linear models exported as coefficient matrices.

use serde::{Deserialize, Serialize};

use super::{argmax_index, sigmoid, softmax};
use crate::ports::{check_width, Estimator, EstimatorKind, ModelError};

/// How the linear scores are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearTask {
    /// One row per class, softmax probabilities.
    Multinomial,
    /// One row, sigmoid probability of class 1.
    Logistic,
    /// One row, continuous output.
    Regression,
    /// One row per class (or one row for two classes), decision function
    /// only.
    Svm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub task: LinearTask,
    pub n_features: usize,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    pub(super) fn validate(&self) -> Result<(), ModelError> {
        let rows = self.coefficients.len();
        if self.n_features == 0 || rows == 0 {
            return Err(ModelError::Malformed("linear model has no coefficients".into()));
        }
        if self.intercepts.len() != rows {
            return Err(ModelError::Malformed(format!(
                "{rows} coefficient rows but {} intercepts",
                self.intercepts.len()
            )));
        }
        if self.coefficients.iter().any(|r| r.len() != self.n_features) {
            return Err(ModelError::Malformed(format!(
                "every coefficient row must have {} entries",
                self.n_features
            )));
        }
        if self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::Malformed("non-finite coefficient".into()));
        }
        let single_row = matches!(self.task, LinearTask::Logistic | LinearTask::Regression);
        if single_row && rows != 1 {
            return Err(ModelError::Malformed("logistic and regression models take one row".into()));
        }
        if self.task == LinearTask::Multinomial && rows < 2 {
            return Err(ModelError::Malformed("multinomial models need two or more rows".into()));
        }
        Ok(())
    }

    fn scores(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_width(self, features)?;
        Ok(self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect())
    }
}

impl Estimator for LinearModel {
    fn name(&self) -> &str {
        match self.task {
            LinearTask::Multinomial | LinearTask::Logistic => "logistic_regression",
            LinearTask::Regression => "linear_regression",
            LinearTask::Svm => "linear_svm",
        }
    }

    fn kind(&self) -> EstimatorKind {
        match self.task {
            LinearTask::Regression => EstimatorKind::Regressor,
            LinearTask::Logistic => EstimatorKind::Classifier { n_classes: 2 },
            LinearTask::Multinomial | LinearTask::Svm => EstimatorKind::Classifier {
                n_classes: self.coefficients.len().max(2),
            },
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let scores = self.scores(features)?;
        Ok(match (self.task, scores.as_slice()) {
            (LinearTask::Regression, [value]) => *value,
            (LinearTask::Logistic | LinearTask::Svm, [margin]) => f64::from(u8::from(*margin > 0.0)),
            _ => argmax_index(&scores) as f64,
        })
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ModelError> {
        let scores = self.scores(features)?;
        Ok(match self.task {
            LinearTask::Multinomial => Some(softmax(&scores)),
            LinearTask::Logistic => {
                let p = sigmoid(scores[0]);
                Some(vec![1.0 - p, p])
            }
            LinearTask::Regression | LinearTask::Svm => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(task: LinearTask, coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> LinearModel {
        let m = LinearModel {
            task,
            n_features: 2,
            coefficients,
            intercepts,
        };
        m.validate().expect("valid model");
        m
    }

    #[test]
    fn test_multinomial_argmax_matches_probabilities() {
        let m = model(
            LinearTask::Multinomial,
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            vec![0.0, 0.0, 0.0],
        );
        assert_eq!(m.predict(&[0.2, 0.9]).expect("predict"), 1.0);
        let p = m.predict_proba(&[0.2, 0.9]).expect("proba").expect("some");
        assert_eq!(argmax_index(&p), 1);
    }

    #[test]
    fn test_logistic_probability_of_positive_class() {
        let m = model(LinearTask::Logistic, vec![vec![2.0, 0.0]], vec![0.0]);
        let p = m.predict_proba(&[0.0, 5.0]).expect("proba").expect("some");
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert_eq!(m.predict(&[-1.0, 0.0]).expect("predict"), 0.0);
    }

    #[test]
    fn test_svm_exposes_no_probabilities() {
        let m = model(LinearTask::Svm, vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![0.0, 0.0]);
        assert!(m.predict_proba(&[1.0, 0.0]).expect("ok").is_none());
        assert_eq!(m.predict(&[0.0, 3.0]).expect("predict"), 1.0);
    }

    #[test]
    fn test_regression_output() {
        let m = model(LinearTask::Regression, vec![vec![0.5, 0.5]], vec![1.0]);
        assert_eq!(m.predict(&[1.0, 1.0]).expect("predict"), 2.0);
        assert_eq!(m.kind(), EstimatorKind::Regressor);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let bad = LinearModel {
            task: LinearTask::Regression,
            n_features: 2,
            coefficients: vec![vec![1.0, 1.0], vec![0.0, 0.0]],
            intercepts: vec![0.0, 0.0],
        };
        assert!(bad.validate().is_err());
        let nan = LinearModel {
            task: LinearTask::Logistic,
            n_features: 1,
            coefficients: vec![vec![f64::NAN]],
            intercepts: vec![0.0],
        };
        assert!(nan.validate().is_err());
    }
}
