//! Gradient-boosted tree ensembles backed by `gbdt`.
//!
//! Each booster is a `gbdt::gradient_boost::GBDT` in its serde form and
//! yields a raw margin, so boosters are trained (or converted) with a
//! regression loss. The objective applies the link: one booster for
//! `binary:logistic` and `reg:squarederror`, one booster per class for
//! `multi:softprob`.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use super::{argmax_index, sigmoid, softmax};
use crate::ports::{check_width, Estimator, EstimatorKind, ModelError};

/// Upper bound for the trial evaluation run while loading.
const LOAD_EVALUATION_LIMIT: Duration = Duration::from_secs(5);

/// Learning objective the ensemble was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[serde(rename = "multi:softprob")]
    MultiSoftprob,
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
    #[serde(rename = "reg:squarederror")]
    Regression,
}

#[derive(Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub objective: Objective,
    pub n_features: usize,
    pub boosters: Vec<GBDT>,
}

impl fmt::Debug for TreeEnsemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeEnsemble")
            .field("objective", &self.objective)
            .field("n_features", &self.n_features)
            .field("boosters", &self.boosters.len())
            .finish()
    }
}

impl TreeEnsemble {
    /// Check the shape, then evaluate one all-zero row on a worker thread.
    ///
    /// Boosters whose trees never reach a leaf, panic, or produce a
    /// non-finite margin are rejected here instead of on the first request.
    pub(super) fn validated(self) -> Result<Self, ModelError> {
        self.check_shape()?;
        let (model, margins) = run_bounded(self, LOAD_EVALUATION_LIMIT, |m| {
            m.margins(&vec![0.0; m.n_features])
        })?;
        if margins?.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Malformed("booster produced a non-finite margin".into()));
        }
        Ok(model)
    }

    fn check_shape(&self) -> Result<(), ModelError> {
        if self.n_features == 0 {
            return Err(ModelError::Malformed("ensemble has no input features".into()));
        }
        let count = self.boosters.len();
        match self.objective {
            Objective::MultiSoftprob if count < 2 => Err(ModelError::Malformed(format!(
                "multi:softprob needs one booster per class, got {count}"
            ))),
            Objective::BinaryLogistic | Objective::Regression if count != 1 => Err(
                ModelError::Malformed(format!("expected exactly one booster, got {count}")),
            ),
            _ => Ok(()),
        }
    }

    /// Raw margins, one per booster.
    fn margins(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_width(self, features)?;
        let row: DataVec = vec![Data::new_training_data(
            features.iter().map(|&x| x as f32).collect(),
            1.0,
            0.0,
            None,
        )];
        self.boosters
            .iter()
            .map(|booster| {
                booster
                    .predict(&row)
                    .first()
                    .map(|&m| f64::from(m))
                    .ok_or_else(|| ModelError::InvalidOutput("booster returned no prediction".into()))
            })
            .collect()
    }
}

/// Run `f` over `value` on a worker thread and hand both back, giving up
/// after `limit`.
fn run_bounded<T, R, F>(value: T, limit: Duration, f: F) -> Result<(T, R), ModelError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&T) -> R + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let out = f(&value);
        let _ = tx.send((value, out));
    });
    match rx.recv_timeout(limit) {
        Ok(pair) => Ok(pair),
        Err(RecvTimeoutError::Timeout) => Err(ModelError::Malformed(
            "booster evaluation did not terminate".into(),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(ModelError::Malformed("booster evaluation panicked".into()))
        }
    }
}

impl Estimator for TreeEnsemble {
    fn name(&self) -> &str {
        match self.objective {
            Objective::Regression => "gradient_boosting_regressor",
            _ => "gradient_boosting",
        }
    }

    fn kind(&self) -> EstimatorKind {
        match self.objective {
            Objective::MultiSoftprob => EstimatorKind::Classifier {
                n_classes: self.boosters.len(),
            },
            Objective::BinaryLogistic => EstimatorKind::Classifier { n_classes: 2 },
            Objective::Regression => EstimatorKind::Regressor,
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let margins = self.margins(features)?;
        Ok(match self.objective {
            Objective::Regression => margins[0],
            Objective::BinaryLogistic => f64::from(u8::from(margins[0] > 0.0)),
            Objective::MultiSoftprob => argmax_index(&margins) as f64,
        })
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ModelError> {
        let margins = self.margins(features)?;
        Ok(match self.objective {
            Objective::Regression => None,
            Objective::BinaryLogistic => {
                let p = sigmoid(margins[0]);
                Some(vec![1.0 - p, p])
            }
            Objective::MultiSoftprob => Some(softmax(&margins)),
        })
    }
}
