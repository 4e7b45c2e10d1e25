//! Per-column standardization.

use serde::{Deserialize, Serialize};

use super::preprocess::PreprocessError;

/// Fitted standard scaler: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on complete (already imputed) rows.
    ///
    /// Uses the population standard deviation; constant columns get a scale
    /// of 1 so they transform to zero.
    ///
    /// # Errors
    /// Returns `PreprocessError::EmptyFit` for an empty matrix and
    /// `PreprocessError::DimensionMismatch` for ragged rows.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, PreprocessError> {
        let width = rows.first().map(Vec::len).ok_or(PreprocessError::EmptyFit)?;
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(PreprocessError::DimensionMismatch {
                expected: width,
                got: bad.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row.
    ///
    /// # Errors
    /// Returns `PreprocessError::DimensionMismatch` on a width mismatch.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, PreprocessError> {
        if row.len() != self.n_features() {
            return Err(PreprocessError::DimensionMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Standardize every row.
    ///
    /// # Errors
    /// See [`StandardScaler::transform_row`].
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PreprocessError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// # Errors
    /// Returns `PreprocessError` when the fitted statistics are unusable.
    pub fn check(&self, expected_width: usize) -> Result<(), PreprocessError> {
        if self.mean.len() != expected_width || self.scale.len() != expected_width {
            return Err(PreprocessError::DimensionMismatch {
                expected: expected_width,
                got: self.mean.len().min(self.scale.len()),
            });
        }
        if self
            .scale
            .iter()
            .chain(&self.mean)
            .any(|v| !v.is_finite())
            || self.scale.iter().any(|s| *s == 0.0)
        {
            return Err(PreprocessError::Malformed(
                "scaler statistics must be finite with non-zero scale".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_standardizes() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows).expect("fit");
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);

        let out = scaler.transform(&rows).expect("transform");
        assert_eq!(out, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_transform_uses_fitted_statistics() {
        let scaler = StandardScaler {
            mean: vec![10.0],
            scale: vec![2.0],
        };
        assert_eq!(scaler.transform_row(&[14.0]).expect("ok"), vec![2.0]);
    }

    #[test]
    fn test_check_rejects_zero_scale_and_width() {
        let scaler = StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 0.0],
        };
        assert!(matches!(scaler.check(2), Err(PreprocessError::Malformed(_))));
        assert!(matches!(
            scaler.check(3),
            Err(PreprocessError::DimensionMismatch { expected: 3, .. })
        ));
    }
}
