//! Nearest-neighbour imputation of missing feature values.
//!
//! Distances use the NaN-aware Euclidean metric: only coordinates present in
//! both rows contribute, and the squared sum is re-weighted by
//! `n_columns / n_present`.

use serde::{Deserialize, Serialize};

use super::preprocess::PreprocessError;

/// Number of neighbours used when none is configured.
pub const DEFAULT_NEIGHBORS: usize = 5;

/// Fitted KNN imputer state.
///
/// Keeps the training rows because donors are looked up at transform time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    fit_rows: Vec<Vec<Option<f64>>>,
    column_means: Vec<f64>,
}

fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut shared = 0usize;
    for (x, y) in a.iter().zip(b) {
        if let (Some(x), Some(y)) = (present(*x), present(*y)) {
            sum += (x - y) * (x - y);
            shared += 1;
        }
    }
    if shared == 0 {
        return None;
    }
    Some((a.len() as f64 / shared as f64 * sum).sqrt())
}

impl KnnImputer {
    /// Fit on a row-major matrix where `None` marks a missing value.
    ///
    /// # Errors
    /// Returns `PreprocessError::EmptyFit` for an empty matrix and
    /// `PreprocessError::DimensionMismatch` for ragged rows.
    pub fn fit(rows: &[Vec<Option<f64>>], n_neighbors: usize) -> Result<Self, PreprocessError> {
        let width = rows.first().map(Vec::len).ok_or(PreprocessError::EmptyFit)?;
        if width == 0 || n_neighbors == 0 {
            return Err(PreprocessError::EmptyFit);
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(PreprocessError::DimensionMismatch {
                expected: width,
                got: bad.len(),
            });
        }

        let column_means = (0..width)
            .map(|c| {
                let values: Vec<f64> = rows.iter().filter_map(|r| present(r[c])).collect();
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            })
            .collect();

        Ok(Self {
            n_neighbors,
            fit_rows: rows.to_vec(),
            column_means,
        })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.column_means.len()
    }

    #[must_use]
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Fill every missing value of one row.
    ///
    /// # Errors
    /// Returns `PreprocessError::DimensionMismatch` if the row width differs
    /// from the fitted width.
    pub fn transform_row(&self, row: &[Option<f64>]) -> Result<Vec<f64>, PreprocessError> {
        if row.len() != self.n_features() {
            return Err(PreprocessError::DimensionMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }

        if row.iter().all(|v| present(*v).is_some()) {
            return Ok(row.iter().map(|v| v.unwrap_or_default()).collect());
        }

        let distances: Vec<Option<f64>> = self
            .fit_rows
            .iter()
            .map(|donor| nan_euclidean(row, donor))
            .collect();

        let filled = row
            .iter()
            .enumerate()
            .map(|(col, value)| match present(*value) {
                Some(v) => v,
                None => self.impute(col, &distances),
            })
            .collect();
        Ok(filled)
    }

    /// Fill missing values of every row.
    ///
    /// # Errors
    /// See [`KnnImputer::transform_row`].
    pub fn transform(&self, rows: &[Vec<Option<f64>>]) -> Result<Vec<Vec<f64>>, PreprocessError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    fn impute(&self, col: usize, distances: &[Option<f64>]) -> f64 {
        let mut donors: Vec<(f64, f64)> = self
            .fit_rows
            .iter()
            .zip(distances)
            .filter_map(|(donor, d)| Some((d.as_ref().copied()?, present(donor[col])?)))
            .collect();

        if donors.is_empty() {
            return self.column_means[col];
        }

        donors.sort_by(|a, b| a.0.total_cmp(&b.0));
        let k = self.n_neighbors.min(donors.len());
        donors[..k].iter().map(|(_, v)| v).sum::<f64>() / k as f64
    }

    /// Check internal consistency and the expected width.
    ///
    /// # Errors
    /// Returns `PreprocessError` if the state is unusable.
    pub fn check(&self, expected_width: usize) -> Result<(), PreprocessError> {
        if self.n_neighbors == 0 || self.fit_rows.is_empty() {
            return Err(PreprocessError::Malformed(
                "imputer needs at least one fit row and one neighbour".into(),
            ));
        }
        if self.n_features() != expected_width {
            return Err(PreprocessError::DimensionMismatch {
                expected: expected_width,
                got: self.n_features(),
            });
        }
        if let Some(bad) = self.fit_rows.iter().find(|r| r.len() != expected_width) {
            return Err(PreprocessError::DimensionMismatch {
                expected: expected_width,
                got: bad.len(),
            });
        }
        Ok(())
    }
}
