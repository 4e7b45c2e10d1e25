//! Preprocessing artifact bundle: the frozen transform chain shared by
//! training and serving.
//!
//! `record -> features -> label encoding -> KNN imputation -> scaling`

use serde::{Deserialize, Serialize};

use super::encoding::{canonicalize, is_categorical, CategoryEncoder, EncoderTable, MISSING_CATEGORY};
use super::features::{self, Cell, FeatureFrame, FeatureVersion};
use super::imputer::{KnnImputer, DEFAULT_NEIGHBORS};
use super::patient::{PatientRecord, ValidationError};
use super::scaler::StandardScaler;

/// Error type for preprocessing operations.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot fit on empty data")]
    EmptyFit,

    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Unknown feature column: {0}")]
    UnknownColumn(String),

    #[error("Malformed preprocessing state: {0}")]
    Malformed(String),
}

/// Everything fitted at training time that serving must reproduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingArtifacts {
    #[serde(default)]
    pub feature_version: FeatureVersion,
    pub feature_names: Vec<String>,
    pub label_encoders: EncoderTable,
    pub imputer: KnnImputer,
    pub scaler: StandardScaler,
}

impl PreprocessingArtifacts {
    /// Fit encoders, imputer and scaler on training records.
    ///
    /// The feature layout is the default layout of the chosen version.
    ///
    /// # Errors
    /// Returns `PreprocessError::EmptyFit` for no records, or the validation
    /// error of the first invalid record.
    pub fn fit(records: &[PatientRecord], version: FeatureVersion) -> Result<Self, PreprocessError> {
        if records.is_empty() {
            return Err(PreprocessError::EmptyFit);
        }
        let frames = records
            .iter()
            .map(|r| features::transform(r, version))
            .collect::<Result<Vec<_>, _>>()?;
        let feature_names = features::default_layout();

        let mut label_encoders = EncoderTable::default();
        for name in feature_names.iter().filter(|n| is_categorical(n)) {
            let values = frames.iter().map(|f| match f.get(name) {
                Some(Cell::Category(c)) => c.clone(),
                _ => MISSING_CATEGORY.to_string(),
            });
            label_encoders.insert(name.clone(), CategoryEncoder::fit(values)?);
        }

        let encoded = frames
            .iter()
            .map(|f| encode_frame(f, &feature_names, &label_encoders))
            .collect::<Result<Vec<_>, _>>()?;

        let imputer = KnnImputer::fit(&encoded, DEFAULT_NEIGHBORS)?;
        let imputed = imputer.transform(&encoded)?;
        let scaler = StandardScaler::fit(&imputed)?;

        tracing::info!(
            "Fitted preprocessing on {} records ({} features, {} encoders)",
            records.len(),
            feature_names.len(),
            label_encoders.len()
        );

        Ok(Self {
            feature_version: version,
            feature_names,
            label_encoders,
            imputer,
            scaler,
        })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Check that every fitted component agrees with the frozen layout.
    ///
    /// # Errors
    /// Returns the first inconsistency found.
    pub fn check_layout(&self) -> Result<(), PreprocessError> {
        let n = self.n_features();
        if n == 0 {
            return Err(PreprocessError::Malformed("empty feature layout".into()));
        }
        let known = features::default_layout();
        if let Some(unknown) = self.feature_names.iter().find(|n| !known.contains(n)) {
            return Err(PreprocessError::UnknownColumn(unknown.clone()));
        }
        self.label_encoders.check_against(&self.feature_names)?;
        self.imputer.check(n)?;
        self.scaler.check(n)?;
        Ok(())
    }

    /// Map a raw record to the scaled model input vector.
    ///
    /// # Errors
    /// Returns `PreprocessError::Validation` for a rejected record.
    pub fn transform(&self, record: &PatientRecord) -> Result<Vec<f64>, PreprocessError> {
        let frame = features::transform(record, self.feature_version)?;
        let encoded = encode_frame(&frame, &self.feature_names, &self.label_encoders)?;
        let imputed = self.imputer.transform_row(&encoded)?;
        self.scaler.transform_row(&imputed)
    }
}

/// Encode a frame into the frozen layout; `None` marks values to impute.
fn encode_frame(
    frame: &FeatureFrame,
    feature_names: &[String],
    encoders: &EncoderTable,
) -> Result<Vec<Option<f64>>, PreprocessError> {
    let cells = frame.to_layout(feature_names)?;
    Ok(feature_names
        .iter()
        .zip(cells)
        .map(|(name, cell)| match (encoders.get(name), cell) {
            (Some(encoder), Cell::Category(c)) => Some(encode_category(name, encoder, c)),
            (Some(encoder), Cell::Missing) => Some(encode_category(name, encoder, MISSING_CATEGORY)),
            (Some(encoder), Cell::Number(v)) => {
                let canonical = canonicalize(name, Some(&serde_json::Value::from(*v)));
                Some(encode_category(name, encoder, &canonical))
            }
            (None, Cell::Number(v)) => Some(*v),
            (None, Cell::Category(c)) => c.parse::<f64>().ok().filter(|v| v.is_finite()),
            (None, Cell::Missing) => None,
        })
        .collect())
}

/// Code of `category`, substituting the fallback class when it was unseen.
fn encode_category(column: &str, encoder: &CategoryEncoder, category: &str) -> f64 {
    let resolution = encoder.resolve(category);
    if resolution.is_fallback() {
        tracing::debug!(
            "Unseen category in {column}, using fallback {:?}",
            resolution.category()
        );
    }
    encoder.code(resolution) as f64
}

#[cfg(test)]
pub(crate) fn training_records() -> Vec<PatientRecord> {
    use serde_json::json;

    let rows = [
        json!({"age": 63, "sex": "Male", "cp": "typical angina", "trestbps": 145, "chol": 233, "fbs": true, "restecg": "lv hypertrophy", "thalch": 150, "exang": false, "oldpeak": 2.3, "slope": "downsloping", "ca": 0, "thal": "fixed defect"}),
        json!({"age": 67, "sex": "Male", "cp": "asymptomatic", "trestbps": 160, "chol": 286, "fbs": false, "restecg": "lv hypertrophy", "thalch": 108, "exang": true, "oldpeak": 1.5, "slope": "flat", "ca": 3, "thal": "normal"}),
        json!({"age": 67, "sex": "Male", "cp": "asymptomatic", "trestbps": 120, "chol": 229, "fbs": false, "restecg": "lv hypertrophy", "thalch": 129, "exang": true, "oldpeak": 2.6, "slope": "flat", "ca": 2, "thal": "reversable defect"}),
        json!({"age": 37, "sex": "Male", "cp": "non-anginal", "trestbps": 130, "chol": 250, "fbs": false, "restecg": "normal", "thalch": 187, "exang": false, "oldpeak": 3.5, "slope": "downsloping", "ca": 0, "thal": "normal"}),
        json!({"age": 41, "sex": "Female", "cp": "atypical angina", "trestbps": 130, "chol": 204, "fbs": false, "restecg": "lv hypertrophy", "thalch": 172, "exang": false, "oldpeak": 1.4, "slope": "upsloping", "ca": 0, "thal": "normal"}),
        json!({"age": 56, "sex": "Male", "cp": "atypical angina", "trestbps": 120, "chol": 236, "fbs": false, "restecg": "normal", "thalch": 178, "exang": false, "oldpeak": 0.8, "slope": "upsloping", "ca": 0, "thal": "normal"}),
        json!({"age": 62, "sex": "Female", "cp": "asymptomatic", "trestbps": 140, "chol": 268, "fbs": false, "restecg": "lv hypertrophy", "thalch": 160, "exang": false, "oldpeak": 3.6, "slope": "downsloping", "ca": 2, "thal": "normal"}),
        json!({"age": 57, "sex": "Female", "cp": "asymptomatic", "trestbps": 120, "chol": 354, "fbs": false, "restecg": "normal", "thalch": 163, "exang": true, "oldpeak": 0.6, "slope": "upsloping", "ca": 0, "thal": "normal"}),
        json!({"age": 54, "sex": "Male", "cp": "asymptomatic", "trestbps": 150, "chol": null, "fbs": false, "restecg": "st-t abnormality", "thalch": 122, "exang": true, "oldpeak": 2.0, "slope": null, "ca": null, "thal": null}),
        json!({"age": 48, "sex": "Female", "cp": "non-anginal", "trestbps": null, "chol": 275, "fbs": false, "restecg": "normal", "thalch": 139, "exang": false, "oldpeak": 0.2, "slope": "upsloping", "ca": 0, "thal": "normal"}),
    ];
    rows.into_iter()
        .map(|r| PatientRecord::from_json(r).expect("object"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::sample_record;

    fn fitted() -> PreprocessingArtifacts {
        PreprocessingArtifacts::fit(&training_records(), FeatureVersion::V1).expect("fit")
    }

    #[test]
    fn test_fit_produces_consistent_bundle() {
        let artifacts = fitted();
        assert_eq!(artifacts.n_features(), 18);
        assert_eq!(artifacts.label_encoders.len(), 11);
        artifacts.check_layout().expect("consistent");

        let thal = artifacts.label_encoders.get("thal").expect("thal encoder");
        assert_eq!(
            thal.classes(),
            ["fixed defect", "nan", "normal", "reversable defect"]
        );
    }

    #[test]
    fn test_transform_matches_layout_length() {
        let artifacts = fitted();
        let x = artifacts.transform(&sample_record()).expect("transform");
        assert_eq!(x.len(), artifacts.feature_names.len());
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let artifacts = fitted();
        let a = artifacts.transform(&sample_record()).expect("transform");
        let b = artifacts.transform(&sample_record()).expect("transform");
        assert_eq!(a, b);
    }

    #[test]
    fn test_numeric_aliases_match_labels() {
        let artifacts = fitted();
        let mut coded = sample_record();
        coded.insert("sex", 1);
        coded.insert("fbs", 1);
        coded.insert("exang", "0");
        coded.insert("cp", 1);
        assert_eq!(
            artifacts.transform(&coded).expect("transform"),
            artifacts.transform(&sample_record()).expect("transform")
        );
    }

    #[test]
    fn test_unseen_category_degrades_to_fallback() {
        let artifacts = fitted();
        let mut unseen = sample_record();
        unseen.insert("restecg", "something new");
        let mut fallback = sample_record();
        let first = artifacts
            .label_encoders
            .get("restecg")
            .expect("encoder")
            .fallback()
            .to_string();
        fallback.insert("restecg", first);
        assert_eq!(
            artifacts.transform(&unseen).expect("transform"),
            artifacts.transform(&fallback).expect("transform")
        );
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let artifacts = fitted();
        let mut record = sample_record();
        record.remove("chol");
        record.remove("thalch");
        let x = artifacts.transform(&record).expect("transform");
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_rejects_missing_required_field() {
        let artifacts = fitted();
        let mut record = sample_record();
        record.remove("sex");
        let err = artifacts.transform(&record).expect_err("must fail");
        assert!(matches!(
            err,
            PreprocessError::Validation(ValidationError::MissingFields(ref f)) if f == &["sex".to_string()]
        ));
    }

    #[test]
    fn test_reordered_layout_is_honored() {
        let mut artifacts = fitted();
        let original = artifacts.transform(&sample_record()).expect("transform");

        // Reverse the layout together with every per-column statistic.
        artifacts.feature_names.reverse();
        artifacts.scaler.mean.reverse();
        artifacts.scaler.scale.reverse();
        let mut state = serde_json::to_value(&artifacts.imputer).expect("serialize");
        if let Some(rows) = state["fit_rows"].as_array_mut() {
            for row in rows {
                if let Some(cells) = row.as_array_mut() {
                    cells.reverse();
                }
            }
        }
        if let Some(means) = state["column_means"].as_array_mut() {
            means.reverse();
        }
        artifacts.imputer = serde_json::from_value(state).expect("deserialize");

        let mut reordered = artifacts.transform(&sample_record()).expect("transform");
        reordered.reverse();
        assert_eq!(reordered, original);
    }

    #[test]
    fn test_check_layout_detects_drift() {
        let mut artifacts = fitted();
        artifacts.feature_names.pop();
        assert!(matches!(
            artifacts.check_layout(),
            Err(PreprocessError::DimensionMismatch { .. }) | Err(PreprocessError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_v2_bundle_keeps_its_convention_through_persistence() {
        let artifacts =
            PreprocessingArtifacts::fit(&training_records(), FeatureVersion::V2).expect("fit");
        artifacts.check_layout().expect("consistent");

        let json = serde_json::to_string(&artifacts).expect("serialize");
        let loaded: PreprocessingArtifacts = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded.feature_version, FeatureVersion::V2);
        loaded.check_layout().expect("consistent after load");

        let x = loaded.transform(&sample_record()).expect("transform");
        assert_eq!(x, artifacts.transform(&sample_record()).expect("transform"));

        let col = loaded
            .feature_names
            .iter()
            .position(|n| n == "hr_reserve")
            .expect("hr_reserve column");
        let unscaled = x[col] * loaded.scaler.scale[col] + loaded.scaler.mean[col];
        // thalch 150, age 63
        assert!((unscaled - 87.0).abs() < 1e-9);
    }

    #[test]
    fn test_bundle_json_roundtrip_preserves_transform() {
        let artifacts = fitted();
        let json = serde_json::to_string(&artifacts).expect("serialize");
        let loaded: PreprocessingArtifacts = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(
            loaded.transform(&sample_record()).expect("transform"),
            artifacts.transform(&sample_record()).expect("transform")
        );
    }
}
