//! Feature engineering: derived clinical features appended to the raw record.
//!
//! Every rule here is frozen per [`FeatureVersion`]; the version is stored
//! in the preprocessing bundle so serving always applies the rules the
//! model was trained with.

use serde::{Deserialize, Serialize};

use super::encoding::{canonicalize, is_categorical};
use super::patient::{PatientRecord, ValidationError, CLINICAL_FIELDS};
use super::preprocess::PreprocessError;

/// Features computed from the raw fields, in layout order.
pub const DERIVED_FEATURES: [&str; 5] = [
    "age_group",
    "bp_category",
    "chol_category",
    "hr_reserve",
    "cv_risk_score",
];

/// Bucket assigned to missing or out-of-range values.
pub const DEFAULT_BUCKET: u8 = 1;

const CHOL_EDGES: [f64; 4] = [0.0, 200.0, 240.0, 600.0];

/// Risk indicator weights: age, blood pressure, cholesterol, fasting sugar,
/// exercise angina, ST depression.
const RISK_WEIGHTS: [f64; 6] = [2.0, 2.0, 1.0, 1.0, 2.0, 3.0];

/// Frozen feature-engineering rule set.
///
/// - `V1`: WHO age bins, AHA blood-pressure bins, `hr_reserve = 220 - age - thalch`,
///   integer weighted risk score.
/// - `V2`: decade age bins, wide blood-pressure bins, `hr_reserve = thalch - age`,
///   normalized risk blend in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureVersion {
    #[default]
    V1,
    V2,
}

impl FeatureVersion {
    #[must_use]
    pub fn age_edges(self) -> &'static [f64] {
        match self {
            Self::V1 => &[0.0, 40.0, 60.0, 80.0, 100.0],
            Self::V2 => &[0.0, 40.0, 50.0, 60.0, 70.0, 100.0],
        }
    }

    #[must_use]
    pub fn bp_edges(self) -> &'static [f64] {
        match self {
            Self::V1 => &[0.0, 120.0, 130.0, 140.0, 200.0],
            Self::V2 => &[0.0, 120.0, 140.0, 160.0, 300.0],
        }
    }

    #[must_use]
    pub fn chol_edges(self) -> &'static [f64] {
        &CHOL_EDGES
    }

    /// Heart rate reserve; missing when either input is missing.
    #[must_use]
    pub fn hr_reserve(self, age: Option<f64>, max_hr: Option<f64>) -> Option<f64> {
        let (age, max_hr) = (age?, max_hr?);
        match self {
            Self::V1 => Some(220.0 - age - max_hr),
            Self::V2 => Some(max_hr - age),
        }
    }

    /// Composite cardiovascular risk score.
    #[must_use]
    pub fn cv_risk_score(self, inputs: &RiskInputs) -> f64 {
        match self {
            Self::V1 => {
                let indicators = [
                    inputs.age.is_some_and(|v| v > 55.0),
                    inputs.trestbps.is_some_and(|v| v > 140.0),
                    inputs.chol.is_some_and(|v| v > 240.0),
                    inputs.fbs,
                    inputs.exang,
                    inputs.oldpeak.is_some_and(|v| v > 2.0),
                ];
                indicators
                    .iter()
                    .zip(RISK_WEIGHTS)
                    .filter(|(hit, _)| **hit)
                    .map(|(_, w)| w)
                    .sum()
            }
            Self::V2 => {
                let unit = |v: Option<f64>, scale: f64| {
                    v.filter(|x| x.is_finite())
                        .map_or(0.0, |x| (x / scale).clamp(0.0, 1.0))
                };
                let flag = |b: bool| if b { 1.0 } else { 0.0 };
                let terms = [
                    unit(inputs.age, 100.0),
                    unit(inputs.trestbps, 200.0),
                    unit(inputs.chol, 600.0),
                    flag(inputs.fbs),
                    flag(inputs.exang),
                    unit(inputs.oldpeak, 6.0),
                ];
                let total: f64 = RISK_WEIGHTS.iter().sum();
                terms.iter().zip(RISK_WEIGHTS).map(|(t, w)| t * w).sum::<f64>() / total
            }
        }
    }
}

/// Inputs to the composite risk score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskInputs {
    pub age: Option<f64>,
    pub trestbps: Option<f64>,
    pub chol: Option<f64>,
    pub fbs: bool,
    pub exang: bool,
    pub oldpeak: Option<f64>,
}

/// Assign a value to a right-closed bin `(edges[i], edges[i + 1]]`.
///
/// Total: missing, non-finite and out-of-range values get [`DEFAULT_BUCKET`].
#[must_use]
pub fn bucket(value: Option<f64>, edges: &[f64]) -> u8 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return DEFAULT_BUCKET;
    };
    edges
        .windows(2)
        .position(|w| w[0] < v && v <= w[1])
        .map_or(DEFAULT_BUCKET, |i| i as u8)
}

/// One feature value before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Category(String),
    Missing,
}

impl Cell {
    fn number(value: Option<f64>) -> Self {
        value.filter(|v| v.is_finite()).map_or(Self::Missing, Self::Number)
    }
}

/// Named feature values in their natural column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<(String, Cell)>,
}

impl FeatureFrame {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cells reordered to a frozen feature layout.
    ///
    /// # Errors
    /// Returns `PreprocessError::UnknownColumn` if the layout names a column
    /// this frame does not produce.
    pub fn to_layout(&self, feature_names: &[String]) -> Result<Vec<&Cell>, PreprocessError> {
        feature_names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| PreprocessError::UnknownColumn(name.clone()))
            })
            .collect()
    }
}

/// Default feature layout: clinical fields followed by derived features.
#[must_use]
pub fn default_layout() -> Vec<String> {
    CLINICAL_FIELDS
        .iter()
        .chain(DERIVED_FEATURES.iter())
        .map(|s| (*s).to_string())
        .collect()
}

/// Validate a record and compute its full feature frame.
///
/// # Errors
/// Returns the record's `ValidationError` (missing required fields, bad
/// values) before any feature is derived.
pub fn transform(
    record: &PatientRecord,
    version: FeatureVersion,
) -> Result<FeatureFrame, ValidationError> {
    record.validate()?;

    let mut columns: Vec<(String, Cell)> = CLINICAL_FIELDS
        .iter()
        .map(|&field| {
            let cell = if is_categorical(field) {
                Cell::Category(canonicalize(field, record.get(field)))
            } else {
                Cell::number(record.number(field))
            };
            (field.to_string(), cell)
        })
        .collect();

    let age = record.number("age");
    let trestbps = record.number("trestbps");
    let chol = record.number("chol");
    let flag = |field: &str| canonicalize(field, record.get(field)) == "true";

    let age_group = bucket(age, version.age_edges());
    let bp_category = bucket(trestbps, version.bp_edges());
    let chol_category = bucket(chol, version.chol_edges());
    let hr_reserve = version.hr_reserve(age, record.number("thalch"));
    let risk = version.cv_risk_score(&RiskInputs {
        age,
        trestbps,
        chol,
        fbs: flag("fbs"),
        exang: flag("exang"),
        oldpeak: record.number("oldpeak"),
    });

    columns.extend([
        ("age_group".to_string(), Cell::Category(age_group.to_string())),
        ("bp_category".to_string(), Cell::Category(bp_category.to_string())),
        ("chol_category".to_string(), Cell::Category(chol_category.to_string())),
        ("hr_reserve".to_string(), Cell::number(hr_reserve)),
        ("cv_risk_score".to_string(), Cell::Number(risk)),
    ]);

    Ok(FeatureFrame { columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::sample_record;

    #[test]
    fn test_bucket_boundaries_are_right_closed() {
        let edges = FeatureVersion::V1.age_edges();
        assert_eq!(bucket(Some(40.0), edges), 0);
        assert_eq!(bucket(Some(40.5), edges), 1);
        assert_eq!(bucket(Some(60.0), edges), 1);
        assert_eq!(bucket(Some(61.0), edges), 2);
        assert_eq!(bucket(Some(100.0), edges), 3);
    }

    #[test]
    fn test_bucket_is_total() {
        for version in [FeatureVersion::V1, FeatureVersion::V2] {
            for edges in [version.age_edges(), version.bp_edges(), version.chol_edges()] {
                let n_bins = (edges.len() - 1) as u8;
                let inputs = [
                    None,
                    Some(f64::NAN),
                    Some(f64::INFINITY),
                    Some(-1.0),
                    Some(0.0),
                    Some(edges[edges.len() - 1] + 1.0),
                ];
                for p in inputs {
                    assert_eq!(bucket(p, edges), DEFAULT_BUCKET);
                }
                for &e in &edges[1..] {
                    let b = bucket(Some(e), edges);
                    assert!(b < n_bins);
                    assert_eq!(bucket(Some(e), edges), b);
                }
            }
        }
    }

    #[test]
    fn test_v2_edges_differ() {
        assert_eq!(bucket(Some(55.0), FeatureVersion::V1.age_edges()), 1);
        assert_eq!(bucket(Some(55.0), FeatureVersion::V2.age_edges()), 2);
        assert_eq!(bucket(Some(150.0), FeatureVersion::V2.bp_edges()), 2);
        assert_eq!(bucket(Some(250.0), FeatureVersion::V1.bp_edges()), DEFAULT_BUCKET);
        assert_eq!(bucket(Some(250.0), FeatureVersion::V2.bp_edges()), 3);
    }

    #[test]
    fn test_hr_reserve_conventions() {
        assert_eq!(FeatureVersion::V1.hr_reserve(Some(63.0), Some(150.0)), Some(7.0));
        assert_eq!(FeatureVersion::V2.hr_reserve(Some(63.0), Some(150.0)), Some(87.0));
        assert_eq!(FeatureVersion::V1.hr_reserve(None, Some(150.0)), None);
    }

    #[test]
    fn test_v1_risk_score_weights() {
        let all = RiskInputs {
            age: Some(60.0),
            trestbps: Some(150.0),
            chol: Some(250.0),
            fbs: true,
            exang: true,
            oldpeak: Some(2.5),
        };
        assert_eq!(FeatureVersion::V1.cv_risk_score(&all), 11.0);
        assert_eq!(FeatureVersion::V1.cv_risk_score(&RiskInputs::default()), 0.0);

        let st_only = RiskInputs {
            oldpeak: Some(3.0),
            ..RiskInputs::default()
        };
        assert_eq!(FeatureVersion::V1.cv_risk_score(&st_only), 3.0);
    }

    #[test]
    fn test_v2_risk_blend_is_normalized() {
        let max = RiskInputs {
            age: Some(120.0),
            trestbps: Some(300.0),
            chol: Some(700.0),
            fbs: true,
            exang: true,
            oldpeak: Some(9.0),
        };
        assert!((FeatureVersion::V2.cv_risk_score(&max) - 1.0).abs() < 1e-12);
        let score = FeatureVersion::V2.cv_risk_score(&RiskInputs {
            age: Some(50.0),
            ..RiskInputs::default()
        });
        assert!((score - 1.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_produces_default_layout() {
        let frame = transform(&sample_record(), FeatureVersion::V1).expect("valid");
        let names: Vec<&str> = frame.names().collect();
        assert_eq!(names, default_layout());
        assert_eq!(frame.get("age_group"), Some(&Cell::Category("2".into())));
        assert_eq!(frame.get("bp_category"), Some(&Cell::Category("3".into())));
        assert_eq!(frame.get("chol_category"), Some(&Cell::Category("1".into())));
        assert_eq!(frame.get("hr_reserve"), Some(&Cell::Number(7.0)));
        // age > 55 (2) + trestbps > 140 (2) + fbs (1) + oldpeak > 2 (3)
        assert_eq!(frame.get("cv_risk_score"), Some(&Cell::Number(8.0)));
        assert_eq!(frame.get("sex"), Some(&Cell::Category("male".into())));
    }

    #[test]
    fn test_missing_optional_inputs_propagate() {
        let mut record = sample_record();
        record.remove("thalch");
        record.remove("chol");
        record.remove("thal");
        let frame = transform(&record, FeatureVersion::V1).expect("valid");
        assert_eq!(frame.get("thalch"), Some(&Cell::Missing));
        assert_eq!(frame.get("hr_reserve"), Some(&Cell::Missing));
        assert_eq!(frame.get("chol_category"), Some(&Cell::Category("1".into())));
        assert_eq!(frame.get("thal"), Some(&Cell::Category("nan".into())));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut record = sample_record();
        record.remove("age");
        let err = transform(&record, FeatureVersion::V1).expect_err("must fail");
        assert_eq!(err.fields(), vec!["age".to_string()]);
    }

    #[test]
    fn test_layout_reordering() {
        let frame = transform(&sample_record(), FeatureVersion::V1).expect("valid");
        let layout = vec!["cv_risk_score".to_string(), "age".to_string()];
        let cells = frame.to_layout(&layout).expect("known columns");
        assert_eq!(cells, vec![&Cell::Number(8.0), &Cell::Number(63.0)]);

        let bad = vec!["bmi".to_string()];
        assert!(matches!(
            frame.to_layout(&bad),
            Err(PreprocessError::UnknownColumn(c)) if c == "bmi"
        ));
    }
}
