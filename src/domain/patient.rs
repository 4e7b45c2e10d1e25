//! Patient record types for heart disease severity assessment.
//!
//! Field names follow the UCI heart disease dataset columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The thirteen clinical fields a record may carry.
///
/// Order matches the column order of the training dataset and therefore the
/// leading part of the default feature layout.
pub const CLINICAL_FIELDS: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalch", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Fields that must be present (and non-null) for a prediction.
pub const REQUIRED_FIELDS: [&str; 5] = ["age", "sex", "cp", "fbs", "exang"];

/// Bookkeeping columns that are never features.
pub const IDENTIFIER_FIELDS: [&str; 2] = ["id", "dataset"];

/// Accepted range for each numeric field (inclusive).
const NUMERIC_RANGES: [(&str, f64, f64); 6] = [
    ("age", 1.0, 120.0),
    ("trestbps", 0.0, 300.0),
    ("chol", 0.0, 700.0),
    ("thalch", 0.0, 250.0),
    ("oldpeak", -10.0, 10.0),
    ("ca", 0.0, 4.0),
];

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Error type for rejected patient records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("No data provided")]
    Empty,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid field values: {}", join_issues(.0))]
    InvalidFields(Vec<FieldIssue>),
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Names of the offending fields, in report order.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::MissingFields(fields) => fields.clone(),
            Self::InvalidFields(issues) => issues.iter().map(|i| i.field.clone()).collect(),
        }
    }
}

/// Raw patient record as submitted by a client.
///
/// Values are kept as JSON so that the categorical encoder can apply its
/// own canonicalization (booleans, numeric aliases, free-text labels).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecord {
    fields: BTreeMap<String, Value>,
}

impl PatientRecord {
    /// Build a record from a JSON document.
    ///
    /// # Errors
    /// Returns `ValidationError::Empty` unless the value is a non-empty object.
    /// Identifier columns (`id`, `dataset`) are dropped.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) if !map.is_empty() => Ok(Self {
                fields: map
                    .into_iter()
                    .filter(|(k, _)| !IDENTIFIER_FIELDS.contains(&k.as_str()))
                    .collect(),
            }),
            _ => Err(ValidationError::Empty),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Value of a field; JSON `null` is reported as absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Numeric view of a field.
    ///
    /// Accepts JSON numbers, numeric strings and booleans (as 0/1).
    /// Returns `None` when the field is absent or not numeric.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(as_number)
    }

    /// Check required fields, value types and numeric ranges.
    ///
    /// Missing required fields are reported before any other problem so a
    /// client sees the full list of absent fields in one response.
    ///
    /// # Errors
    /// Returns the first class of problems found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Empty);
        }

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| self.get(f).is_none())
            .map(|f| (*f).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let mut issues = Vec::new();
        for field in CLINICAL_FIELDS {
            let Some(value) = self.get(field) else {
                continue;
            };
            if value.is_array() || value.is_object() {
                issues.push(FieldIssue {
                    field: field.to_string(),
                    reason: "expected a scalar value".to_string(),
                });
            }
        }

        for (field, min, max) in NUMERIC_RANGES {
            let Some(value) = self.get(field) else {
                continue;
            };
            if value.is_array() || value.is_object() {
                continue;
            }
            match as_number(value) {
                Some(v) if v.is_finite() && (min..=max).contains(&v) => {}
                Some(v) => issues.push(FieldIssue {
                    field: field.to_string(),
                    reason: format!("{v} out of range [{min}, {max}]"),
                }),
                None => issues.push(FieldIssue {
                    field: field.to_string(),
                    reason: "expected a number".to_string(),
                }),
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::InvalidFields(issues))
        }
    }
}

impl TryFrom<Value> for PatientRecord {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> PatientRecord {
    PatientRecord::from_json(serde_json::json!({
        "age": 63,
        "sex": "Male",
        "cp": "typical angina",
        "trestbps": 145,
        "chol": 233,
        "fbs": true,
        "restecg": "lv hypertrophy",
        "thalch": 150,
        "exang": false,
        "oldpeak": 2.3,
        "slope": "downsloping",
        "ca": 0,
        "thal": "fixed defect"
    }))
    .expect("sample record is a non-empty object")
}
