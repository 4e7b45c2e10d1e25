//! Categorical encoding with a fixed fallback for unseen values.
//!
//! Canonicalization runs identically when encoders are fitted and when
//! records are served, so the string a value maps to never depends on how
//! the client spelled it (`1`, `"1"`, `"Male"` and `"male"` are the same
//! category for `sex`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::preprocess::PreprocessError;

/// Columns that are label-encoded.
pub const CATEGORICAL_COLUMNS: [&str; 11] = [
    "sex",
    "cp",
    "fbs",
    "restecg",
    "exang",
    "slope",
    "ca",
    "thal",
    "age_group",
    "bp_category",
    "chol_category",
];

/// Canonical form of an absent categorical value.
pub const MISSING_CATEGORY: &str = "nan";

#[must_use]
pub fn is_categorical(column: &str) -> bool {
    CATEGORICAL_COLUMNS.contains(&column)
}

/// Semantic label for a numeric code of a categorical field.
fn numeric_alias(field: &str, code: i64) -> Option<&'static str> {
    let label = match (field, code) {
        ("sex", 1) => "male",
        ("sex", 0) => "female",
        ("fbs" | "exang", 1) => "true",
        ("fbs" | "exang", 0) => "false",
        ("cp", 1) => "typical angina",
        ("cp", 2) => "atypical angina",
        ("cp", 3) => "non-anginal",
        ("cp", 4) => "asymptomatic",
        ("restecg", 0) => "normal",
        ("restecg", 1) => "st-t abnormality",
        ("restecg", 2) => "lv hypertrophy",
        ("slope", 1) => "upsloping",
        ("slope", 2) => "flat",
        ("slope", 3) => "downsloping",
        ("thal", 3) => "normal",
        ("thal", 6) => "fixed defect",
        ("thal", 7) => "reversable defect",
        _ => return None,
    };
    Some(label)
}

fn text_alias(field: &str, text: &str) -> Option<&'static str> {
    match (field, text) {
        ("sex", "m") => Some("male"),
        ("sex", "f") => Some("female"),
        ("fbs" | "exang", "yes") => Some("true"),
        ("fbs" | "exang", "no") => Some("false"),
        _ => None,
    }
}

fn format_number(field: &str, value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        let code = value as i64;
        match numeric_alias(field, code) {
            Some(label) => label.to_string(),
            None => code.to_string(),
        }
    } else if value.is_nan() {
        MISSING_CATEGORY.to_string()
    } else {
        value.to_string()
    }
}

/// Canonical string for a categorical value.
///
/// Booleans become `"true"`/`"false"`, numeric codes resolve through the
/// per-field alias table, text is trimmed and lower-cased, and an absent
/// value becomes [`MISSING_CATEGORY`].
#[must_use]
pub fn canonicalize(field: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_CATEGORY.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n
            .as_f64()
            .map_or_else(|| n.to_string(), |v| format_number(field, v)),
        Some(Value::String(s)) => {
            let text = s.trim().to_lowercase();
            if text.is_empty() {
                return MISSING_CATEGORY.to_string();
            }
            if let Some(label) = text_alias(field, &text) {
                return label.to_string();
            }
            match text.parse::<f64>() {
                Ok(v) => format_number(field, v),
                Err(_) => text,
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Outcome of resolving a value against the fitted categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The value was seen during fitting.
    Known(&'a str),
    /// The value was unseen; the fallback category stands in for it.
    Fallback(&'a str),
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub fn category(&self) -> &'a str {
        match self {
            Self::Known(c) | Self::Fallback(c) => c,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Label encoder for a single column.
///
/// Classes are kept sorted; the code of a class is its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit from observed canonical values.
    ///
    /// # Errors
    /// Returns `PreprocessError::EmptyFit` when no value is given.
    pub fn fit<I, S>(values: I) -> Result<Self, PreprocessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if classes.is_empty() {
            return Err(PreprocessError::EmptyFit);
        }
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    /// Build from an explicit class list (sorted and de-duplicated).
    ///
    /// # Errors
    /// Returns `PreprocessError::EmptyFit` for an empty list.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, PreprocessError> {
        Self::fit(classes)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Designated substitute for unseen values: the first known class.
    #[must_use]
    pub fn fallback(&self) -> &str {
        self.classes.first().map_or(MISSING_CATEGORY, String::as_str)
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    #[must_use]
    pub fn resolve(&self, category: &str) -> Resolution<'_> {
        match self.position(category) {
            Some(i) => Resolution::Known(&self.classes[i]),
            None => Resolution::Fallback(FallbackCategory::substitute(self)),
        }
    }

    /// Integer code of a resolved category.
    #[must_use]
    pub fn code(&self, resolution: Resolution<'_>) -> usize {
        self.position(resolution.category()).unwrap_or_default()
    }

    /// Integer code for a canonical value, substituting the fallback for
    /// unseen values.
    #[must_use]
    pub fn encode(&self, category: &str) -> usize {
        self.code(self.resolve(category))
    }

    fn check(&self) -> Result<(), PreprocessError> {
        let sorted = self.classes.windows(2).all(|w| w[0] < w[1]);
        if self.classes.is_empty() || !sorted {
            return Err(PreprocessError::Malformed(
                "encoder classes must be non-empty, sorted and unique".into(),
            ));
        }
        Ok(())
    }
}

/// Unseen-category policy: degrade to the first known class instead of
/// failing the request.
pub struct FallbackCategory;

impl FallbackCategory {
    #[must_use]
    pub fn substitute(encoder: &CategoryEncoder) -> &str {
        encoder.fallback()
    }
}

/// Encoders for every categorical column, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderTable {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl EncoderTable {
    pub fn insert(&mut self, column: impl Into<String>, encoder: CategoryEncoder) {
        self.encoders.insert(column.into(), encoder);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CategoryEncoder> {
        self.encoders.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Check each encoder and that every encoder names a layout column.
    ///
    /// # Errors
    /// Returns `PreprocessError` describing the first inconsistency.
    pub fn check_against(&self, feature_names: &[String]) -> Result<(), PreprocessError> {
        for (column, encoder) in &self.encoders {
            if !feature_names.iter().any(|n| n == column) {
                return Err(PreprocessError::UnknownColumn(column.clone()));
            }
            encoder.check()?;
        }
        Ok(())
    }
}
