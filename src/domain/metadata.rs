//! Descriptive metadata shipped alongside a trained model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::assessment::SeverityScheme;

/// How the severity decision is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelApproach {
    /// One multi-class model.
    #[default]
    Direct,
    /// Binary disease gate followed by a severity model.
    Hierarchical,
}

/// Held-out scores recorded at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceMetrics {
    pub test_f1_weighted: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_f1_macro: Option<f64>,
    pub test_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_recall: Option<f64>,
    #[serde(default)]
    pub f1_per_class: Vec<f64>,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub model_type: String,
    #[serde(default)]
    pub approach: ModelApproach,
    pub num_classes: usize,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub class_mapping: BTreeMap<u8, String>,
    /// Mapping from the 0-4 scale to the grouped classes, when grouping was used.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub original_to_grouped: BTreeMap<u8, u8>,
    #[serde(default)]
    pub performance: PerformanceMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModelMetadata {
    #[must_use]
    pub fn scheme(&self) -> Option<SeverityScheme> {
        SeverityScheme::from_classes(self.num_classes)
    }

    /// Display name for a class: explicit mapping first, then `class_names`,
    /// then the scheme default.
    #[must_use]
    pub fn label_for(&self, class: u8) -> String {
        if let Some(label) = self.class_mapping.get(&class) {
            return label.clone();
        }
        if let Some(label) = self.class_names.get(usize::from(class)) {
            return label.clone();
        }
        self.scheme()
            .map_or_else(|| format!("Class {class}"), |s| s.default_label(class).to_string())
    }
}

#[cfg(test)]
pub(crate) fn sample_metadata(num_classes: usize) -> ModelMetadata {
    ModelMetadata {
        model_name: "test-model".into(),
        model_type: "Gradient Boosting".into(),
        approach: ModelApproach::Direct,
        num_classes,
        class_names: Vec::new(),
        class_mapping: BTreeMap::new(),
        original_to_grouped: BTreeMap::new(),
        performance: PerformanceMetrics {
            test_f1_weighted: 0.61,
            test_accuracy: 0.63,
            ..PerformanceMetrics::default()
        },
        training_date: None,
        random_state: Some(42),
        version: "1.0.0".into(),
        description: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_metadata() {
        let json = r#"{
            "model_name": "hierarchical",
            "model_type": "XGBoost",
            "approach": "hierarchical",
            "num_classes": 3,
            "class_mapping": {"0": "No Disease", "1": "Mild-Moderate", "2": "Severe-Critical"},
            "performance": {"test_f1_weighted": 0.62, "test_accuracy": 0.64},
            "version": "2.1"
        }"#;
        let meta: ModelMetadata = serde_json::from_str(json).expect("parse");
        assert_eq!(meta.approach, ModelApproach::Hierarchical);
        assert_eq!(meta.scheme(), Some(SeverityScheme::ThreeClass));
        assert_eq!(meta.label_for(2), "Severe-Critical");
        assert!(meta.performance.f1_per_class.is_empty());
    }

    #[test]
    fn test_label_fallbacks() {
        let mut meta = sample_metadata(5);
        assert_eq!(meta.label_for(3), "Severe");
        meta.class_names = vec!["none".into(), "low".into()];
        assert_eq!(meta.label_for(1), "low");
        meta.num_classes = 4;
        assert_eq!(meta.label_for(3), "Class 3");
    }
}
