//! Severity prediction results and assessment records.

use serde::{Deserialize, Serialize};

use super::risk::RiskLevel;

/// Number of severity classes a deployment predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityScheme {
    /// No disease, mild-moderate, severe-critical.
    ThreeClass,
    /// The original 0-4 severity scale.
    FiveClass,
}

impl SeverityScheme {
    #[must_use]
    pub fn from_classes(n_classes: usize) -> Option<Self> {
        match n_classes {
            3 => Some(Self::ThreeClass),
            5 => Some(Self::FiveClass),
            _ => None,
        }
    }

    #[must_use]
    pub fn n_classes(self) -> usize {
        match self {
            Self::ThreeClass => 3,
            Self::FiveClass => 5,
        }
    }

    /// Label used when the model metadata carries no class mapping.
    #[must_use]
    pub fn default_label(self, class: u8) -> &'static str {
        match (self, class) {
            (_, 0) => "No Disease",
            (Self::ThreeClass, 1) => "Mild-Moderate",
            (Self::ThreeClass, _) => "Severe-Critical",
            (Self::FiveClass, 1) => "Mild",
            (Self::FiveClass, 2) => "Moderate",
            (Self::FiveClass, 3) => "Severe",
            (Self::FiveClass, _) => "Critical",
        }
    }

    /// Risk level shown to the user for a predicted class.
    #[must_use]
    pub fn risk_level(self, class: u8) -> RiskLevel {
        let grouped = match self {
            Self::ThreeClass => class.min(2),
            Self::FiveClass => group_severity(class),
        };
        match grouped {
            0 => RiskLevel::Low,
            1 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

/// Collapse the 0-4 severity scale into three clinical groups:
/// 0 stays 0, 1-2 become 1, 3-4 become 2.
#[must_use]
pub fn group_severity(severity: u8) -> u8 {
    match severity {
        0 => 0,
        1 | 2 => 1,
        _ => 2,
    }
}

/// Output of the severity classifier for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted severity class in `0..n_classes`.
    pub class: u8,

    /// Per-class probability estimates.
    pub probabilities: Vec<f64>,

    /// Probability of the chosen class (0.0 to 1.0).
    pub confidence: f64,
}

impl PredictionResult {
    /// Build a result from a full distribution, taking the confidence of
    /// `class` from it.
    #[must_use]
    pub fn from_distribution(class: u8, probabilities: Vec<f64>) -> Self {
        let confidence = probabilities
            .get(usize::from(class))
            .copied()
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        Self {
            class,
            probabilities,
            confidence,
        }
    }
}

/// A completed assessment, ready for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier
    pub id: String,

    pub result: PredictionResult,

    /// Human-readable name of the predicted class
    pub severity_label: String,

    pub risk_level: RiskLevel,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(result: PredictionResult, severity_label: impl Into<String>, risk_level: RiskLevel) -> Self {
        Self {
            id: uuid_v4(),
            result,
            severity_label: severity_label.into(),
            risk_level,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Generate a random v4-format UUID using a CSPRNG seeded from OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
