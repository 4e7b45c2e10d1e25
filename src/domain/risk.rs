//! Risk levels and their user-facing presentation.

use serde::{Deserialize, Serialize};

/// Risk category shown for a predicted severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// No disease predicted
    Low,
    /// Mild to moderate disease, follow-up recommended
    Moderate,
    /// Severe disease, urgent consultation advised
    High,
}

/// Display block returned to clients with each assessment.
#[derive(Debug, Clone, Serialize)]
pub struct RiskDisplay {
    pub title: &'static str,
    pub message: &'static str,
    pub severity_color: &'static str,
    pub background_color: &'static str,
    pub icon: &'static str,
    pub urgency: &'static str,
}

impl RiskLevel {
    /// Category name, e.g. "Moderate Risk".
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }

    /// Chart colour for this level.
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#4CAF50",
            Self::Moderate => "#FF9800",
            Self::High => "#E91E63",
        }
    }

    /// One-line recommendation.
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => "Maintain healthy habits and schedule routine annual check-ups.",
            Self::Moderate => "Consult your doctor within 2-4 weeks to discuss lifestyle changes and monitoring.",
            Self::High => "Seek medical attention urgently, within 24-48 hours.",
        }
    }

    #[must_use]
    pub fn display(&self) -> RiskDisplay {
        match self {
            Self::Low => RiskDisplay {
                title: "Low Risk - Looking Good!",
                message: "Based on your information, your heart disease risk appears to be low. Keep up the healthy habits!",
                severity_color: "#4CAF50",
                background_color: "#E8F5E9",
                icon: "check_circle",
                urgency: "none",
            },
            Self::Moderate => RiskDisplay {
                title: "Mild to Moderate Risk Detected",
                message: "Your assessment shows some factors that indicate mild to moderate heart disease risk. A consultation with your doctor is recommended to discuss lifestyle changes and monitoring.",
                severity_color: "#FF9800",
                background_color: "#FFF3E0",
                icon: "warning",
                urgency: "medium",
            },
            Self::High => RiskDisplay {
                title: "Severe Risk - Urgent Action Needed",
                message: "Your assessment indicates severe heart disease risk factors. Seek medical attention urgently within 24-48 hours.",
                severity_color: "#E91E63",
                background_color: "#FCE4EC",
                icon: "error",
                urgency: "high",
            },
        }
    }

    #[must_use]
    pub fn action_items(&self) -> &'static [&'static str] {
        match self {
            Self::Low => &[
                "Maintain your current healthy lifestyle",
                "Schedule routine check-ups annually",
                "Continue regular exercise (30+ minutes, 5 days/week)",
                "Eat a heart-healthy diet rich in fruits and vegetables",
                "Monitor your blood pressure at home monthly",
            ],
            Self::Moderate => &[
                "Schedule a consultation with your primary care doctor within 2-4 weeks",
                "Discuss lifestyle modifications (diet, exercise, stress management)",
                "Get a comprehensive metabolic panel and lipid profile blood test",
                "Consider joining a cardiac rehabilitation or wellness program",
                "Monitor symptoms (chest pain, shortness of breath) and track changes",
                "Reduce sodium intake and maintain healthy weight",
            ],
            Self::High => &[
                "Contact a cardiologist immediately for urgent consultation (within 24-48 hours)",
                "Do not delay - severe risk factors detected",
                "Avoid strenuous physical activity until medically evaluated",
                "Keep a detailed symptom diary (chest pain, breathing difficulty, fatigue)",
                "Have someone accompany you to medical appointments",
                "Bring complete medical history, current medications, and this assessment",
                "If experiencing acute symptoms (severe chest pain, shortness of breath), call emergency services",
            ],
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Plain-language description of a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceBand {
    pub text: &'static str,
    pub color: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
}

impl ConfidenceBand {
    #[must_use]
    pub fn describe(confidence: f64) -> Self {
        let (text, color, warning) = if confidence >= 0.9 {
            ("Very Confident", "#4CAF50", false)
        } else if confidence >= 0.75 {
            ("Confident", "#8BC34A", false)
        } else if confidence >= 0.60 {
            ("Moderately Confident", "#FFC107", false)
        } else {
            ("Low Confidence", "#FF6B35", true)
        };
        Self {
            text,
            color,
            warning,
        }
    }
}
