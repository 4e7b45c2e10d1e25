//! Severity prediction endpoint.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::domain::{Assessment, ConfidenceBand, PatientRecord, RiskDisplay, ValidationError};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub data: PredictionData,
}

#[derive(Debug, Serialize)]
pub struct PredictionData {
    pub prediction: u8,
    pub prediction_label: String,
    pub confidence: f64,
    pub confidence_description: ConfidenceBand,
    pub probabilities: BTreeMap<String, f64>,
    pub risk_level: &'static str,
    pub risk_color: &'static str,
    pub recommendation: &'static str,
    pub display: RiskDisplay,
    pub action_items: &'static [&'static str],
    pub assessment_id: String,
    pub timestamp: String,
}

impl From<Assessment> for PredictionData {
    fn from(a: Assessment) -> Self {
        let risk = a.risk_level;
        Self {
            prediction: a.result.class,
            prediction_label: a.severity_label,
            confidence: a.result.confidence,
            confidence_description: ConfidenceBand::describe(a.result.confidence),
            probabilities: a
                .result
                .probabilities
                .iter()
                .enumerate()
                .map(|(i, p)| (i.to_string(), *p))
                .collect(),
            risk_level: risk.category(),
            risk_color: risk.color(),
            recommendation: risk.recommendation(),
            display: risk.display(),
            action_items: risk.action_items(),
            assessment_id: a.id,
            timestamp: a.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Parse a request body into a patient record.
fn parse_record(body: &[u8]) -> Result<PatientRecord, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::Empty.into());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
    Ok(PatientRecord::from_json(value)?)
}

/// `POST /api/predict`: assess one patient record.
pub async fn predict(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let service = ctx.service()?;
    let record = parse_record(&body)?;

    let assessment = service.assess(&record).map_err(|e| {
        tracing::warn!("Assessment rejected: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(PredictResponse {
        success: true,
        data: assessment.into(),
    }))
}
