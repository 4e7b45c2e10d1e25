//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_type: Option<String>,
    pub model_version: Option<String>,
    pub timestamp: String,
}

/// `GET /api/health`: liveness and model status. Never fails.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let metadata = ctx.service.as_deref().map(|s| s.metadata());

    Json(HealthResponse {
        status: "healthy",
        model_loaded: metadata.is_some(),
        model_type: metadata.map(|m| m.model_type.clone()),
        model_version: metadata.map(|m| m.version.clone()),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}
