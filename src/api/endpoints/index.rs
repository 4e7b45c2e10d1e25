//! API root with an endpoint listing.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config::{APP_NAME, APP_VERSION};

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub model: Option<String>,
    pub f1_score: Option<f64>,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// `GET /`
pub async fn index(State(ctx): State<ApiContext>) -> Json<IndexResponse> {
    let metadata = ctx.service.as_deref().map(|s| s.metadata());

    let endpoints = BTreeMap::from([
        ("POST /api/predict", "Get a heart disease severity assessment"),
        ("GET /api/health", "Health check"),
        ("GET /api/info", "Model information"),
        ("GET /api/model-info", "Model information (alias)"),
    ]);

    Json(IndexResponse {
        name: APP_NAME,
        version: APP_VERSION,
        model: metadata.map(|m| format!("{} {}", m.model_type, m.model_name)),
        f1_score: metadata.map(|m| m.performance.test_f1_weighted),
        endpoints,
    })
}
