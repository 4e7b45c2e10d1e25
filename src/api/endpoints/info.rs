//! Model information endpoint.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::domain::ModelApproach;

#[derive(Debug, Serialize)]
pub struct PerformanceSummary {
    pub test_f1: f64,
    pub test_accuracy: f64,
    pub f1_per_class: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub model: String,
    pub model_type: String,
    pub version: String,
    pub approach: ModelApproach,
    pub estimator: String,
    pub num_classes: usize,
    pub class_mapping: BTreeMap<u8, String>,
    pub performance: PerformanceSummary,
    pub features: usize,
    pub feature_names: Vec<String>,
    pub training_date: Option<String>,
    pub description: String,
}

/// `GET /api/info` and `GET /api/model-info`
pub async fn model_info(State(ctx): State<ApiContext>) -> Result<Json<InfoResponse>, ApiError> {
    let service = ctx.service()?;
    let meta = service.metadata();
    let n_classes = service.scheme().n_classes();

    let class_mapping = (0..n_classes as u8)
        .map(|class| (class, meta.label_for(class)))
        .collect();
    let description = meta.description.clone().unwrap_or_else(|| {
        format!("{n_classes}-class heart disease severity classifier")
    });

    Ok(Json(InfoResponse {
        model: meta.model_name.clone(),
        model_type: meta.model_type.clone(),
        version: meta.version.clone(),
        approach: meta.approach,
        estimator: service.model_description(),
        num_classes: n_classes,
        class_mapping,
        performance: PerformanceSummary {
            test_f1: meta.performance.test_f1_weighted,
            test_accuracy: meta.performance.test_accuracy,
            f1_per_class: meta.performance.f1_per_class.clone(),
        },
        features: service.feature_names().len(),
        feature_names: service.feature_names().to_vec(),
        training_date: meta.training_date.clone(),
        description,
    }))
}
