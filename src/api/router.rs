//! API router.
//!
//! Routes:
//! - `GET /` index
//! - `POST /api/predict`
//! - `GET /api/health`
//! - `GET /api/info` (alias `/api/model-info`)

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::CorsOrigins;

/// Build the router with a CORS layer for `origins`.
pub fn api_router(ctx: ApiContext, origins: &CorsOrigins) -> Router {
    let api = Router::new()
        .route("/predict", post(endpoints::predict::predict))
        .route("/health", get(endpoints::health::check))
        .route("/info", get(endpoints::info::model_info))
        .route("/model-info", get(endpoints::info::model_info));

    Router::new()
        .route("/", get(endpoints::index::index))
        .nest("/api", api)
        .with_state(ctx)
        .layer(cors_layer(origins))
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {o:?}");
                        None
                    }
                })
                .collect();
            layer.allow_origin(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::fixture_service;

    fn loaded() -> Router {
        api_router(ApiContext::new(fixture_service()), &CorsOrigins::Any)
    }

    fn unloaded() -> Router {
        api_router(ApiContext::unloaded(), &CorsOrigins::Any)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    fn patient() -> Value {
        json!({
            "age": 63, "sex": "Male", "cp": "typical angina", "trestbps": 145,
            "chol": 233, "fbs": true, "restecg": "lv hypertrophy", "thalch": 150,
            "exang": false, "oldpeak": 2.3, "slope": "downsloping", "ca": 0,
            "thal": "fixed defect"
        })
    }

    #[tokio::test]
    async fn test_predict_returns_class_in_range() {
        let (status, json) = send(loaded(), post_json("/api/predict", &patient())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let data = &json["data"];
        let class = data["prediction"].as_u64().expect("prediction");
        assert!(class < 3);
        let confidence = data["confidence"].as_f64().expect("confidence");
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(data["probabilities"].as_object().expect("map").len(), 3);
        assert!(data["action_items"].as_array().is_some_and(|a| !a.is_empty()));
        assert_eq!(data["assessment_id"].as_str().map(str::len), Some(36));
    }

    #[tokio::test]
    async fn test_predict_missing_age_names_it() {
        let mut body = patient();
        body.as_object_mut().expect("object").remove("age");
        let (status, json) = send(loaded(), post_json("/api/predict", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["type"], "validation_error");
        assert_eq!(json["error"]["fields"], json!(["age"]));
    }

    #[tokio::test]
    async fn test_predict_with_minimal_record_imputes() {
        let body = json!({"age": 50, "sex": 1, "cp": 4, "fbs": 0, "exang": 1});
        let (status, json) = send(loaded(), post_json("/api/predict", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["prediction"].as_u64().is_some_and(|c| c < 3));
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/predict")
            .body(Body::from("{not json"))
            .expect("request");
        let (status, json) = send(loaded(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "validation_error");

        let (status, json) = send(loaded(), post_json("/api/predict", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "No data provided");
    }

    #[tokio::test]
    async fn test_predict_without_model_is_unavailable() {
        let (status, json) = send(unloaded(), post_json("/api/predict", &patient())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_health_without_model_reports_unloaded() {
        let (status, json) = send(unloaded(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["model_loaded"], false);
        assert_eq!(json["status"], "healthy");
        assert!(json["model_type"].is_null());
    }

    #[tokio::test]
    async fn test_health_with_model_reports_version() {
        let (_, json) = send(loaded(), get("/api/health")).await;
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["model_version"], "1.0.0");
    }

    #[tokio::test]
    async fn test_info_and_alias_agree() {
        let (status, info) = send(loaded(), get("/api/info")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, alias) = send(loaded(), get("/api/model-info")).await;
        assert_eq!(info, alias);
        assert_eq!(info["num_classes"], 3);
        assert_eq!(info["features"], 18);
        assert_eq!(info["class_mapping"]["2"], "Severe-Critical");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (status, json) = send(unloaded(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["endpoints"]["POST /api/predict"].is_string());
    }
}
