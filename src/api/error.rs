//! API error types with structured JSON responses.
//!
//! Every failure is answered with
//! `{"success": false, "error": {"type", "message", "display", ...}}` so a
//! client can render it without inspecting the status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{FieldIssue, ValidationError};
use crate::HeartRiskError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldIssue>>,
    pub display: ErrorDisplay,
}

#[derive(Debug, Serialize)]
pub struct ErrorDisplay {
    pub title: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid patient data: {0}")]
    Validation(#[from] ValidationError),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Internal error: {0}")]
    Internal(String),
}

const CHECK_INFO: &str = "Please Check Your Information";

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorDetail) {
        match self {
            ApiError::Validation(ValidationError::Empty) => (
                StatusCode::BAD_REQUEST,
                validation_detail(
                    "No data provided",
                    "Missing Data",
                    "Please provide patient data in the request body.".into(),
                ),
            ),
            ApiError::Validation(ValidationError::MissingFields(fields)) => {
                let mut detail = validation_detail(
                    "Missing required fields",
                    CHECK_INFO,
                    format!(
                        "The following required fields are missing: {}",
                        fields.join(", ")
                    ),
                );
                detail.fields = Some(fields.clone());
                (StatusCode::BAD_REQUEST, detail)
            }
            ApiError::Validation(ValidationError::InvalidFields(issues)) => {
                let names: Vec<String> = issues.iter().map(|i| i.field.clone()).collect();
                let mut detail = validation_detail(
                    "Invalid field values",
                    CHECK_INFO,
                    format!(
                        "The following fields have invalid values: {}",
                        names.join(", ")
                    ),
                );
                detail.fields = Some(names);
                detail.details = Some(issues.clone());
                (StatusCode::BAD_REQUEST, detail)
            }
            ApiError::MalformedBody(reason) => (
                StatusCode::BAD_REQUEST,
                validation_detail(
                    "Request body must be a JSON object",
                    "Missing Data",
                    format!("The request could not be read: {reason}"),
                ),
            ),
            ApiError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    kind: "service_unavailable",
                    message: "Model not loaded".into(),
                    fields: None,
                    details: None,
                    display: ErrorDisplay {
                        title: "Service Unavailable",
                        message: "The assessment model is not available. Please try again later."
                            .into(),
                    },
                },
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetail {
                        kind: "server_error",
                        message: "An unexpected error occurred".into(),
                        fields: None,
                        details: None,
                        display: ErrorDisplay {
                            title: "Something Went Wrong",
                            message: "Please try again or contact support if the problem persists."
                                .into(),
                        },
                    },
                )
            }
        }
    }
}

fn validation_detail(message: &str, title: &'static str, display: String) -> ErrorDetail {
    ErrorDetail {
        kind: "validation_error",
        message: message.into(),
        fields: None,
        details: None,
        display: ErrorDisplay {
            title,
            message: display,
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        (
            status,
            Json(ErrorBody {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

impl From<HeartRiskError> for ApiError {
    fn from(err: HeartRiskError) -> Self {
        match err {
            HeartRiskError::Validation(e) => ApiError::Validation(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
