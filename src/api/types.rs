//! Shared state for the API router.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::application::AssessmentService;

/// Immutable context shared by every handler.
///
/// `service` is `None` when the server runs without a loaded model; health
/// and index stay available, assessment endpoints answer 503.
#[derive(Clone, Default)]
pub struct ApiContext {
    pub service: Option<Arc<AssessmentService>>,
}

impl ApiContext {
    pub fn new(service: AssessmentService) -> Self {
        Self {
            service: Some(Arc::new(service)),
        }
    }

    /// Context without a model.
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// The loaded service, or `ApiError::ModelUnavailable`.
    pub fn service(&self) -> Result<&AssessmentService, ApiError> {
        self.service.as_deref().ok_or(ApiError::ModelUnavailable)
    }
}
