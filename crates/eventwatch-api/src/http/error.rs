//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use eventwatch_types::error::{CatalogError, PipelineError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Dedup catalog errors.
    Catalog(CatalogError),
    /// Classifier/extractor errors.
    Pipeline(PipelineError),
    /// No chat model is configured.
    PipelineDisabled(String),
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        AppError::Catalog(e)
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Catalog(inner) => AppError::Catalog(inner),
            other => AppError::Pipeline(other),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Catalog(CatalogError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Catalog(e @ CatalogError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "EVENT_NOT_FOUND", e.to_string())
            }
            AppError::Catalog(e @ CatalogError::ConsistencyViolation { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONSISTENCY_VIOLATION",
                e.to_string(),
            ),
            AppError::Catalog(CatalogError::Collaborator(msg)) => {
                (StatusCode::BAD_GATEWAY, "COLLABORATOR_ERROR", msg.clone())
            }
            AppError::Pipeline(e) => (StatusCode::BAD_GATEWAY, "PIPELINE_ERROR", e.to_string()),
            AppError::PipelineDisabled(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PIPELINE_DISABLED", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "Request failed");
        }

        let body = ApiResponse::error(code, &message, None, uuid::Uuid::now_v7().to_string());
        (status, Json(body)).into_response()
    }
}
