use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Document conversion error: {0}")]
    DocumentConversion(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(msg) => AppError::Validation(msg),
            AnalysisError::DocumentConversion(e) => AppError::DocumentConversion(e.to_string()),
            AnalysisError::Inference(e) => AppError::Inference(e.to_string()),
            AnalysisError::Cancelled => AppError::Cancelled,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::DocumentConversion(msg) => {
                tracing::warn!("Document conversion error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "DOCUMENT_CONVERSION_ERROR",
                    format!("Error processing PDF: {msg}"),
                )
            }
            AppError::Inference(msg) => {
                tracing::error!("Inference error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "INFERENCE_ERROR",
                    format!("Error getting analysis: {msg}"),
                )
            }
            AppError::Cancelled => (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                "The analysis was cancelled".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
