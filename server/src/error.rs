use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::TtsError;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Tts(#[from] TtsError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Tts(e) => match e {
                TtsError::InvalidInput(_) | TtsError::InvalidParameter { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                TtsError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                TtsError::SynthesisBackend { .. } => {
                    tracing::error!("Synthesis backend error: {}", e);
                    (StatusCode::BAD_GATEWAY, e.to_string())
                }
                TtsError::FormatMismatch { .. } => {
                    tracing::error!("Audio format error: {}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse { error: error_message, code: status.as_u16() });

        (status, body).into_response()
    }
}
