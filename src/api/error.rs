//! HTTP-facing error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API errors
///
/// Bodies are always `{"error": "<message>"}`; upstream detail never leaves
/// the server.
#[derive(Debug)]
pub enum ApiError {
    NotConfigured(&'static str),
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
