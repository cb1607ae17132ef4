//! Speech-to-text endpoint
//!
//! The uploaded audio is staged as a temp file in the upload directory and
//! removed when the handler returns, whether transcription succeeded or not.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{ApiError, ApiState};

/// Multipart field carrying the audio file
pub const AUDIO_FIELD: &str = "audio";

/// Body limit for audio uploads (25 MiB)
const UPLOAD_LIMIT_BYTES: usize = 25 << 20;

/// Build speech-to-text router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/stt", post(transcribe))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(state)
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Transcribe an uploaded audio file to text
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let upload = stage_upload(&state.upload_dir, multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("missing '{AUDIO_FIELD}' file")))?;

    let stt = state
        .stt
        .as_ref()
        .ok_or(ApiError::NotConfigured("speech recognition not configured"))?;

    let text = stt.transcribe_file(upload.path()).await.map_err(|e| {
        tracing::error!(error = %e, "transcription failed");
        ApiError::Internal("transcription failed")
    })?;

    Ok(Json(TranscribeResponse { text }))
}

/// Write the first non-empty `audio` field to a temp file in `dir`
async fn stage_upload(
    dir: &Path,
    mut multipart: Multipart,
) -> Result<Option<NamedTempFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, "invalid multipart payload"))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let suffix = upload_suffix(field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&e, "failed to read upload"))?;
        if bytes.is_empty() {
            continue;
        }

        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(stage_error)?;
        tokio::fs::write(file.path(), &bytes)
            .await
            .map_err(stage_error)?;

        tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "staged upload");
        return Ok(Some(file));
    }

    Ok(None)
}

/// Keep the client's file extension so the API can detect the container
fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| ".mp3".to_string(), |ext| format!(".{}", ext.to_ascii_lowercase()))
}

/// Body-limit violations are 413, everything else a malformed request
fn multipart_error(e: &MultipartError, context: &str) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!(
            "upload exceeds {} MiB",
            UPLOAD_LIMIT_BYTES >> 20
        ))
    } else {
        ApiError::BadRequest(format!("{context}: {}", e.body_text()))
    }
}

fn stage_error(e: std::io::Error) -> ApiError {
    tracing::error!(error = %e, "failed to stage upload");
    ApiError::Internal("failed to store upload")
}
