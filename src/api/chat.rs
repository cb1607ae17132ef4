//! Chat endpoint: text in, spoken and lip-synced avatar replies out

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use super::{ApiError, ApiState};
use crate::canned::{CannedReply, INTRO, MISSING_API_KEY};
use crate::fragment::AssembledFragment;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .with_state(state)
}

/// Chat request
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub messages: Vec<AssembledFragment>,
}

/// Reply to a chat message
///
/// An empty or missing message gets the canned introduction, and without
/// a provider key every message gets the canned key reminder.
async fn chat(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => ChatRequest::default(),
        Err(e) => return Err(ApiError::BadRequest(e.body_text())),
    };

    let Some(message) = request
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
    else {
        return canned(&state, &INTRO).await;
    };

    let Some(pipeline) = state.chat.as_ref() else {
        return canned(&state, &MISSING_API_KEY).await;
    };

    let request_id = Uuid::new_v4();
    async {
        let _permit = state
            .chat_permits
            .acquire()
            .await
            .map_err(|_| ApiError::Internal("server is shutting down"))?;

        let replies = pipeline
            .dialogue
            .generate_replies(message)
            .await
            .map_err(reply_failed)?;

        let messages = pipeline
            .assembler
            .assemble(request_id, replies)
            .await
            .map_err(reply_failed)?;

        Ok(Json(ChatResponse { messages }))
    }
    .instrument(tracing::info_span!("chat", %request_id))
    .await
}

async fn canned(state: &ApiState, reply: &CannedReply) -> Result<Json<ChatResponse>, ApiError> {
    let messages = reply.load(&state.audio_dir).await.map_err(|e| {
        tracing::error!(error = %e, "failed to load canned reply");
        ApiError::Internal("failed to load canned reply")
    })?;
    Ok(Json(ChatResponse { messages }))
}

fn reply_failed(e: crate::Error) -> ApiError {
    tracing::error!(error = %e, "chat reply failed");
    ApiError::Internal("failed to generate reply")
}
