//! HTTP API server for the avatar gateway

pub mod chat;
mod error;
pub mod health;
pub mod stt;

pub use error::ApiError;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assembler::ResponseAssembler;
use crate::dialogue::DialogueGenerator;
use crate::lipsync::LipSync;
use crate::voice::{SpeechToText, TextToSpeech};
use crate::{Config, Result};

/// Dialogue generation and reply assembly, available once a provider key is set
pub struct ChatPipeline {
    pub dialogue: DialogueGenerator,
    pub assembler: ResponseAssembler,
}

/// Shared state for API handlers
pub struct ApiState {
    /// Canned assets and per-request workspaces
    pub audio_dir: PathBuf,
    /// Upload staging directory
    pub upload_dir: PathBuf,
    /// Speech recognition; `None` without a provider key
    pub stt: Option<SpeechToText>,
    /// Chat generation; `None` without a provider key
    pub chat: Option<ChatPipeline>,
    /// Bounds how many replies are assembled at once
    pub chat_permits: Semaphore,
}

impl ApiState {
    /// Build handler state from configuration
    ///
    /// Missing credentials are not an error: speech and chat generation are
    /// disabled and the canned replies take over.
    ///
    /// # Errors
    ///
    /// Returns error if a provider client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let (stt, chat) = if config.provider.api_key.is_some() {
            let stt = SpeechToText::new_whisper(&config.provider, &config.voice)?;
            let tts = Arc::new(TextToSpeech::new_openai(&config.provider, &config.voice)?);
            let chat = ChatPipeline {
                dialogue: DialogueGenerator::new_openai(&config.provider, &config.llm)?,
                assembler: ResponseAssembler::new(
                    tts,
                    LipSync::new(&config.tools),
                    config.storage.audio_dir.clone(),
                ),
            };
            (Some(stt), Some(chat))
        } else {
            tracing::warn!("OPENAI_API_KEY not set - chat replies fall back to canned audio, /stt disabled");
            (None, None)
        };

        Ok(Self {
            audio_dir: config.storage.audio_dir.clone(),
            upload_dir: config.storage.upload_dir.clone(),
            stt,
            chat,
            chat_permits: Semaphore::new(config.server.max_concurrent_chats),
        })
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    // CORS layer for cross-origin requests from the avatar frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(stt::router(state.clone()))
        .merge(chat::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server from configuration
    ///
    /// # Errors
    ///
    /// Returns error if handler state cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ApiState::from_config(config)?),
            port: config.server.port,
        })
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
