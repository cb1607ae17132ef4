//! Error types for the avatar gateway

use std::time::Duration;

use thiserror::Error;

use crate::fragment::FragmentStage;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the avatar gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// External tool could not be started or exited non-zero
    #[error("process error: {0}")]
    Process(String),

    /// External call exceeded its deadline
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Chat completion failed or returned output that violates the reply schema
    #[error("dialogue error: {0}")]
    Dialogue(String),

    /// A fragment failed while its reply was being assembled
    #[error("assembly failed at fragment {index} after stage {stage}: {source}")]
    Assembly {
        index: usize,
        stage: FragmentStage,
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
