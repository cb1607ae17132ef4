//! Speech-to-text (STT) processing

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::{ProviderConfig, VoiceConfig};
use crate::{Error, Result};

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
    model: String,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new_whisper(provider: &ProviderConfig, voice: &VoiceConfig) -> Result<Self> {
        let api_key = provider
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OpenAI API key required for Whisper".to_string()))?;

        let endpoint = provider
            .base_url
            .join("audio/transcriptions")
            .map_err(|e| Error::Config(format!("invalid STT endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(provider.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: voice.stt_model.clone(),
        })
    }

    /// Transcribe an audio file to text
    ///
    /// The file is always sent as `audio/mpeg`; the API sniffs the real container.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` if the request fails or the response has no text
    pub async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let audio = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "audio.mp3".to_string(), |n| n.to_string_lossy().into_owned());

        tracing::debug!(audio_bytes = audio.len(), file = %file_name, "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::Transcription("transcription request failed".to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!("Whisper API returned {status}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Whisper response");
            Error::Transcription("malformed transcription response".to_string())
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}
