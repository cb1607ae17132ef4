//! Text-to-speech (TTS) processing

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::{ProviderConfig, VoiceConfig};
use crate::{Error, Result};

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
    voice: String,
    model: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using the `OpenAI` speech endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new_openai(provider: &ProviderConfig, voice: &VoiceConfig) -> Result<Self> {
        let api_key = provider
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OpenAI API key required for TTS".to_string()))?;

        let endpoint = provider
            .base_url
            .join("audio/speech")
            .map_err(|e| Error::Config(format!("invalid TTS endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(provider.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            voice: voice.tts_voice.clone(),
            model: voice.tts_model.clone(),
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the request fails; the upstream detail is logged
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        tracing::debug!(chars = text.len(), voice = %self.voice, "starting synthesis");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "TTS request failed");
                Error::Synthesis("speech request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Synthesis(format!("speech API returned {status}")));
        }

        let audio = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read TTS response body");
            Error::Synthesis("failed to read speech audio".to_string())
        })?;

        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }

    /// Synthesize text and write the audio to `path`, replacing any existing file
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or the file cannot be written
    pub async fn synthesize_to_file(&self, text: &str, path: &Path) -> Result<()> {
        let audio = self.synthesize(text).await?;
        tokio::fs::write(path, &audio).await?;
        tracing::debug!(path = %path.display(), "wrote synthesized audio");
        Ok(())
    }
}
