//! TOML configuration file loading
//!
//! Supports `~/.config/avatar-gateway/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Language/speech provider configuration
    #[serde(default)]
    pub provider: ProviderFileConfig,

    /// Dialogue model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech model configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// External tool configuration
    #[serde(default)]
    pub tools: ToolsFileConfig,

    /// Directory layout
    #[serde(default)]
    pub storage: StorageFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Maximum number of chat replies assembled at the same time
    pub max_concurrent_chats: Option<usize>,
}

/// Provider API configuration
#[derive(Debug, Default, Deserialize)]
pub struct ProviderFileConfig {
    /// API key (prefer the `OPENAI_API_KEY` env var)
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Dialogue model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Chat completion model (e.g. "gpt-3.5-turbo-1106")
    pub model: Option<String>,

    /// Replaces the built-in persona prompt
    pub system_prompt: Option<String>,
}

/// Speech model configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,
}

/// External tool configuration
#[derive(Debug, Default, Deserialize)]
pub struct ToolsFileConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg: Option<PathBuf>,

    /// Path or name of the rhubarb binary
    pub rhubarb: Option<PathBuf>,

    /// Per-invocation timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Directory layout
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Canned assets and per-request workspaces
    pub audio_dir: Option<PathBuf>,

    /// Upload staging directory
    pub upload_dir: Option<PathBuf>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The default path is optional:
/// returns `ConfigFile::default()` if it doesn't exist or can't be parsed.
///
/// # Errors
///
/// Returns error if an explicitly requested file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(ConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(ConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/avatar-gateway/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("avatar-gateway").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 8080

            [tools]
            rhubarb = "./bin/rhubarb"
            "#,
        )
        .unwrap();

        assert_eq!(fc.server.port, Some(8080));
        assert_eq!(fc.tools.rhubarb, Some(PathBuf::from("./bin/rhubarb")));
        assert!(fc.tools.ffmpeg.is_none());
        assert!(fc.provider.api_key.is_none());
    }

    #[test]
    fn rejects_unknown_sections() {
        let result: std::result::Result<ConfigFile, _> = toml::from_str("[channels]\nslack = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let err = load_config_file(Some(Path::new("/nonexistent/avatar.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[voice]\ntts_voice = \"nova\"\n").unwrap();

        let fc = load_config_file(Some(&path)).unwrap();
        assert_eq!(fc.voice.tts_voice.as_deref(), Some("nova"));
    }
}
