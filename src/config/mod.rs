//! Configuration management for the avatar gateway

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::{Error, Result};

use file::ConfigFile;

/// Default OpenAI-compatible API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Avatar gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Language/speech provider configuration
    pub provider: ProviderConfig,

    /// Dialogue model configuration
    pub llm: LlmConfig,

    /// Speech model configuration
    pub voice: VoiceConfig,

    /// External tool configuration
    pub tools: ToolsConfig,

    /// Directory layout
    pub storage: StorageConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Maximum number of chat replies assembled at the same time
    pub max_concurrent_chats: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            max_concurrent_chats: 2,
        }
    }
}

/// Provider API configuration
#[derive(Debug)]
pub struct ProviderConfig {
    /// API key; chat generation and speech are unavailable without it
    pub api_key: Option<SecretString>,

    /// Base URL, always ending in `/`
    pub base_url: Url,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Dialogue model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat completion model
    pub model: String,

    /// Replaces the built-in persona prompt
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-1106".to_string(),
            system_prompt: None,
        }
    }
}

/// Speech model configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
        }
    }
}

/// External tool configuration
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Media transcoder binary
    pub ffmpeg: PathBuf,

    /// Phoneme extractor binary
    pub rhubarb: PathBuf,

    /// Deadline for each tool invocation
    pub timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            rhubarb: PathBuf::from("rhubarb"),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Directory layout
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Canned assets and per-request workspaces
    pub audio_dir: PathBuf,

    /// Upload staging directory
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audios"),
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
            tools: ToolsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the config file or an environment value is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a numeric value or the base URL is invalid
    pub fn resolve(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let server = ServerConfig {
            port: match parse_env::<u16>(&env, "AVATAR_PORT")? {
                Some(port) => Some(port),
                None => parse_env(&env, "PORT")?,
            }
            .or(fc.server.port)
            .unwrap_or(defaults.server.port),
            max_concurrent_chats: parse_env(&env, "AVATAR_MAX_CONCURRENT_CHATS")?
                .or(fc.server.max_concurrent_chats)
                .unwrap_or(defaults.server.max_concurrent_chats)
                .max(1),
        };

        let base_url = env("OPENAI_BASE_URL")
            .or(fc.provider.base_url)
            .map_or(Ok(defaults.provider.base_url), |raw| parse_base_url(&raw))?;

        let provider = ProviderConfig {
            api_key: env("OPENAI_API_KEY")
                .or(fc.provider.api_key)
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from),
            base_url,
            timeout: parse_env(&env, "AVATAR_HTTP_TIMEOUT_SECS")?
                .or(fc.provider.timeout_secs)
                .map_or(defaults.provider.timeout, Duration::from_secs),
        };

        let llm = LlmConfig {
            model: env("AVATAR_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(defaults.llm.model),
            system_prompt: fc.llm.system_prompt,
        };

        let voice = VoiceConfig {
            stt_model: env("AVATAR_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.voice.stt_model),
            tts_model: env("AVATAR_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.voice.tts_model),
            tts_voice: env("AVATAR_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.voice.tts_voice),
        };

        let tools = ToolsConfig {
            ffmpeg: env("AVATAR_FFMPEG")
                .map(PathBuf::from)
                .or(fc.tools.ffmpeg)
                .unwrap_or(defaults.tools.ffmpeg),
            rhubarb: env("AVATAR_RHUBARB")
                .map(PathBuf::from)
                .or(fc.tools.rhubarb)
                .unwrap_or(defaults.tools.rhubarb),
            timeout: parse_env(&env, "AVATAR_TOOL_TIMEOUT_SECS")?
                .or(fc.tools.timeout_secs)
                .map_or(defaults.tools.timeout, Duration::from_secs),
        };

        let storage = StorageConfig {
            audio_dir: env("AVATAR_AUDIO_DIR")
                .map(PathBuf::from)
                .or(fc.storage.audio_dir)
                .unwrap_or(defaults.storage.audio_dir),
            upload_dir: env("AVATAR_UPLOAD_DIR")
                .map(PathBuf::from)
                .or(fc.storage.upload_dir)
                .unwrap_or(defaults.storage.upload_dir),
        };

        Ok(Self {
            server,
            provider,
            llm,
            voice,
            tools,
            storage,
        })
    }

    /// Create the audio and upload directories if missing
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.storage.audio_dir, &self.storage.upload_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("valid default base URL")
}

/// Parse a base URL, making sure relative joins keep its path
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| Error::Config(format!("invalid provider base URL {raw:?}: {e}")))
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key} value {raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::resolve(ConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.voice.tts_voice, "alloy");
        assert_eq!(config.voice.tts_model, "tts-1");
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.storage.audio_dir, PathBuf::from("audios"));
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn env_overrides_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 4000

            [voice]
            tts_voice = "nova"
            stt_model = "whisper-large"
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_from(&[("AVATAR_PORT", "5000"), ("AVATAR_TTS_VOICE", "shimmer")]),
        )
        .unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.voice.tts_voice, "shimmer");
        assert_eq!(config.voice.stt_model, "whisper-large");
    }

    #[test]
    fn blank_api_key_is_absent() {
        let config = Config::resolve(ConfigFile::default(), env_from(&[("OPENAI_API_KEY", "  ")]))
            .unwrap();
        assert!(config.provider.api_key.is_none());

        let config = Config::resolve(ConfigFile::default(), env_from(&[("OPENAI_API_KEY", "sk-1")]))
            .unwrap();
        assert_eq!(
            config.provider.api_key.as_ref().map(ExposeSecret::expose_secret),
            Some("sk-1")
        );
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[("OPENAI_BASE_URL", "http://localhost:8080/v1")]),
        )
        .unwrap();
        assert_eq!(config.provider.base_url.as_str(), "http://localhost:8080/v1/");
        assert_eq!(
            config.provider.base_url.join("audio/speech").unwrap().as_str(),
            "http://localhost:8080/v1/audio/speech"
        );
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Config::resolve(ConfigFile::default(), env_from(&[("AVATAR_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::resolve(
            ConfigFile::default(),
            env_from(&[("AVATAR_TOOL_TIMEOUT_SECS", "-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn concurrency_floor_is_one() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[("AVATAR_MAX_CONCURRENT_CHATS", "0")]),
        )
        .unwrap();
        assert_eq!(config.server.max_concurrent_chats, 1);
    }
}
