//! Shared test utilities
//!
//! External tools are replaced by small shell scripts so the full chat
//! pipeline runs without ffmpeg or rhubarb installed.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use avatar_gateway::Config;
use avatar_gateway::api::{self, ApiState};
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;
use wiremock::MockServer;

/// Lip-sync output written by the fake rhubarb
pub const FAKE_LIPSYNC: &str =
    r#"{"metadata":{"duration":0.5},"mouthCues":[{"start":0.0,"end":0.5,"value":"X"}]}"#;

/// Audio bytes returned by the mocked speech endpoint
pub const FAKE_MP3: &[u8] = b"ID3-fake-mp3";

/// Fake tool scripts, written once so no test execs a file another is still writing
pub struct FakeTools {
    _dir: TempDir,
    pub ffmpeg: PathBuf,
    pub rhubarb: PathBuf,
    pub failing_ffmpeg: PathBuf,
    pub failing_rhubarb: PathBuf,
}

/// Shared fake tools
pub fn fake_tools() -> &'static FakeTools {
    static TOOLS: OnceLock<FakeTools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = TempDir::new().expect("failed to create tool dir");
        // ffmpeg -y -i <mp3> <wav>
        let ffmpeg = write_script(dir.path(), "ffmpeg", "cp \"$3\" \"$4\"");
        // rhubarb -f json -o <json> <wav> -r phonetic
        let rhubarb = write_script(
            dir.path(),
            "rhubarb",
            &format!("test -f \"$5\" || exit 2\nprintf '%s' '{FAKE_LIPSYNC}' > \"$4\""),
        );
        let failing_ffmpeg = write_script(
            dir.path(),
            "ffmpeg-broken",
            "echo 'Invalid data found when processing input' >&2\nexit 1",
        );
        let failing_rhubarb = write_script(dir.path(), "rhubarb-broken", "exit 3");

        FakeTools {
            _dir: dir,
            ffmpeg,
            rhubarb,
            failing_ffmpeg,
            failing_rhubarb,
        }
    })
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

/// Per-test directories plus a mock provider
pub struct TestEnv {
    pub root: TempDir,
    pub provider: MockServer,
}

impl TestEnv {
    pub async fn start() -> Self {
        let root = TempDir::new().expect("failed to create test root");
        std::fs::create_dir_all(root.path().join("audios")).unwrap();
        std::fs::create_dir_all(root.path().join("uploads")).unwrap();
        write_canned_assets(&root.path().join("audios"));

        Self {
            root,
            provider: MockServer::start().await,
        }
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.path().join("audios")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    /// Configuration pointing at the mock provider and the fake tools
    pub fn config(&self) -> Config {
        let tools = fake_tools();
        let mut config = Config::default();
        config.provider.api_key = Some(SecretString::from("test-key".to_owned()));
        config.provider.base_url =
            Url::parse(&format!("{}/v1/", self.provider.uri())).expect("valid mock URL");
        config.tools.ffmpeg = tools.ffmpeg.clone();
        config.tools.rhubarb = tools.rhubarb.clone();
        config.storage.audio_dir = self.audio_dir();
        config.storage.upload_dir = self.upload_dir();
        config
    }

    /// Same as `config` but without an API key
    pub fn config_without_key(&self) -> Config {
        let mut config = self.config();
        config.provider.api_key = None;
        config
    }

    /// Request workspaces left behind in the audio directory
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.audio_dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.is_dir())
            .collect()
    }

    /// Files left behind in the upload directory
    pub fn leftover_uploads(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// Write `intro_*` and `api_*` assets with recognizable contents
pub fn write_canned_assets(audio_dir: &Path) {
    for stem in ["intro_0", "intro_1", "api_0", "api_1"] {
        std::fs::write(audio_dir.join(format!("{stem}.wav")), stem.as_bytes()).unwrap();
        std::fs::write(
            audio_dir.join(format!("{stem}.json")),
            format!(r#"{{"metadata":{{"soundFile":"{stem}.wav"}},"mouthCues":[]}}"#),
        )
        .unwrap();
    }
}

/// Build the full API router for a configuration
pub fn build_router(config: &Config) -> axum::Router {
    let state = ApiState::from_config(config).expect("failed to build api state");
    api::router(Arc::new(state))
}
