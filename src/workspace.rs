//! Per-request scratch directories for generated audio and transcripts
//!
//! Every chat request gets its own directory under the audio root, so
//! concurrent requests never share `message_<i>.*` files. The directory and
//! everything in it is removed when the workspace is dropped, on both the
//! success and the failure path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::Result;

/// Scratch directory owned by one chat request
#[derive(Debug)]
pub struct RequestWorkspace {
    request_id: Uuid,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create a fresh workspace under `root`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn create(root: &Path, request_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("chat-{}-", request_id.simple()))
            .tempdir_in(root)?;

        tracing::debug!(%request_id, path = %dir.path().display(), "created request workspace");
        Ok(Self { request_id, dir })
    }

    /// Request this workspace belongs to
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Directory holding the request's files
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File names for message `index` within this workspace
    #[must_use]
    pub fn message(&self, index: usize) -> MessageFiles {
        MessageFiles::new(self.path(), index)
    }
}

/// The three files produced for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFiles {
    /// Synthesized speech
    pub mp3: PathBuf,
    /// PCM waveform fed to the phoneme extractor
    pub wav: PathBuf,
    /// Viseme transcript
    pub json: PathBuf,
}

impl MessageFiles {
    /// Build the `message_<index>.{mp3,wav,json}` paths inside `dir`
    #[must_use]
    pub fn new(dir: &Path, index: usize) -> Self {
        let stem = format!("message_{index}");
        Self {
            mp3: dir.join(format!("{stem}.mp3")),
            wav: dir.join(format!("{stem}.wav")),
            json: dir.join(format!("{stem}.json")),
        }
    }
}
