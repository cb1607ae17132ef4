//! Viseme pipeline: MP3 → WAV → lip-sync transcript
//!
//! Both steps shell out to external tools, strictly in order:
//!
//! ```text
//! ffmpeg -y -i message_<i>.mp3 message_<i>.wav
//! rhubarb -f json -o message_<i>.json message_<i>.wav -r phonetic
//! ```
//!
//! A failed second step leaves the `.wav` behind; the owning request
//! workspace removes it.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::Result;
use crate::config::ToolsConfig;
use crate::process;
use crate::workspace::MessageFiles;

/// Runs the transcoder and phoneme extractor for one message at a time
#[derive(Debug, Clone)]
pub struct LipSync {
    ffmpeg: PathBuf,
    rhubarb: PathBuf,
    timeout: Duration,
}

impl LipSync {
    /// Create a pipeline from tool configuration
    #[must_use]
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            rhubarb: tools.rhubarb.clone(),
            timeout: tools.timeout,
        }
    }

    /// Produce `message_<index>.json` from `message_<index>.mp3` inside `dir`
    ///
    /// # Errors
    ///
    /// Returns a process or timeout error if either tool fails
    pub async fn run(&self, dir: &Path, index: usize) -> Result<()> {
        let files = MessageFiles::new(dir, index);

        let started = Instant::now();
        process::run(
            &self.ffmpeg,
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                files.mp3.as_os_str(),
                files.wav.as_os_str(),
            ],
            self.timeout,
        )
        .await?;
        tracing::info!(index, elapsed_ms = elapsed_ms(started), "conversion done");

        let started = Instant::now();
        process::run(
            &self.rhubarb,
            [
                OsStr::new("-f"),
                OsStr::new("json"),
                OsStr::new("-o"),
                files.json.as_os_str(),
                files.wav.as_os_str(),
                OsStr::new("-r"),
                OsStr::new("phonetic"),
            ],
            self.timeout,
        )
        .await?;
        tracing::info!(index, elapsed_ms = elapsed_ms(started), "lip sync done");

        Ok(())
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
