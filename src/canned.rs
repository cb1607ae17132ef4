//! Pre-recorded replies served without calling any model
//!
//! Each canned fragment has its audio and transcript on disk next to the
//! request workspaces: `<name>_<i>.wav` and `<name>_<i>.json`.

use std::path::Path;

use crate::Result;
use crate::assembler::{audio_file_to_base64, read_transcript};
use crate::fragment::{Animation, AssembledFragment, FacialExpression, ReplyFragment};

/// A canned fragment whose audio and transcript are loaded from disk
struct CannedLine {
    text: &'static str,
    facial_expression: FacialExpression,
    animation: Animation,
}

/// A named set of canned fragments
pub struct CannedReply {
    name: &'static str,
    lines: &'static [CannedLine],
}

/// Greeting sent when the user opens the conversation with an empty message
pub const INTRO: CannedReply = CannedReply {
    name: "intro",
    lines: &[
        CannedLine {
            text: "Hey there... How was your day?",
            facial_expression: FacialExpression::Smile,
            animation: Animation::Talking1,
        },
        CannedLine {
            text: "I was waiting for you. Tell me everything!",
            facial_expression: FacialExpression::Surprised,
            animation: Animation::Talking0,
        },
    ],
};

/// Reminder sent when no provider API key is configured
pub const MISSING_API_KEY: CannedReply = CannedReply {
    name: "api",
    lines: &[
        CannedLine {
            text: "Please don't forget to add your API key!",
            facial_expression: FacialExpression::Serious,
            animation: Animation::Talking0,
        },
        CannedLine {
            text: "I can't think or speak without it.",
            facial_expression: FacialExpression::Thoughtful,
            animation: Animation::Agreeing0,
        },
    ],
};

impl CannedReply {
    /// Asset file stems, e.g. `intro_0`, `intro_1`
    #[must_use]
    pub fn asset_stems(&self) -> Vec<String> {
        (0..self.lines.len())
            .map(|i| format!("{}_{i}", self.name))
            .collect()
    }

    /// Load the reply's fragments with their audio and transcripts from `audio_dir`
    ///
    /// # Errors
    ///
    /// Returns error if an asset is missing or a transcript is not valid JSON
    pub async fn load(&self, audio_dir: &Path) -> Result<Vec<AssembledFragment>> {
        let mut fragments = Vec::with_capacity(self.lines.len());

        for (line, stem) in self.lines.iter().zip(self.asset_stems()) {
            let audio = audio_file_to_base64(&audio_dir.join(format!("{stem}.wav"))).await?;
            let lipsync = read_transcript(&audio_dir.join(format!("{stem}.json"))).await?;

            fragments.push(AssembledFragment {
                reply: ReplyFragment {
                    text: line.text.to_string(),
                    facial_expression: line.facial_expression,
                    animation: line.animation,
                },
                audio,
                lipsync,
            });
        }

        Ok(fragments)
    }

    /// Asset files that are missing from `audio_dir`
    #[must_use]
    pub fn missing_assets(&self, audio_dir: &Path) -> Vec<std::path::PathBuf> {
        self.asset_stems()
            .into_iter()
            .flat_map(|stem| [format!("{stem}.wav"), format!("{stem}.json")])
            .map(|file| audio_dir.join(file))
            .filter(|path| !path.exists())
            .collect()
    }
}
