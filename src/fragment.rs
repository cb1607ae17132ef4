//! Reply fragments exchanged with the avatar client

use std::fmt;

use serde::{Deserialize, Serialize};

/// Facial expression the avatar wears while speaking a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacialExpression {
    Smile,
    Serious,
    Thoughtful,
    Surprised,
    Default,
}

/// Body animation played while a fragment is spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Animation {
    #[serde(rename = "Talking_0")]
    Talking0,
    #[serde(rename = "Talking_1")]
    Talking1,
    Idle,
    #[serde(rename = "Agreeing_0")]
    Agreeing0,
    #[serde(rename = "Agreeing_1")]
    Agreeing1,
}

/// One unit of a multi-part reply, as generated by the dialogue model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyFragment {
    pub text: String,
    pub facial_expression: FacialExpression,
    pub animation: Animation,
}

/// A reply fragment enriched with its spoken audio and viseme transcript
///
/// `audio` is the base64-encoded audio file and `lipsync` the parsed
/// transcript produced from that same file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledFragment {
    #[serde(flatten)]
    pub reply: ReplyFragment,
    pub audio: String,
    pub lipsync: serde_json::Value,
}

/// Progress of a single fragment through the assembly pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FragmentStage {
    #[default]
    Pending,
    Synthesized,
    LipSynced,
    Encoded,
}

impl FragmentStage {
    /// Stage name as it appears in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synthesized => "synthesized",
            Self::LipSynced => "lip_synced",
            Self::Encoded => "encoded",
        }
    }
}

impl fmt::Display for FragmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
