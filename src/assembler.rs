//! Reply assembly: speech, lip sync and encoding for every fragment
//!
//! Fragments are processed one at a time, in order. Each one moves through
//! `pending → synthesized → lip_synced → encoded`; the first failure aborts
//! the whole reply and reports the fragment index and the stage it reached.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use uuid::Uuid;

use crate::fragment::{AssembledFragment, FragmentStage, ReplyFragment};
use crate::lipsync::LipSync;
use crate::voice::TextToSpeech;
use crate::workspace::{MessageFiles, RequestWorkspace};
use crate::{Error, Result};

/// Turns generated replies into speakable, lip-synced fragments
pub struct ResponseAssembler {
    tts: Arc<TextToSpeech>,
    lipsync: LipSync,
    workspace_root: PathBuf,
}

impl ResponseAssembler {
    /// Create an assembler writing request workspaces under `workspace_root`
    #[must_use]
    pub const fn new(tts: Arc<TextToSpeech>, lipsync: LipSync, workspace_root: PathBuf) -> Self {
        Self {
            tts,
            lipsync,
            workspace_root,
        }
    }

    /// Enrich every reply with base64 audio and its viseme transcript
    ///
    /// All intermediate files live in a request workspace that is removed
    /// before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::Assembly` naming the first fragment that failed
    pub async fn assemble(
        &self,
        request_id: Uuid,
        replies: Vec<ReplyFragment>,
    ) -> Result<Vec<AssembledFragment>> {
        let workspace = RequestWorkspace::create(&self.workspace_root, request_id)?;
        let mut stages = vec![FragmentStage::Pending; replies.len()];
        let mut assembled = Vec::with_capacity(replies.len());

        for (index, reply) in replies.into_iter().enumerate() {
            let files = workspace.message(index);
            let result = self
                .assemble_one(&workspace, index, &files, reply, &mut stages[index])
                .await;
            match result {
                Ok(fragment) => assembled.push(fragment),
                Err(source) => {
                    let stage = stages[index];
                    tracing::error!(
                        request_id = %workspace.request_id(),
                        index,
                        %stage,
                        stages = ?stages,
                        error = %source,
                        "fragment assembly failed"
                    );
                    return Err(Error::Assembly {
                        index,
                        stage,
                        source: Box::new(source),
                    });
                }
            }
        }

        tracing::info!(
            request_id = %workspace.request_id(),
            fragments = assembled.len(),
            stages = ?stages,
            "reply assembled"
        );
        Ok(assembled)
    }

    async fn assemble_one(
        &self,
        workspace: &RequestWorkspace,
        index: usize,
        files: &MessageFiles,
        reply: ReplyFragment,
        stage: &mut FragmentStage,
    ) -> Result<AssembledFragment> {
        self.tts.synthesize_to_file(&reply.text, &files.mp3).await?;
        *stage = FragmentStage::Synthesized;

        self.lipsync.run(workspace.path(), index).await?;
        *stage = FragmentStage::LipSynced;

        let audio = audio_file_to_base64(&files.mp3).await?;
        let lipsync = read_transcript(&files.json).await?;
        *stage = FragmentStage::Encoded;

        Ok(AssembledFragment {
            reply,
            audio,
            lipsync,
        })
    }
}

/// Read an audio file and encode it as standard padded base64
///
/// # Errors
///
/// Returns error if the file cannot be read
pub async fn audio_file_to_base64(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Read and parse a viseme transcript without interpreting its shape
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid JSON
pub async fn read_transcript(path: &Path) -> Result<serde_json::Value> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}
