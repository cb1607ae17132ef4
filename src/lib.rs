//! Avatar Gateway - Chat and lip-sync backend for a talking 3D avatar
//!
//! This library provides the core functionality for the avatar gateway:
//! - Dialogue generation as structured reply fragments
//! - Speech synthesis and transcription
//! - Phoneme timing extraction via external tools
//! - Canned replies for the introduction and missing credentials
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Avatar frontend                     │
//! │        POST /chat        │        POST /stt          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Avatar Gateway                      │
//! │  Dialogue  │  Assembler  │  Workspace  │  Canned     │
//! └──────────┬─────────────────────────┬────────────────┘
//!            │                         │
//! ┌──────────▼──────────┐   ┌──────────▼────────────────┐
//! │ OpenAI-compatible   │   │  ffmpeg  │  rhubarb        │
//! │ LLM │ TTS │ STT     │   │  (child processes)         │
//! └─────────────────────┘   └───────────────────────────┘
//! ```

pub mod api;
pub mod assembler;
pub mod canned;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod fragment;
pub mod lipsync;
pub mod process;
pub mod voice;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use fragment::{Animation, AssembledFragment, FacialExpression, ReplyFragment};
