//! Voice processing module
//!
//! Speech synthesis and transcription against the provider's audio API.

mod stt;
mod tts;

pub use stt::SpeechToText;
pub use tts::TextToSpeech;
