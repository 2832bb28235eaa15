//! Speech-to-text transcription.

pub mod transcriber;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use transcriber::{MockTranscriber, SpeechTranscriber, Transcript, UnavailableTranscriber};

#[cfg(feature = "whisper")]
pub use whisper::{WhisperConfig, WhisperTranscriber};
