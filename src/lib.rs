//! polyvox - multilingual voice question answering
//!
//! Ask a question by typing, speaking, or uploading an audio file; the
//! answer comes back in the question's language, as text and synthesized
//! speech.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod app;
pub mod artifact;
pub mod audio;
pub mod chat;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod lang;
pub mod pipeline;
pub mod stt;
pub mod tts;

// Core traits (input → model → voice)
pub use audio::source::CaptureSource;
pub use chat::model::ChatModel;
pub use stt::transcriber::{SpeechTranscriber, Transcript};
pub use tts::synthesizer::SpeechSynthesizer;

// Pipeline
pub use pipeline::{Exchange, InputPayload, Pipeline};

// Conversation state
pub use chat::history::{Answer, ConversationHistory, InputSource, Question, Session};

// Language identification
pub use lang::{LanguageCode, LanguageIdentifier};

// Artifact ownership
pub use artifact::{ArtifactFormat, ArtifactId, ArtifactLifecycleManager, Disposition};
pub use tts::router::PlaybackHandle;

// Error handling
pub use error::{PolyvoxError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
