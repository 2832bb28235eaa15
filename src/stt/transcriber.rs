//! Transcription interface.

use crate::audio::transcode::Waveform;
use crate::error::{PolyvoxError, Result};
use std::sync::Arc;

/// Outcome of a transcription attempt.
///
/// "Nothing intelligible was said" is an expected outcome of listening, not
/// an engine failure, so callers pattern-match on it instead of catching an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// A confident transcript.
    Text(String),
    /// The waveform contained no recognizable speech.
    NoSpeech,
}

/// Trait for speech-to-text engines.
///
/// This trait allows swapping implementations (real engine vs mock).
/// Engines are blocking; the pipeline runs them on the blocking thread pool.
pub trait SpeechTranscriber: Send + Sync {
    /// Transcribe a canonical waveform (16kHz mono 16-bit PCM).
    fn transcribe(&self, waveform: &Waveform) -> Result<Transcript>;

    /// Name of the engine/model, for logging.
    fn engine_name(&self) -> &str;
}

/// Implement SpeechTranscriber for Arc<T> to allow sharing across tasks.
impl<T: SpeechTranscriber + ?Sized> SpeechTranscriber for Arc<T> {
    fn transcribe(&self, waveform: &Waveform) -> Result<Transcript> {
        (**self).transcribe(waveform)
    }

    fn engine_name(&self) -> &str {
        (**self).engine_name()
    }
}

/// Placeholder used when the binary is built without a speech engine.
///
/// Typed questions still work; audio modalities fail with guidance.
#[derive(Debug, Default)]
pub struct UnavailableTranscriber;

impl SpeechTranscriber for UnavailableTranscriber {
    fn transcribe(&self, _waveform: &Waveform) -> Result<Transcript> {
        Err(PolyvoxError::Transcription {
            message: concat!(
                "This binary was built without speech recognition.\n",
                "Rebuild with: cargo build --features whisper\n",
                "If the build fails with cmake errors, install cmake first."
            )
            .to_string(),
        })
    }

    fn engine_name(&self) -> &str {
        "unavailable"
    }
}

/// Mock transcriber for testing.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    result: Transcript,
    should_fail: bool,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            result: Transcript::Text("mock transcription".to_string()),
            should_fail: false,
        }
    }

    /// Configure the mock to return a specific transcript.
    pub fn with_text(mut self, text: &str) -> Self {
        self.result = Transcript::Text(text.to_string());
        self
    }

    /// Configure the mock to hear no speech.
    pub fn with_no_speech(mut self) -> Self {
        self.result = Transcript::NoSpeech;
        self
    }

    /// Configure the mock to fail.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechTranscriber for MockTranscriber {
    fn transcribe(&self, _waveform: &Waveform) -> Result<Transcript> {
        if self.should_fail {
            return Err(PolyvoxError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        Ok(self.result.clone())
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}
