//! Error types for polyvox.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolyvoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input errors
    #[error("Empty question: typed input must contain at least one non-whitespace character")]
    EmptyInput,

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Upload decoding errors
    #[error("Audio transcoding failed: {message}")]
    Transcoding { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("No speech recognized: {message}")]
    UnrecognizedSpeech { message: String },

    #[error("Transcription inference failed: {message}")]
    Transcription { message: String },

    // Remote service errors (chat model, remote recognizers)
    #[error("Remote service '{service}' failed: {message}")]
    RemoteService { service: String, message: String },

    // Speech synthesis errors
    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // Stage deadline errors
    #[error("Stage '{stage}' timed out after {seconds}s")]
    Timeout { stage: String, seconds: u64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolyvoxError {
    /// Build a timeout error for a pipeline stage.
    pub fn timeout(stage: &str, duration: std::time::Duration) -> Self {
        Self::Timeout {
            stage: stage.to_string(),
            seconds: duration.as_secs(),
        }
    }

    /// True for failures the user can recover from by re-prompting,
    /// as opposed to configuration or environment problems.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::Transcoding { .. }
                | Self::UnrecognizedSpeech { .. }
                | Self::Synthesis { .. }
                | Self::Timeout { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PolyvoxError>;
