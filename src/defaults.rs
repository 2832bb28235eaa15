//! Default configuration constants for polyvox.
//!
//! Shared constants used across configuration types to keep the pipeline
//! stages consistent about the canonical audio format and stage deadlines.

/// Canonical audio sample rate in Hz.
///
/// Every waveform handed to the transcriber is 16kHz mono 16-bit PCM,
/// regardless of the container or device it came from. 16kHz is the
/// standard for speech recognition.
pub const SAMPLE_RATE: u32 = 16000;

/// RMS threshold (0.0 to 1.0) above which a chunk counts as speech.
///
/// Tuned for typical microphone input levels; filters ambient noise
/// without clipping soft speech onsets.
pub const SPEECH_THRESHOLD: f32 = 0.02;

/// Trailing silence in milliseconds before an utterance is considered ended.
///
/// 1500ms allows natural pauses without cutting the speaker off mid-sentence.
pub const TRAILING_SILENCE_MS: u32 = 1500;

/// Minimum speech duration in milliseconds before trailing silence can end
/// the utterance. Rejects key clicks and other sub-word transients.
pub const MIN_SPEECH_MS: u32 = 300;

/// Default chat model identifier.
pub const CHAT_MODEL: &str = "gemini-2.0-flash";

/// Base URL of the Google Generative Language API.
pub const CHAT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Endpoint serving synthesized speech for a text fragment and language tag.
pub const SYNTHESIS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Maximum characters per synthesis request.
///
/// The synthesis endpoint rejects long inputs; longer answers are split on
/// whitespace into chunks of at most this size and the MP3 segments
/// concatenated.
pub const SYNTHESIS_CHUNK_CHARS: usize = 200;

/// Transcription language hint. "auto" lets the engine detect the spoken
/// language, which is required for a multilingual front end.
pub const STT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection in the engine.
pub const AUTO_LANGUAGE: &str = "auto";

/// Default per-stage deadlines in seconds.
pub const CAPTURE_TIMEOUT_SECS: u64 = 30;
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 60;
pub const MODEL_TIMEOUT_SECS: u64 = 60;
pub const SYNTHESIS_TIMEOUT_SECS: u64 = 30;
