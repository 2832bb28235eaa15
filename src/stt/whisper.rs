//! Whisper-based transcription via whisper-rs.
//!
//! Requires the `whisper` feature and cmake to build:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::audio::transcode::Waveform;
use crate::defaults;
use crate::error::{PolyvoxError, Result};
use crate::stt::transcriber::{SpeechTranscriber, Transcript};
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Below this mean segment confidence the result is treated as no speech.
const MIN_CONFIDENCE: f32 = 0.4;

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the ggml model file.
    pub model_path: PathBuf,
    /// Language hint ("auto" detects the spoken language).
    pub language: String,
    /// Number of inference threads (None = auto-detect).
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::STT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper transcription engine.
///
/// The context is wrapped in a Mutex; each call creates a fresh inference
/// state so the engine can be shared behind an Arc.
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

impl WhisperTranscriber {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// `TranscriptionModelNotFound` if the model file doesn't exist,
    /// `Transcription` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Route whisper.cpp logging through tracing instead of stderr (once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(PolyvoxError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| PolyvoxError::Transcription {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| PolyvoxError::Transcription {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Convert i16 samples to the f32 range [-1.0, 1.0] Whisper expects.
    fn convert_audio(samples: &[i16]) -> Vec<f32> {
        samples
            .iter()
            .map(|&sample| f32::from(sample) / 32768.0)
            .collect()
    }
}

impl SpeechTranscriber for WhisperTranscriber {
    fn transcribe(&self, waveform: &Waveform) -> Result<Transcript> {
        if waveform.is_empty() {
            return Ok(Transcript::NoSpeech);
        }
        let audio = Self::convert_audio(&waveform.samples);

        let context = self
            .context
            .lock()
            .map_err(|e| PolyvoxError::Transcription {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| PolyvoxError::Transcription {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio)
            .map_err(|e| PolyvoxError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut text = String::new();
        let mut confidence_sum = 0.0_f32;
        let mut segment_count = 0u32;
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
            confidence_sum += 1.0 - segment.no_speech_probability();
            segment_count += 1;
        }
        let confidence = if segment_count > 0 {
            (confidence_sum / segment_count as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let text = text.trim().to_string();
        tracing::debug!(confidence, chars = text.len(), "whisper transcription done");
        if text.is_empty() || confidence < MIN_CONFIDENCE {
            return Ok(Transcript::NoSpeech);
        }
        Ok(Transcript::Text(text))
    }

    fn engine_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.language, defaults::STT_LANGUAGE);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..WhisperConfig::default()
        };
        let result = WhisperTranscriber::new(config);
        assert!(matches!(
            result,
            Err(PolyvoxError::TranscriptionModelNotFound { .. })
        ));
    }

    #[test]
    fn test_convert_audio_normalizes_range() {
        let converted = WhisperTranscriber::convert_audio(&[0, i16::MAX, i16::MIN]);
        assert_eq!(converted[0], 0.0);
        assert!((converted[1] - 0.99997).abs() < 1e-4);
        assert_eq!(converted[2], -1.0);
    }

    #[test]
    fn test_convert_audio_empty() {
        assert!(WhisperTranscriber::convert_audio(&[]).is_empty());
    }
}
