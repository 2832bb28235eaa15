//! Configuration loading.

use crate::defaults;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub synthesis: SynthesisConfig,
    pub limits: LimitsConfig,
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// API key. Usually left unset here and provided via the
    /// POLYVOX_API_KEY or GEMINI_API_KEY environment variable.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Microphone capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub speech_threshold: f32,
    pub trailing_silence_ms: u32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the Whisper model file (whisper builds only).
    pub model_path: Option<std::path::PathBuf>,
    pub language: String,
    pub threads: Option<usize>,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Disable to run text-only.
    pub enabled: bool,
    /// Override the synthesis endpoint (e.g. a local proxy).
    pub endpoint: Option<String>,
    /// Command used to play the answer audio, e.g. "mpv". When unset the
    /// audio file path is printed instead.
    pub player: Option<String>,
}

/// Per-stage deadlines in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub capture_secs: u64,
    pub transcription_secs: u64,
    pub model_secs: u64,
    pub synthesis_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::CHAT_MODEL.to_string(),
            base_url: defaults::CHAT_BASE_URL.to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            speech_threshold: defaults::SPEECH_THRESHOLD,
            trailing_silence_ms: defaults::TRAILING_SILENCE_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            language: defaults::STT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            player: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            capture_secs: defaults::CAPTURE_TIMEOUT_SECS,
            transcription_secs: defaults::TRANSCRIPTION_TIMEOUT_SECS,
            model_secs: defaults::MODEL_TIMEOUT_SECS,
            synthesis_secs: defaults::SYNTHESIS_TIMEOUT_SECS,
        }
    }
}

impl LimitsConfig {
    pub fn capture(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }
    pub fn transcription(&self) -> Duration {
        Duration::from_secs(self.transcription_secs)
    }
    pub fn model(&self) -> Duration {
        Duration::from_secs(self.model_secs)
    }
    pub fn synthesis(&self) -> Duration {
        Duration::from_secs(self.synthesis_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does
    /// not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - POLYVOX_API_KEY or GEMINI_API_KEY → chat.api_key
    /// - POLYVOX_MODEL → chat.model
    /// - POLYVOX_AUDIO_DEVICE → audio.device
    /// - POLYVOX_STT_MODEL → stt.model_path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("POLYVOX_API_KEY")
            && !key.is_empty()
        {
            self.chat.api_key = Some(key);
        } else if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            self.chat.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("POLYVOX_MODEL")
            && !model.is_empty()
        {
            self.chat.model = model;
        }

        if let Ok(device) = std::env::var("POLYVOX_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(model_path) = std::env::var("POLYVOX_STT_MODEL")
            && !model_path.is_empty()
        {
            self.stt.model_path = Some(model_path.into());
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/polyvox/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> std::path::PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("polyvox")
            .join("config.toml")
    }
}
