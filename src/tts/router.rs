//! Voice selection and synthesis routing.
//!
//! Maps an answer's language to a synthesis voice, falling back to the
//! default language's voice when the synthesizer has no matching voice.
//! Synthesis always produces audible output for non-empty text.

use crate::artifact::{ArtifactFormat, ArtifactId, ArtifactLifecycleManager};
use crate::chat::history::Answer;
use crate::error::{PolyvoxError, Result};
use crate::lang::LanguageCode;
use crate::tts::synthesizer::SpeechSynthesizer;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a synthesized answer, ready for playback.
///
/// The audio itself stays owned by the artifact manager; the UI reads it via
/// the id and releases it after playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    pub artifact: ArtifactId,
    pub format: ArtifactFormat,
    /// The voice actually used. Differs from the answer's language when the
    /// router fell back to the default voice.
    pub voice: LanguageCode,
}

pub struct SpeechSynthesisRouter {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Snapshot of the synthesizer's voices, taken once at construction.
    voices: HashSet<LanguageCode>,
    fallback_voice: LanguageCode,
    timeout: Duration,
}

impl SpeechSynthesisRouter {
    /// Build a router, querying the synthesizer's supported-language set
    /// once to drive the fallback table.
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, timeout: Duration) -> Self {
        let voices: HashSet<LanguageCode> = synthesizer.supported_languages().into_iter().collect();
        Self {
            synthesizer,
            voices,
            fallback_voice: LanguageCode::default(),
            timeout,
        }
    }

    /// Pick the voice for a language, falling back to the default voice.
    pub fn select_voice(&self, language: LanguageCode) -> LanguageCode {
        if self.voices.contains(&language) {
            language
        } else {
            tracing::warn!(
                requested = %language,
                fallback = %self.fallback_voice,
                "no voice for language, using fallback"
            );
            self.fallback_voice
        }
    }

    /// Synthesize an answer and register the audio with the artifact
    /// manager. The returned handle's artifact is owned by the manager until
    /// the caller releases it.
    pub async fn synthesize(
        &self,
        answer: &Answer,
        artifacts: &ArtifactLifecycleManager,
    ) -> Result<PlaybackHandle> {
        let voice = self.select_voice(answer.language);

        let bytes = tokio::time::timeout(
            self.timeout,
            self.synthesizer.synthesize(&answer.text, voice),
        )
        .await
        .map_err(|_| PolyvoxError::timeout("synthesis", self.timeout))??;

        let artifact = artifacts.register_memory(bytes, ArtifactFormat::Mp3);
        tracing::debug!(voice = %voice, ?artifact, "answer synthesized");

        Ok(PlaybackHandle {
            artifact,
            format: ArtifactFormat::Mp3,
            voice,
        })
    }
}
