//! Speech synthesizer abstraction.

use crate::error::{PolyvoxError, Result};
use crate::lang::LanguageCode;
use async_trait::async_trait;
use std::sync::Mutex;

/// A text-to-speech service.
///
/// The supported-language set is queried once at startup to build the
/// router's fallback table.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Generate audio for a text fragment in the given language's voice.
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Vec<u8>>;

    /// Languages this synthesizer has voices for.
    fn supported_languages(&self) -> Vec<LanguageCode>;
}

/// Mock synthesizer for testing.
#[derive(Debug)]
pub struct MockSynthesizer {
    supported: Vec<LanguageCode>,
    payload: Vec<u8>,
    should_fail: bool,
    calls: Mutex<Vec<(String, LanguageCode)>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            supported: LanguageCode::ALL.to_vec(),
            payload: b"mock mp3 bytes".to_vec(),
            should_fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Restrict the supported-language set.
    pub fn with_supported(mut self, supported: Vec<LanguageCode>) -> Self {
        self.supported = supported;
        self
    }

    /// Configure the payload returned for every request.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Configure the mock to fail.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// The (text, language) pairs synthesized so far.
    pub fn calls(&self) -> Vec<(String, LanguageCode)> {
        self.calls.lock().expect("mock lock").clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .expect("mock lock")
            .push((text.to_string(), language));
        if self.should_fail {
            return Err(PolyvoxError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(self.payload.clone())
    }

    fn supported_languages(&self) -> Vec<LanguageCode> {
        self.supported.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_payload_and_records_call() {
        let synth = MockSynthesizer::new().with_payload(vec![1, 2, 3]);

        let bytes = synth.synthesize("hallo", LanguageCode::De).await.unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(
            synth.calls(),
            vec![("hallo".to_string(), LanguageCode::De)]
        );
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let synth = MockSynthesizer::new().with_failure();
        let result = synth.synthesize("x", LanguageCode::En).await;
        assert!(matches!(result, Err(PolyvoxError::Synthesis { .. })));
    }

    #[test]
    fn test_mock_supported_set_defaults_to_all() {
        let synth = MockSynthesizer::new();
        assert_eq!(synth.supported_languages().len(), 7);
    }

    #[test]
    fn test_mock_supported_set_can_be_restricted() {
        let synth = MockSynthesizer::new().with_supported(vec![LanguageCode::En]);
        assert_eq!(synth.supported_languages(), vec![LanguageCode::En]);
    }
}
