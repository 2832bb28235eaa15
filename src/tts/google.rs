//! Speech synthesis via the Google Translate TTS endpoint.
//!
//! The endpoint serves an MP3 clip per request and rejects long inputs, so
//! longer answers are split on whitespace into chunks of at most
//! [`defaults::SYNTHESIS_CHUNK_CHARS`] characters and the MP3 segments
//! concatenated. MP3 frames are self-contained, so the result stays
//! playable.

use crate::defaults;
use crate::error::{PolyvoxError, Result};
use crate::lang::LanguageCode;
use crate::tts::synthesizer::SpeechSynthesizer;
use async_trait::async_trait;

pub struct GoogleTranslateSynthesizer {
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleTranslateSynthesizer {
    pub fn new(endpoint: Option<&str>) -> Self {
        Self {
            endpoint: endpoint
                .unwrap_or(defaults::SYNTHESIS_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_chunk(&self, text: &str, tag: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", tag),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| PolyvoxError::Synthesis {
                message: format!("transport failure: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PolyvoxError::Synthesis {
                message: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| PolyvoxError::Synthesis {
            message: format!("failed to read audio body: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}

impl Default for GoogleTranslateSynthesizer {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Split text into whitespace-aligned chunks of at most `max_chars`
/// characters. A single word longer than the limit becomes its own chunk.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateSynthesizer {
    async fn synthesize(&self, text: &str, language: LanguageCode) -> Result<Vec<u8>> {
        let chunks = split_text(text, defaults::SYNTHESIS_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(PolyvoxError::Synthesis {
                message: "nothing to synthesize".to_string(),
            });
        }

        let tag = language.synthesis_tag();
        tracing::debug!(language = tag, chunks = chunks.len(), "synthesizing speech");

        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend(self.fetch_chunk(chunk, tag).await?);
        }
        Ok(audio)
    }

    fn supported_languages(&self) -> Vec<LanguageCode> {
        // The service has a voice for every language in the supported set.
        LanguageCode::ALL.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text_is_single_chunk() {
        assert_eq!(split_text("Hallo Welt", 200), vec!["Hallo Welt"]);
    }

    #[test]
    fn test_split_empty_text_is_no_chunks() {
        assert!(split_text("", 200).is_empty());
        assert!(split_text("   \n\t", 200).is_empty());
    }

    #[test]
    fn test_split_respects_max_chars() {
        let text = "one two three four five six seven";
        let chunks = split_text(text, 10);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10, "chunk too long: {chunk:?}");
        }
        // No content lost
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_split_never_breaks_words() {
        let chunks = split_text("alpha beta gamma", 11);
        assert_eq!(chunks, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_split_oversized_word_is_own_chunk() {
        let chunks = split_text("hi Donaudampfschifffahrtsgesellschaft ok", 10);
        assert_eq!(
            chunks,
            vec!["hi", "Donaudampfschifffahrtsgesellschaft", "ok"]
        );
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        // 8 multibyte characters must fit into a 10-char chunk
        let chunks = split_text("你好吗你好吗你好", 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_supported_set_covers_every_language() {
        let synth = GoogleTranslateSynthesizer::default();
        for code in LanguageCode::ALL {
            assert!(synth.supported_languages().contains(&code));
        }
    }

    #[test]
    fn test_custom_endpoint_trailing_slash_trimmed() {
        let synth = GoogleTranslateSynthesizer::new(Some("http://localhost:1234/tts/"));
        assert_eq!(synth.endpoint, "http://localhost:1234/tts");
    }
}
