//! Google Generative Language (Gemini) chat client.
//!
//! Non-streaming `generateContent` endpoint; auth is via API key in a query
//! parameter. Prior turns are sent as alternating user/model contents so the
//! service sees the whole conversation.

use crate::chat::history::Turn;
use crate::chat::model::ChatModel;
use crate::defaults;
use crate::error::{PolyvoxError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

pub struct GeminiChat {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiChat {
    pub fn new(api_key: String, model: Option<&str>, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(defaults::CHAT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or(defaults::CHAT_MODEL).to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_contents(history: &[Turn], prompt: &str) -> Vec<serde_json::Value> {
        let mut contents = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            contents.push(json!({
                "role": "user",
                "parts": [{ "text": turn.question.raw_text }],
            }));
            contents.push(json!({
                "role": "model",
                "parts": [{ "text": turn.answer.text }],
            }));
        }
        contents.push(json!({
            "role": "user",
            "parts": [{ "text": prompt }],
        }));
        contents
    }

    fn remote_error(&self, message: String) -> PolyvoxError {
        PolyvoxError::RemoteService {
            service: "gemini".to_string(),
            message,
        }
    }
}

// --- Gemini response types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<String> {
        let body = json!({
            "contents": Self::build_contents(history, prompt),
        });

        tracing::debug!(
            model = %self.model,
            history_turns = history.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| self.remote_error(format!("transport failure: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if status.as_u16() == 429 {
                format!("quota exceeded ({status}): {body}")
            } else {
                format!("HTTP {status}: {body}")
            };
            return Err(self.remote_error(message));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.remote_error(format!("malformed response: {e}")))?;

        let reply: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(self.remote_error("empty reply".to_string()));
        }
        Ok(reply.trim().to_string())
    }

    fn id(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::history::{Answer, InputSource, Question};
    use crate::lang::LanguageCode;

    fn turn(q: &str, a: &str) -> Turn {
        let question = Question::new(q.to_string(), InputSource::Typed, LanguageCode::En);
        let answer = Answer {
            text: a.to_string(),
            language: LanguageCode::En,
            question_id: question.id,
        };
        Turn { question, answer }
    }

    #[test]
    fn test_contents_preserve_turn_order_and_roles() {
        let history = vec![turn("q1", "a1"), turn("q2", "a2")];
        let contents = GeminiChat::build_contents(&history, "q3 prompt");

        assert_eq!(contents.len(), 5);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "q1");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "a1");
        assert_eq!(contents[2]["parts"][0]["text"], "q2");
        assert_eq!(contents[3]["parts"][0]["text"], "a2");
        assert_eq!(contents[4]["role"], "user");
        assert_eq!(contents[4]["parts"][0]["text"], "q3 prompt");
    }

    #[test]
    fn test_contents_with_empty_history_is_single_user_message() {
        let contents = GeminiChat::build_contents(&[], "only prompt");
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }

    #[test]
    fn test_endpoint_uses_model_and_base_url() {
        let chat = GeminiChat::new("key".into(), Some("gemini-2.0-flash"), None);
        assert_eq!(
            chat.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let chat = GeminiChat::new("key".into(), None, Some("http://localhost:9090/"));
        assert!(chat.endpoint().starts_with("http://localhost:9090/v1beta/"));
    }

    #[test]
    fn test_response_parsing_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{"text": "Hallo "}, {"text": "Welt"}] }
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(text, "Hallo Welt");
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
